//! SQLite database implementation for persistent storage

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::KeyValueStore;

/// Database wrapper for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .context(format!("Failed to open database at {:?}", db_path))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        info!("Database opened at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Open a throwaway database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))?;
        conn.execute_batch(
            r#"
            -- Settings, one row per (section, key)
            CREATE TABLE IF NOT EXISTS settings (
                section TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (section, key)
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Every key stored under `section`
    pub fn keys(&self, section: &str) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))?;
        let mut stmt = conn.prepare("SELECT key FROM settings WHERE section = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![section], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for Database {
    fn read(&self, key: &str, section: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))?;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE section = ?1 AND key = ?2")?;
        let value: Option<String> = stmt
            .query_row(params![section, key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str, section: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (section, key, value) VALUES (?1, ?2, ?3)",
            params![section, key, value],
        )?;
        debug!("Setting [{}] {} saved", section, key);
        Ok(())
    }
}
