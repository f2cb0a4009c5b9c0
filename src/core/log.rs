//! Launch log - Append-only `(cause, message)` records with timestamps

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Destination for diagnostic messages about launch decisions
pub trait LogSink {
    fn log(&self, cause: &str, message: &str);
}

/// Log sink backed by a text file. Every entry is also emitted as a tracing event.
#[derive(Debug, Clone)]
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty the log file, creating it if needed
    pub fn truncate(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        File::create(&self.path)
            .with_context(|| format!("Failed to truncate log at {:?}", self.path))?;
        Ok(())
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// One log line, CRLF-terminated
pub fn format_entry(cause: &str, message: &str) -> String {
    format!(
        "[{}] [{}] {}\r\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        cause,
        message
    )
}

impl LogSink for FileLog {
    fn log(&self, cause: &str, message: &str) {
        info!(cause = %cause, "{}", message);
        if let Err(e) = self.append(&format_entry(cause, message)) {
            warn!("Failed to write log file {:?}: {}", self.path, e);
        }
    }
}
