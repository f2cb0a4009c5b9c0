//! Persistence - Key-value settings storage

mod database;

pub use database::Database;

use anyhow::Result;

/// Settings storage keyed by `(key, section)`
pub trait KeyValueStore {
    fn read(&self, key: &str, section: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str, section: &str) -> Result<()>;
}
