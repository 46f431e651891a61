// Durable key-value stores backing the persistence adapter

use crate::error::PersistenceError;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CURRENT_VERSION: u32 = 1;

/// A string-keyed, string-valued durable store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// In-memory store with an optional byte quota
///
/// The quota counts the bytes of every key and value currently held.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// Total bytes of keys and values held
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(PersistenceError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// SQLite-backed store living in `<dir>/.tasklist/tasklist.db`
pub struct SqliteStore {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path
    ///
    /// The database is created in a `.tasklist` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let base_path = path.as_ref().join(".tasklist");
        fs::create_dir_all(&base_path)?;

        let db = Connection::open(base_path.join("tasklist.db"))?;
        let store = Self { base_path, db };

        store.create_schema()?;
        store.create_gitignore()?;
        store.write_version()?;

        Ok(store)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<(), PersistenceError> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<(), PersistenceError> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "tasklist.db\ntasklist.db-shm\ntasklist.db-wal\n")?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<(), PersistenceError> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }
}
