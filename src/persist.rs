// Persistence contract between TaskStore and a durable key-value store

use crate::backend::KeyValueStore;
use crate::error::PersistenceError;
use crate::prefs::TASKS_KEY;
use crate::task::Task;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What `TaskStore` needs from durable storage.
///
/// `load` never fails: unreadable or corrupt data yields an empty list.
/// `save` failures are reported to the caller but never roll back memory.
pub trait PersistenceAdapter {
    fn load(&self) -> Vec<Task>;

    fn save(&mut self, tasks: &[Task]) -> Result<(), PersistenceError>;

    fn load_preference(&self, key: &str) -> Option<String>;

    fn save_preference(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Serialize the collection as a single JSON array
pub fn encode_tasks(tasks: &[Task]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(tasks)?)
}

/// Parse a stored task array.
///
/// The payload is rejected as a whole if any record is malformed, has empty
/// text, or repeats an id.
pub fn decode_tasks(raw: &str) -> Result<Vec<Task>, PersistenceError> {
    let corrupt = |reason: String| PersistenceError::Corrupt {
        key: TASKS_KEY.to_string(),
        reason,
    };

    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        if task.text.trim().is_empty() {
            return Err(corrupt(format!("record {} has empty text", index)));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(corrupt(format!("duplicate id {}", task.id)));
        }
    }

    Ok(tasks)
}

/// `PersistenceAdapter` over any `KeyValueStore`
pub struct KvAdapter<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> KvAdapter<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }
}

impl<K: KeyValueStore> PersistenceAdapter for KvAdapter<K> {
    fn load(&self) -> Vec<Task> {
        let raw = match self.kv.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = TASKS_KEY, error = %e, "Failed to read tasks, starting empty");
                return Vec::new();
            }
        };

        match decode_tasks(&raw) {
            Ok(tasks) => {
                info!(count = tasks.len(), "Loaded tasks");
                tasks
            }
            Err(e) => {
                warn!(error = %e, "Discarding stored tasks");
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let json = encode_tasks(tasks)?;
        self.kv.set(TASKS_KEY, &json)?;
        debug!(count = tasks.len(), "Saved tasks");
        Ok(())
    }

    fn load_preference(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read preference");
                None
            }
        }
    }

    fn save_preference(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.kv.set(key, value)
    }
}
