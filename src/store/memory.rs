use std::collections::HashMap;

use super::{KvStore, PersistenceError};

/// In-memory backend. `failing_on` makes writes to one key fail, the way a
/// full local store rejects a write.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
    failing_key: Option<String>,
}

impl MemoryKv {
    pub fn failing_on(&mut self, key: &str) {
        self.failing_key = Some(key.to_string());
    }

    pub fn clear_failure(&mut self) {
        self.failing_key = None;
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.failing_key.as_deref() == Some(key) {
            return Err(PersistenceError::Unavailable {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
