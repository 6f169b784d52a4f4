use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{validate_name, DocumentStore, StoreResult};

/// In-memory document store (for testing).
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored documents, sorted.
    pub fn names(&self) -> Vec<String> {
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = docs.keys().cloned().collect();
        names.sort();
        names
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, name: &str) -> StoreResult<Option<String>> {
        validate_name(name)?;
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.get(name).cloned())
    }

    fn write(&self, name: &str, body: &str) -> StoreResult<()> {
        validate_name(name)?;
        let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        docs.insert(name.to_string(), body.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
