use dashmap::DashMap;

use super::CredentialStore;
use crate::error::CoreError;

/// In-memory store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, namespace: &str) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self.records.get(namespace).map(|r| r.value().clone()))
    }

    fn save(&self, namespace: &str, bytes: &[u8]) -> Result<(), CoreError> {
        self.records.insert(namespace.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn erase(&self, namespace: &str) -> Result<(), CoreError> {
        self.records.remove(namespace);
        Ok(())
    }
}
