//! In-memory registry backing store. Single-writer; durable deployments
//! provide their own [`RegistryStore`] over a table with the same semantics.

use super::{RegistryEntry, RegistryStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Vec<RegistryEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for InMemoryStore {
    fn insert(&mut self, entry: RegistryEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == entry.key) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    fn get(&self, key: &str) -> Option<RegistryEntry> {
        self.entries.iter().find(|e| e.key == key).cloned()
    }

    fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        self.entries.len() != before
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.clone()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
