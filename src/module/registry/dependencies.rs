//! Reverse dependency index
//!
//! Maps a dependency key to the modules waiting on it, so a completed
//! execution only revisits its true dependents.

use std::collections::HashMap;

use crate::module::registry::module::ModuleId;

/// Dependency key -> modules waiting on it
#[derive(Debug, Default)]
pub struct DependencyIndex {
    waiting: HashMap<String, Vec<ModuleId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` is waiting on `key`
    pub fn wait_on(&mut self, key: &str, dependent: ModuleId) {
        let list = self.waiting.entry(key.to_string()).or_default();
        if !list.contains(&dependent) {
            list.push(dependent);
        }
    }

    /// Remove and return the modules waiting on `key`, in registration order
    pub fn take_dependents(&mut self, key: &str) -> Vec<ModuleId> {
        self.waiting.remove(key).unwrap_or_default()
    }

    pub fn dependents(&self, key: &str) -> &[ModuleId] {
        self.waiting.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of edges still waiting
    pub fn len(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
