//! Module registry
//!
//! The authoritative table of declared modules. Modules live in an arena
//! indexed by [`ModuleId`]; a single key table maps every identifier,
//! canonical locator and dedup locator to the module that claimed it first.
//! The loading set records locators whose fetch has been requested.

pub mod declaration;
pub mod dependencies;
pub mod manifest;
pub mod module;

pub use declaration::{DeclareArg, Declaration};
pub use dependencies::DependencyIndex;
pub use manifest::{ModuleManifest, ModuleManifestEntry};
pub use module::{Module, ModuleId, ModuleSnapshot};

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::module::traits::{Export, Factory};

/// Registry of known modules
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
    keys: HashMap<String, ModuleId>,
    loading: HashSet<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module and claim each of its keys not already taken
    ///
    /// The module is always stored; only unclaimed keys point at it.
    pub fn insert(
        &mut self,
        identifier: Option<String>,
        locator: String,
        dedup_locator: String,
        dependencies: Vec<String>,
        factory: Factory,
    ) -> ModuleId {
        let id = ModuleId(self.modules.len());
        let module = Module::new(id, identifier, locator, dedup_locator, dependencies, factory);

        for key in module.claimed_keys() {
            if self.keys.contains_key(key) {
                debug!("Key {} already registered, keeping first module", key);
                continue;
            }
            self.keys.insert(key.to_string(), id);
        }

        self.modules.push(module);
        id
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0)
    }

    /// Module registered under `key`
    pub fn lookup(&self, key: &str) -> Option<ModuleId> {
        self.keys.get(key).copied()
    }

    pub fn by_key(&self, key: &str) -> Option<&Module> {
        self.lookup(key).and_then(|id| self.get(id))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn is_executed(&self, key: &str) -> bool {
        self.by_key(key).is_some_and(Module::is_executed)
    }

    pub fn export(&self, key: &str) -> Option<&Export> {
        self.by_key(key).and_then(Module::export)
    }

    /// Keys that currently resolve to `id`
    pub fn keys_of(&self, id: ModuleId) -> Vec<String> {
        let Some(module) = self.get(id) else {
            return Vec::new();
        };
        module
            .claimed_keys()
            .filter(|key| self.lookup(key) == Some(id))
            .map(str::to_string)
            .collect()
    }

    /// Record a fetch request; false if one was already recorded
    pub fn mark_loading(&mut self, locator: &str) -> bool {
        self.loading.insert(locator.to_string())
    }

    pub fn is_loading(&self, locator: &str) -> bool {
        self.loading.contains(locator)
    }

    /// Locators whose fetch has been requested
    pub fn loading(&self) -> impl Iterator<Item = &str> {
        self.loading.iter().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Modules not yet executed, in declaration order
    pub fn pending(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| !m.is_executed())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
