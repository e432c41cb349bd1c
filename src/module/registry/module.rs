//! Module data model

use crate::module::traits::{Export, Factory};

/// Stable handle to a registered module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One declared code unit
///
/// `executed` only ever moves from false to true, and `export` is set at the
/// same moment. Dependencies hold canonical keys once the declaration
/// pipeline has processed them.
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    identifier: Option<String>,
    locator: String,
    dedup_locator: String,
    dependencies: Vec<String>,
    factory: Factory,
    export: Option<Export>,
    executed: bool,
}

impl Module {
    pub(crate) fn new(
        id: ModuleId,
        identifier: Option<String>,
        locator: String,
        dedup_locator: String,
        dependencies: Vec<String>,
        factory: Factory,
    ) -> Self {
        Self {
            id,
            identifier,
            locator,
            dedup_locator,
            dependencies,
            factory,
            export: None,
            executed: false,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Canonical locator
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Per-declaration key, distinct even when modules share a locator
    pub fn dedup_locator(&self) -> &str {
        &self.dedup_locator
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<String>) {
        self.dependencies = dependencies;
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn export(&self) -> Option<&Export> {
        self.export.as_ref()
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn mark_executed(&mut self, export: Export) {
        debug_assert!(!self.executed, "module executed twice");
        self.export = Some(export);
        self.executed = true;
    }

    /// Every non-empty key this module claims, in priority order
    pub fn claimed_keys(&self) -> impl Iterator<Item = &str> {
        [
            self.identifier.as_deref(),
            Some(self.locator.as_str()),
            Some(self.dedup_locator.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|key| !key.is_empty())
    }

    /// Point-in-time copy for event payloads
    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            id: self.id,
            identifier: self.identifier.clone(),
            locator: self.locator.clone(),
            dedup_locator: self.dedup_locator.clone(),
            dependencies: self.dependencies.clone(),
            executed: self.executed,
            export: self.export.clone(),
        }
    }
}

/// Copy of a module's state at the time an event was published
#[derive(Debug, Clone)]
pub struct ModuleSnapshot {
    pub id: ModuleId,
    pub identifier: Option<String>,
    pub locator: String,
    pub dedup_locator: String,
    pub dependencies: Vec<String>,
    pub executed: bool,
    pub export: Option<Export>,
}
