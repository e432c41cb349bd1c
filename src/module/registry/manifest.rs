//! Module manifest parsing
//!
//! A manifest lists declarations grouped by the resource locator that makes
//! them, in TOML:
//!
//! ```toml
//! entry = "main"
//!
//! [[module]]
//! locator = "http://h/app/main.js"
//! deps = ["./util"]
//!
//! [[module]]
//! locator = "http://h/app/util.js"
//! value = { answer = 42 }
//! ```
//!
//! An entry with a `value` exports it verbatim. An entry without one exports
//! the JSON array of its dependencies' exports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::module::registry::declaration::Declaration;
use crate::module::traits::{Export, Factory, LoaderError};

/// One declaration inside a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifestEntry {
    /// Locator of the resource that makes this declaration
    pub locator: String,
    /// Optional module identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Dependency identifiers in declared order
    #[serde(default)]
    pub deps: Vec<String>,
    /// Plain export value
    #[serde(default)]
    pub value: Option<Value>,
}

impl ModuleManifestEntry {
    /// Build the declaration this entry describes
    pub fn to_declaration(&self) -> Declaration {
        let factory = match self.value {
            Some(ref value) => Factory::Value(Export::from(value.clone())),
            None => Factory::new(|deps| {
                let values = deps
                    .iter()
                    .map(|dep| dep.as_json().cloned().unwrap_or(Value::Null))
                    .collect();
                Ok(Export::from(Value::Array(values)))
            }),
        };

        let declaration = Declaration::new(factory).with_dependencies(self.deps.clone());
        match self.id {
            Some(ref id) => declaration.with_identifier(id.clone()),
            None => declaration,
        }
    }
}

/// Module manifest (manifest.toml structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Identifier to load when the manifest is run
    #[serde(default)]
    pub entry: Option<String>,
    /// Declarations, in the order their resources make them
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleManifestEntry>,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LoaderError::InvalidManifest(format!("Failed to read manifest file: {}", e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse manifest TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, LoaderError> {
        let manifest: ModuleManifest = toml::from_str(contents).map_err(|e| {
            LoaderError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        if let Some(entry) = manifest.modules.iter().find(|m| m.locator.is_empty()) {
            return Err(LoaderError::InvalidManifest(format!(
                "Declaration {:?} has an empty locator",
                entry.id
            )));
        }

        Ok(manifest)
    }

    /// Declarations made by the resource at `locator`
    pub fn declarations_for(&self, locator: &str) -> Vec<Declaration> {
        self.modules
            .iter()
            .filter(|m| m.locator == locator)
            .map(ModuleManifestEntry::to_declaration)
            .collect()
    }

    pub fn has_resource(&self, locator: &str) -> bool {
        self.modules.iter().any(|m| m.locator == locator)
    }
}
