//! Module system traits and core value types
//!
//! Defines the export and factory values modules carry, the error taxonomy,
//! and the trait the loader uses to fetch not-yet-known modules.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::module::registry::declaration::Declaration;

/// A module's computed export value
///
/// Exports are shared, never copied: every dependent observes the same
/// memoized instance (see [`Export::ptr_eq`]).
#[derive(Clone)]
pub struct Export(Arc<dyn Any + Send + Sync>);

impl Export {
    /// Wrap an arbitrary value as an export
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// The export of a factory that produced nothing
    pub fn undefined() -> Self {
        Self::new(())
    }

    pub fn is_undefined(&self) -> bool {
        self.0.is::<()>()
    }

    /// Borrow the export as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Borrow the export as JSON, if it holds a `serde_json::Value`
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        self.downcast_ref::<serde_json::Value>()
    }

    /// Whether two exports are the same memoized instance
    pub fn ptr_eq(&self, other: &Export) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.as_json() {
            write!(f, "Export({})", value)
        } else if self.is_undefined() {
            f.write_str("Export(undefined)")
        } else {
            f.write_str("Export(..)")
        }
    }
}

impl From<serde_json::Value> for Export {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// Signature of an invokable factory
///
/// Receives the dependency exports in declared order.
pub type FactoryFn = dyn Fn(&[Export]) -> anyhow::Result<Export> + Send + Sync;

/// Produces a module's export once its dependencies have executed
#[derive(Clone)]
pub enum Factory {
    /// Invoked with the ordered dependency exports
    Invoke(Arc<FactoryFn>),
    /// Used verbatim as the export
    Value(Export),
}

impl Factory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Export]) -> anyhow::Result<Export> + Send + Sync + 'static,
    {
        Factory::Invoke(Arc::new(f))
    }

    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Factory::Value(Export::new(value))
    }

    pub fn is_invokable(&self) -> bool {
        matches!(self, Factory::Invoke(_))
    }

    /// Compute the export for the given dependency exports
    pub(crate) fn produce(&self, dependencies: &[Export]) -> anyhow::Result<Export> {
        match self {
            Factory::Invoke(f) => f(dependencies),
            Factory::Value(export) => Ok(export.clone()),
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Invoke(_) => f.write_str("Factory::Invoke"),
            Factory::Value(export) => f.debug_tuple("Factory::Value").field(export).finish(),
        }
    }
}

/// Fetches the resource behind a canonical locator
///
/// A successful fetch returns the declarations the resource makes, in the
/// order it makes them. The loader binds anonymous declarations among them to
/// `locator`. A failed fetch returns an error and declares nothing. The loader
/// calls `fetch` at most once per locator for its whole lifetime.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn fetch(&self, locator: &str) -> anyhow::Result<Vec<Declaration>>;
}

/// Module loader errors
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Entry point already installed: {0}")]
    InstallationConflict(String),

    #[error("Event subscriber for '{0}' has no callback")]
    MalformedSubscriber(String),

    #[error("Failed to load resource {locator}: {reason}")]
    ResourceLoad { locator: String, reason: String },

    #[error("Factory for module {locator} failed: {source}")]
    Factory {
        locator: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("Module {locator} is still pending ({} modules stuck)", pending.len())]
    Stalled {
        locator: String,
        pending: Vec<String>,
    },

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for LoaderError {
    fn from(e: toml::de::Error) -> Self {
        LoaderError::Config(e.to_string())
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(e: std::io::Error) -> Self {
        LoaderError::Config(e.to_string())
    }
}
