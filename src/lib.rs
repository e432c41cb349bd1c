//! modloader - asynchronous module-dependency loader
//!
//! Resolves module identifiers to canonical locators, fetches modules that are
//! not yet known, and executes each module's factory exactly once after all of
//! its dependencies have executed.
//!
//! ## Design Principles
//!
//! 1. **Explicit state**: all tables live in one [`module::Loader`] instance
//! 2. **Explicit origin**: anonymous declarations are bound to the fetch that delivered them
//! 3. **Linear propagation**: completions wake only true dependents
//! 4. **Stable notifications**: the public event names are fixed

pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use module::{
    Declaration, EventBus, EventPayload, Export, Factory, Loader, LoaderError, ManifestLoader,
    PathResolver, ResourceLoader,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
