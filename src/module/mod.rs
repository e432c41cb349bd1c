//! Module system
//!
//! Asynchronous module-dependency loading: declarations name their
//! dependencies by identifier, identifiers resolve to canonical locators,
//! unknown locators are fetched, and each module's factory runs exactly once
//! after every dependency has produced its export.
//!
//! ## Architecture
//!
//! - **Resolution**: [`resolver::PathResolver`] maps identifiers to locators
//! - **Registry**: [`registry::ModuleRegistry`] owns every declared module
//! - **Scheduling**: [`scheduler::ExecutionScheduler`] runs factories in dependency order
//! - **Loading**: [`loader::Loader`] drives declarations and fetches
//! - **Events**: [`api::events::EventBus`] publishes lifecycle notifications

pub mod api;
pub mod loader;
pub mod namespace;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod traits;

pub use api::events::{EventBus, EventPayload};
pub use loader::{Loader, ManifestLoader};
pub use namespace::{Namespace, ENTRY_POINT};
pub use registry::{DeclareArg, Declaration, Module, ModuleId, ModuleRegistry};
pub use resolver::PathResolver;
pub use scheduler::{Execution, ExecutionScheduler};
pub use traits::{Export, Factory, LoaderError, ResourceLoader};
