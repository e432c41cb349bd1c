//! Module loading system
//!
//! Runs declarations through the loader pipeline and drives the fetches it
//! requests.

pub mod loader;
pub mod manifest_loader;

pub use loader::Loader;
pub use manifest_loader::ManifestLoader;
