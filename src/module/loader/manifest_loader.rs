//! Resource loader backed by a module manifest

use async_trait::async_trait;
use tracing::debug;

use crate::module::registry::{Declaration, ModuleManifest};
use crate::module::traits::ResourceLoader;

/// Serves each locator's declarations from a [`ModuleManifest`]
///
/// Locators the manifest does not list fail to load.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    manifest: ModuleManifest,
}

impl ManifestLoader {
    pub fn new(manifest: ModuleManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }
}

#[async_trait]
impl ResourceLoader for ManifestLoader {
    async fn fetch(&self, locator: &str) -> anyhow::Result<Vec<Declaration>> {
        // Completion is always asynchronous, even for an in-memory manifest.
        tokio::task::yield_now().await;

        if !self.manifest.has_resource(locator) {
            anyhow::bail!("no resource at {}", locator);
        }
        let declarations = self.manifest.declarations_for(locator);
        debug!("Manifest resource {} makes {} declarations", locator, declarations.len());
        Ok(declarations)
    }
}
