//! Module loader implementation
//!
//! Every declaration runs through four fixed stages:
//!
//! 1. **metadata**: pick the locator the declaration belongs to. Declarations
//!    delivered by a fetch are bound to that fetch's locator; inline anonymous
//!    declarations get a synthesized `<cwd>#<n>` locator.
//! 2. **initialisation**: settle the canonical and dedup locators and
//!    register the module under each unclaimed key.
//! 3. **dependencies**: resolve each dependency to a canonical key and
//!    request a fetch for every key nobody has declared or requested yet.
//! 4. **execution**: hand the module to the scheduler.
//!
//! Each stage is followed by its public notification on the event bus.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::module::api::events::{
    EventBus, EventPayload, LOAD_ERROR, MODULE_DEFINED, MODULE_DEPS_PROCESSED,
    MODULE_INITIALISED, MODULE_META_GOT,
};
use crate::module::registry::{DeclareArg, Declaration, Module, ModuleId, ModuleRegistry};
use crate::module::resolver::PathResolver;
use crate::module::scheduler::{Execution, ExecutionScheduler};
use crate::module::traits::{Export, Factory, LoaderError, ResourceLoader};

/// A finished fetch, waiting to be applied to the registry
struct FetchCompletion {
    locator: String,
    result: anyhow::Result<Vec<Declaration>>,
}

/// Asynchronous module-dependency loader
///
/// Owns the registry, scheduler and in-flight fetches. All registry state is
/// mutated through `&mut self`, so declarations, fetch completions and
/// executions are serialized on whichever task drives the loader.
pub struct Loader {
    resolver: PathResolver,
    registry: ModuleRegistry,
    scheduler: ExecutionScheduler,
    events: EventBus,
    fetcher: Arc<dyn ResourceLoader>,
    in_flight: FuturesUnordered<BoxFuture<'static, FetchCompletion>>,
    inline_counter: u64,
    anonymous_counter: u64,
}

impl Loader {
    /// Create a loader that fetches unknown modules through `fetcher`
    pub fn new(config: &LoaderConfig, fetcher: Arc<dyn ResourceLoader>) -> Self {
        Self {
            resolver: PathResolver::new(config),
            registry: ModuleRegistry::new(),
            scheduler: ExecutionScheduler::new(),
            events: EventBus::new(),
            fetcher,
            in_flight: FuturesUnordered::new(),
            inline_counter: 0,
            anonymous_counter: 0,
        }
    }

    /// Publish lifecycle notifications on an existing bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Resolve `id` against the loader's configuration
    pub fn resolve(&self, id: &str, reference: Option<&str>) -> String {
        self.resolver.resolve(id, reference)
    }

    /// Declare a module inline, outside any fetch
    pub fn declare(&mut self, declaration: Declaration) -> Result<ModuleId, LoaderError> {
        self.declare_from(declaration, None)
    }

    /// Declare from variadic `(identifier?, dependencies?, factory)` arguments
    pub fn declare_args(&mut self, args: Vec<DeclareArg>) -> Result<ModuleId, LoaderError> {
        self.declare(Declaration::from_args(args)?)
    }

    /// Run the declaration pipeline, binding anonymous declarations to `origin`
    fn declare_from(
        &mut self,
        declaration: Declaration,
        origin: Option<&str>,
    ) -> Result<ModuleId, LoaderError> {
        let Declaration {
            identifier,
            dependencies,
            factory,
        } = declaration;

        let locator = self.assign_locator(identifier.as_deref(), origin);
        debug!("Declaration {:?} bound to {}", identifier, locator);
        self.events.publish(
            MODULE_META_GOT,
            &EventPayload::Meta {
                identifier: identifier.clone(),
                locator: locator.clone(),
                dependencies: dependencies.clone(),
            },
        )?;

        let id = self.initialise(identifier, locator, dependencies, factory)?;
        self.process_dependencies(id)?;
        self.scheduler.execute(&mut self.registry, &self.events, id)?;
        self.publish_module(MODULE_DEFINED, id)?;
        Ok(id)
    }

    /// Metadata stage
    fn assign_locator(&mut self, identifier: Option<&str>, origin: Option<&str>) -> String {
        let cwd = self.resolver.cwd();
        match origin.filter(|o| !o.is_empty() && *o != cwd) {
            Some(origin) => origin.to_string(),
            None if identifier.is_some() => cwd.to_string(),
            None => {
                let locator = format!("{}#{}", cwd, self.inline_counter);
                self.inline_counter += 1;
                locator
            }
        }
    }

    /// Initialisation stage
    fn initialise(
        &mut self,
        identifier: Option<String>,
        locator: String,
        dependencies: Vec<String>,
        factory: Factory,
    ) -> Result<ModuleId, LoaderError> {
        let locator = if locator.contains('/') {
            locator
        } else {
            self.resolver.resolve(identifier.as_deref().unwrap_or_default(), None)
        };

        let key = match identifier {
            Some(ref id) => id.clone(),
            None => {
                let n = self.anonymous_counter;
                self.anonymous_counter += 1;
                n.to_string()
            }
        };
        let dedup_locator = if locator.contains(&format!("{}.", key)) {
            locator.clone()
        } else {
            self.resolver.resolve(&format!("./{}", key), Some(&locator))
        };

        let id = self
            .registry
            .insert(identifier, locator, dedup_locator, dependencies, factory);
        self.publish_module(MODULE_INITIALISED, id)?;
        Ok(id)
    }

    /// Dependency-processing stage
    fn process_dependencies(&mut self, id: ModuleId) -> Result<(), LoaderError> {
        let Some(module) = self.registry.get(id) else {
            return Ok(());
        };
        let reference = if module.dedup_locator().is_empty() {
            module.locator().to_string()
        } else {
            module.dedup_locator().to_string()
        };

        let resolved: Vec<String> = module
            .dependencies()
            .iter()
            .map(|dependency| {
                if self.registry.contains_key(dependency) {
                    dependency.clone()
                } else {
                    self.resolver.resolve(dependency, Some(&reference))
                }
            })
            .collect();

        for locator in &resolved {
            if self.registry.contains_key(locator) || self.registry.is_executed(locator) {
                continue;
            }
            if locator.is_empty() {
                warn!("Module {:?} has an empty dependency; it cannot be fetched", id);
                continue;
            }
            self.request(locator);
        }

        if let Some(module) = self.registry.get_mut(id) {
            module.set_dependencies(resolved);
        }
        self.scheduler.enqueue(&self.registry, id);
        self.publish_module(MODULE_DEPS_PROCESSED, id)
    }

    /// Ask the resource loader for `locator`, at most once per locator
    fn request(&mut self, locator: &str) {
        if !self.registry.mark_loading(locator) {
            return;
        }
        info!("Requesting module resource {}", locator);

        let fetcher = Arc::clone(&self.fetcher);
        let locator = locator.to_string();
        self.in_flight.push(Box::pin(async move {
            let result = fetcher.fetch(&locator).await;
            FetchCompletion { locator, result }
        }));
    }

    /// Apply one finished fetch
    fn complete(&mut self, completion: FetchCompletion) -> Result<(), LoaderError> {
        let FetchCompletion { locator, result } = completion;
        match result {
            Ok(declarations) => {
                debug!(
                    "Resource {} loaded with {} declarations",
                    locator,
                    declarations.len()
                );
                for declaration in declarations {
                    self.declare_from(declaration, Some(&locator))?;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load resource {}: {}", locator, e);
                self.events.publish(
                    LOAD_ERROR,
                    &EventPayload::LoadError {
                        locator,
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    /// Wait for the next fetch to finish and apply it
    ///
    /// Returns `false` once nothing is in flight.
    pub async fn step(&mut self) -> Result<bool, LoaderError> {
        match self.in_flight.next().await {
            Some(completion) => {
                self.complete(completion)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply fetch completions until nothing is in flight
    ///
    /// Fetches requested while applying a completion are awaited too. A
    /// factory error stops the run; fetches still in flight stay queued for
    /// the next call.
    pub async fn run_until_idle(&mut self) -> Result<(), LoaderError> {
        while self.step().await? {}
        Ok(())
    }

    /// Number of fetches requested and not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Load `identifier` and everything it depends on
    ///
    /// Fails with [`LoaderError::Stalled`] if the loader goes idle while the
    /// module is still pending (failed fetch, cycle, missing declaration).
    pub async fn load(&mut self, identifier: &str) -> Result<Export, LoaderError> {
        let locator = if self.registry.contains_key(identifier) {
            identifier.to_string()
        } else {
            self.resolver.resolve(identifier, None)
        };
        if !locator.is_empty() && !self.registry.contains_key(&locator) {
            self.request(&locator);
        }
        self.run_until_idle().await?;
        self.settled_export(&locator)
    }

    /// Declare `declaration` inline and wait for its export
    pub async fn require(&mut self, declaration: Declaration) -> Result<Export, LoaderError> {
        let id = self.declare(declaration)?;
        self.run_until_idle().await?;

        let module = self.registry.get(id);
        match module.and_then(Module::export) {
            Some(export) => Ok(export.clone()),
            None => Err(self.stalled(module.map(Module::locator).unwrap_or_default())),
        }
    }

    fn settled_export(&self, key: &str) -> Result<Export, LoaderError> {
        self.registry
            .export(key)
            .cloned()
            .ok_or_else(|| self.stalled(key))
    }

    fn stalled(&self, locator: &str) -> LoaderError {
        LoaderError::Stalled {
            locator: locator.to_string(),
            pending: self
                .registry
                .pending()
                .map(|m| m.dedup_locator().to_string())
                .collect(),
        }
    }

    /// Attempt execution of a registered module
    pub fn execute(&mut self, id: ModuleId) -> Result<Execution, LoaderError> {
        self.scheduler.execute(&mut self.registry, &self.events, id)
    }

    /// Module registered under `key`
    pub fn module(&self, key: &str) -> Option<&Module> {
        self.registry.by_key(key)
    }

    /// Memoized export of the module registered under `key`
    pub fn export(&self, key: &str) -> Option<Export> {
        self.registry.export(key).cloned()
    }

    pub fn is_executed(&self, key: &str) -> bool {
        self.registry.is_executed(key)
    }

    /// Modules declared but not yet executed
    pub fn pending(&self) -> Vec<&Module> {
        self.registry.pending().collect()
    }

    fn publish_module(&self, name: &str, id: ModuleId) -> Result<(), LoaderError> {
        match self.registry.get(id) {
            Some(module) => self
                .events
                .publish(name, &EventPayload::Module(module.snapshot())),
            None => Ok(()),
        }
    }
}
