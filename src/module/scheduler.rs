//! Dependency-closure execution scheduler
//!
//! Decides when a module may run, runs its factory exactly once, and wakes
//! the modules that were waiting on it. Waiting modules are found through a
//! reverse dependency index, so completing a module costs time proportional
//! to its dependents rather than to everything still pending.

use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

use crate::module::api::events::{EventBus, EventPayload, MODULE_EXECUTED};
use crate::module::registry::{DependencyIndex, ModuleId, ModuleRegistry};
use crate::module::traits::{Export, LoaderError};

/// Outcome of an execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// The export was already memoized; nothing ran
    AlreadyExecuted,
    /// The factory ran during this attempt
    Executed,
    /// Some dependency has not executed yet
    Pending,
}

/// Execution scheduler
///
/// Modules whose dependency just executed move from the index to a ready
/// queue and are attempted in FIFO order. An error stops the drain; whatever
/// is still queued is attempted first by the next successful execution.
#[derive(Debug, Default)]
pub struct ExecutionScheduler {
    index: DependencyIndex,
    ready: VecDeque<ModuleId>,
    pending: BTreeSet<ModuleId>,
}

impl ExecutionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `id` as pending and index the dependencies it still waits on
    ///
    /// Call once the module's dependencies hold canonical keys.
    pub fn enqueue(&mut self, registry: &ModuleRegistry, id: ModuleId) {
        let Some(module) = registry.get(id) else {
            return;
        };
        if module.is_executed() {
            return;
        }
        self.pending.insert(id);
        for dependency in module.dependencies() {
            if !registry.is_executed(dependency) {
                self.index.wait_on(dependency, id);
            }
        }
    }

    /// Try to execute `id`, then drain every module it unblocks
    ///
    /// A factory error aborts the attempt in progress. The failed module stays
    /// pending and is only re-run by an explicit `execute`; modules still
    /// queued behind it wait for the next successful execution.
    pub fn execute(
        &mut self,
        registry: &mut ModuleRegistry,
        events: &EventBus,
        id: ModuleId,
    ) -> Result<Execution, LoaderError> {
        let outcome = self.attempt(registry, events, id)?;
        if outcome == Execution::Executed {
            self.drain(registry, events)?;
        }
        Ok(outcome)
    }

    fn attempt(
        &mut self,
        registry: &mut ModuleRegistry,
        events: &EventBus,
        id: ModuleId,
    ) -> Result<Execution, LoaderError> {
        let Some(module) = registry.get(id) else {
            return Ok(Execution::Pending);
        };

        if module.export().is_some() {
            self.pending.remove(&id);
            return Ok(Execution::AlreadyExecuted);
        }

        let ready = module
            .dependencies()
            .iter()
            .all(|dependency| registry.is_executed(dependency));
        if !ready {
            return Ok(Execution::Pending);
        }

        let exports: Vec<Export> = module
            .dependencies()
            .iter()
            .filter_map(|dependency| registry.export(dependency).cloned())
            .collect();
        let export = module
            .factory()
            .produce(&exports)
            .map_err(|source| LoaderError::Factory {
                locator: module.locator().to_string(),
                source,
            })?;

        let snapshot = match registry.get_mut(id) {
            Some(module) => {
                module.mark_executed(export);
                module.snapshot()
            }
            None => return Ok(Execution::Pending),
        };
        self.pending.remove(&id);

        // dependents are queued before the notification can fail
        self.release(registry, id);

        info!(
            "Executed module {} ({})",
            snapshot.identifier.as_deref().unwrap_or("<anonymous>"),
            snapshot.locator
        );
        events.publish(MODULE_EXECUTED, &EventPayload::Module(snapshot))?;
        Ok(Execution::Executed)
    }

    /// Attempt queued modules until the ready queue is empty
    fn drain(&mut self, registry: &mut ModuleRegistry, events: &EventBus) -> Result<(), LoaderError> {
        while let Some(next) = self.ready.pop_front() {
            self.attempt(registry, events, next)?;
        }
        Ok(())
    }

    /// Move the modules waiting on any key of `id` to the ready queue
    fn release(&mut self, registry: &ModuleRegistry, id: ModuleId) {
        let before = self.ready.len();
        for key in registry.keys_of(id) {
            self.ready.extend(self.index.take_dependents(&key));
        }
        let woken = self.ready.len() - before;
        if woken > 0 {
            debug!("Module {:?} released {} dependents", id, woken);
        }
    }

    /// Modules released by an executed dependency but not yet attempted
    pub fn ready(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.ready.iter().copied()
    }

    /// Modules enqueued and not yet executed
    pub fn pending(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.pending.iter().copied()
    }

    pub fn is_pending(&self, id: ModuleId) -> bool {
        self.pending.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::traits::Factory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn add(registry: &mut ModuleRegistry, key: &str, deps: &[&str], factory: Factory) -> ModuleId {
        registry.insert(
            Some(key.to_string()),
            format!("http://h/{}.js", key),
            format!("http://h/{}.js", key),
            deps.iter().map(|d| d.to_string()).collect(),
            factory,
        )
    }

    #[test]
    fn test_execute_without_dependencies() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();
        let a = add(&mut registry, "a", &[], Factory::value(1u8));
        scheduler.enqueue(&registry, a);

        let outcome = scheduler.execute(&mut registry, &events, a).unwrap();
        assert_eq!(outcome, Execution::Executed);
        assert!(!scheduler.is_pending(a));
        assert_eq!(registry.export("a").unwrap().downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let a = add(
            &mut registry,
            "a",
            &[],
            Factory::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(Export::new(5u8))
            }),
        );
        scheduler.enqueue(&registry, a);
        scheduler.execute(&mut registry, &events, a).unwrap();
        let first = registry.export("a").cloned().unwrap();

        let outcome = scheduler.execute(&mut registry, &events, a).unwrap();
        assert_eq!(outcome, Execution::AlreadyExecuted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.export("a").unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_dependents_run_after_dependency() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();

        let c = add(&mut registry, "c", &["b"], Factory::new(|deps| {
            let b = deps[0].downcast_ref::<u32>().copied().unwrap_or_default();
            Ok(Export::new(b * 10))
        }));
        let b = add(&mut registry, "b", &["a"], Factory::new(|deps| {
            let a = deps[0].downcast_ref::<u32>().copied().unwrap_or_default();
            Ok(Export::new(a + 1))
        }));
        let a = add(&mut registry, "a", &[], Factory::value(1u32));
        for id in [c, b, a] {
            scheduler.enqueue(&registry, id);
        }

        assert_eq!(scheduler.execute(&mut registry, &events, c).unwrap(), Execution::Pending);
        assert_eq!(scheduler.execute(&mut registry, &events, b).unwrap(), Execution::Pending);
        assert_eq!(scheduler.execute(&mut registry, &events, a).unwrap(), Execution::Executed);

        assert_eq!(registry.export("c").unwrap().downcast_ref::<u32>(), Some(&20));
        assert_eq!(scheduler.pending().count(), 0);
    }

    #[test]
    fn test_cycle_stays_pending() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();
        let a = add(&mut registry, "a", &["b"], Factory::value(()));
        let b = add(&mut registry, "b", &["a"], Factory::value(()));
        scheduler.enqueue(&registry, a);
        scheduler.enqueue(&registry, b);

        assert_eq!(scheduler.execute(&mut registry, &events, a).unwrap(), Execution::Pending);
        assert_eq!(scheduler.execute(&mut registry, &events, b).unwrap(), Execution::Pending);
        assert_eq!(scheduler.pending().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();
        let a = add(&mut registry, "a", &[], Factory::new(|_| anyhow::bail!("boom")));
        scheduler.enqueue(&registry, a);

        let err = scheduler.execute(&mut registry, &events, a).unwrap_err();
        assert!(matches!(err, LoaderError::Factory { ref locator, .. } if locator == "http://h/a.js"));
        assert!(scheduler.is_pending(a));
        assert!(!registry.is_executed("a"));
    }

    #[test]
    fn test_factory_error_keeps_queued_dependents() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();

        let c = add(&mut registry, "c", &["a"], Factory::value(3u8));
        let b = add(&mut registry, "b", &["a"], Factory::new(|_| anyhow::bail!("b fails")));
        let e = add(&mut registry, "e", &["c"], Factory::value(5u8));
        let a = add(&mut registry, "a", &[], Factory::value(1u8));
        for id in [c, b, e, a] {
            scheduler.enqueue(&registry, id);
        }

        let err = scheduler.execute(&mut registry, &events, a).unwrap_err();
        assert!(matches!(err, LoaderError::Factory { ref locator, .. } if locator == "http://h/b.js"));
        assert!(registry.is_executed("c"));
        assert!(!registry.is_executed("e"));
        assert_eq!(scheduler.ready().collect::<Vec<_>>(), vec![e]);

        let z = add(&mut registry, "z", &[], Factory::value(0u8));
        scheduler.enqueue(&registry, z);
        assert_eq!(scheduler.execute(&mut registry, &events, z).unwrap(), Execution::Executed);
        assert!(registry.is_executed("e"));
        assert!(scheduler.is_pending(b));
        assert!(!registry.is_executed("b"));
    }

    #[test]
    fn test_failed_notification_keeps_dependents() {
        let mut registry = ModuleRegistry::new();
        let mut scheduler = ExecutionScheduler::new();
        let events = EventBus::new();
        events.subscribe(MODULE_EXECUTED, None, None);

        let b = add(&mut registry, "b", &["a"], Factory::value(2u8));
        let a = add(&mut registry, "a", &[], Factory::value(1u8));
        scheduler.enqueue(&registry, b);
        scheduler.enqueue(&registry, a);

        let err = scheduler.execute(&mut registry, &events, a).unwrap_err();
        assert!(matches!(err, LoaderError::MalformedSubscriber(_)));
        assert!(registry.is_executed("a"));
        assert!(!registry.is_executed("b"));

        events.unsubscribe(Some(MODULE_EXECUTED), None);
        let z = add(&mut registry, "z", &[], Factory::value(0u8));
        scheduler.enqueue(&registry, z);
        scheduler.execute(&mut registry, &events, z).unwrap();
        assert!(registry.is_executed("b"));
        assert_eq!(scheduler.pending().count(), 0);
    }
}
