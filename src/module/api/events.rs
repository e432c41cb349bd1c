//! Event notification system for the loader
//!
//! Synchronous publish/subscribe keyed by event name. The loader publishes a
//! fixed set of stable lifecycle notifications here; callers may also publish
//! their own events under any other name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

use crate::module::registry::module::ModuleSnapshot;
use crate::module::traits::LoaderError;

/// A declaration's metadata has been assigned its locator
pub const MODULE_META_GOT: &str = "module-meta-got";
/// A module has been registered under its keys
pub const MODULE_INITIALISED: &str = "module-initialised";
/// A module's dependencies have been resolved and fetches requested
pub const MODULE_DEPS_PROCESSED: &str = "module-deps-processed";
/// A module's factory has run and its export is memoized
pub const MODULE_EXECUTED: &str = "module-executed";
/// The declaration pipeline has finished for a module
pub const MODULE_DEFINED: &str = "module-defined";
/// A resource fetch failed
pub const LOAD_ERROR: &str = "error";

/// Opaque value handed back to a subscriber on every call
pub type Context = Arc<dyn Any + Send + Sync>;

/// Subscriber callback
pub type Callback = Arc<dyn Fn(Option<&Context>, &EventPayload) + Send + Sync>;

/// Payload carried by a published event
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Declaration metadata once its locator is known
    Meta {
        identifier: Option<String>,
        locator: String,
        dependencies: Vec<String>,
    },
    /// Snapshot of the module a lifecycle event concerns
    Module(ModuleSnapshot),
    /// Failed fetch
    LoadError { locator: String, reason: String },
    /// Caller-defined event data
    Custom(serde_json::Value),
}

impl EventPayload {
    pub fn module(&self) -> Option<&ModuleSnapshot> {
        match self {
            EventPayload::Module(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

#[derive(Clone)]
struct Subscription {
    callback: Option<Callback>,
    context: Option<Context>,
}

/// Event bus
///
/// Cloning yields another handle onto the same subscriber table, so handlers
/// may hold a handle and publish re-entrantly.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<HashMap<String, Vec<Subscription>>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscription>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a subscription for `name`
    ///
    /// Subscriptions for the same name run in registration order. A
    /// subscription without a callback is accepted here but makes every
    /// later publish of `name` fail.
    pub fn subscribe(
        &self,
        name: &str,
        callback: Option<Callback>,
        context: Option<Context>,
    ) -> &Self {
        self.table()
            .entry(name.to_string())
            .or_default()
            .push(Subscription { callback, context });
        self
    }

    /// Subscribe a closure, returning the callback handle for `unsubscribe`
    pub fn on<F>(&self, name: &str, f: F) -> Callback
    where
        F: Fn(Option<&Context>, &EventPayload) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(f);
        self.subscribe(name, Some(Arc::clone(&callback)), None);
        callback
    }

    /// Remove subscriptions
    ///
    /// No name clears every subscription. A name without a callback clears
    /// that name. A name with a callback removes every subscription holding
    /// that same callback.
    pub fn unsubscribe(&self, name: Option<&str>, callback: Option<&Callback>) -> &Self {
        let mut table = self.table();
        let Some(name) = name else {
            table.clear();
            return self;
        };

        let list = table.entry(name.to_string()).or_default();
        match callback {
            None => list.clear(),
            Some(target) => {
                let mut i = list.len();
                while i > 0 {
                    i -= 1;
                    let same = list[i]
                        .callback
                        .as_ref()
                        .is_some_and(|cb| same_callback(cb, target));
                    if same {
                        list.remove(i);
                    }
                }
            }
        }
        self
    }

    /// Invoke every current subscriber of `name` in order
    ///
    /// The subscriber list is read afresh on each call; handlers run with the
    /// table unlocked. A subscription with no callback aborts the publish
    /// with [`LoaderError::MalformedSubscriber`].
    pub fn publish(&self, name: &str, payload: &EventPayload) -> Result<(), LoaderError> {
        let list = match self.table().get(name) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return Ok(()),
        };

        trace!("Publishing {} to {} subscribers", name, list.len());
        for subscription in &list {
            let callback = subscription
                .callback
                .as_ref()
                .ok_or_else(|| LoaderError::MalformedSubscriber(name.to_string()))?;
            callback(subscription.context.as_ref(), payload);
        }
        Ok(())
    }

    /// Number of subscriptions currently registered for `name`
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.table().get(name).map_or(0, Vec::len)
    }
}

fn same_callback(a: &Callback, b: &Callback) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
