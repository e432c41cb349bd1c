//! Public extension API
//!
//! Lifecycle notifications callers can subscribe to.

pub mod events;

pub use events::{Callback, Context, EventBus, EventPayload};
