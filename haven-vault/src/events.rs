//! Change feeds.
//!
//! Stores publish every successful write to a [`ChangeFeed`]. Sinks run
//! synchronously on the writing task once the write has landed and store
//! locks are released, so a sink may read the store back.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Placeholder that stands in for secret values in events and masked
/// output.
pub const REDACTED_MARKER: &str = "********";

/// [`REDACTED_MARKER`] as a JSON value.
pub fn redacted() -> Value {
    Value::String(REDACTED_MARKER.to_string())
}

/// A change to a runtime key. Secure keys carry [`REDACTED_MARKER`]
/// instead of their values.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Receives change events from a [`ChangeFeed`].
pub trait ChangeSink<E>: Send + Sync {
    fn on_change(&self, event: &E);
}

/// Fan-out point for change events. Clones share their sinks.
pub struct ChangeFeed<E> {
    sinks: Arc<RwLock<Vec<Arc<dyn ChangeSink<E>>>>>,
}

impl<E> ChangeFeed<E> {
    pub fn new() -> Self {
        Self {
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Adds a sink for every later event.
    pub fn attach(&self, sink: Arc<dyn ChangeSink<E>>) {
        self.sinks.write().push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn emit(&self, event: &E) {
        // Snapshot so a sink may attach another sink.
        let sinks = self.sinks.read().clone();
        for sink in sinks {
            sink.on_change(event);
        }
    }
}

impl<E> Clone for ChangeFeed<E> {
    fn clone(&self) -> Self {
        Self {
            sinks: Arc::clone(&self.sinks),
        }
    }
}

impl<E> Default for ChangeFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}
