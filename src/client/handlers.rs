//! Per-event-type handler registry

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::types::Event;

/// Callback invoked for every event of a registered type
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure as an [`EventHandler`]
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered, non-deduplicating handler lists keyed by event type
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler; registering the same handler twice invokes it twice
    pub fn add(&self, event_type: impl Into<String>, handler: EventHandler) {
        self.handlers
            .lock()
            .entry(event_type.into())
            .or_default()
            .push(handler);
    }

    /// Remove the first registration of `handler` for `event_type`.
    /// Returns false when nothing matched.
    pub fn remove(&self, event_type: &str, handler: &EventHandler) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(list) = handlers.get_mut(event_type) else {
            return false;
        };
        let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            handlers.remove(event_type);
        }
        true
    }

    /// Number of registrations for an event type
    pub fn count(&self, event_type: &str) -> usize {
        self.handlers.lock().get(event_type).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the event's type, in registration order.
    ///
    /// The lock is released before any handler runs, so handlers may register
    /// or remove handlers themselves. A panicking handler is logged and does
    /// not stop delivery to the ones after it. Returns the number of handlers
    /// that completed.
    pub fn dispatch(&self, event: &Event) -> usize {
        let handlers = match self.handlers.lock().get(&event.event_type) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(panic) => error!(
                    event_type = %event.event_type,
                    event_id = ?event.event_id,
                    "Realtime handler panicked: {}",
                    panic_message(&*panic)
                ),
            }
        }
        completed
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
