//! Duplicate suppression for replayed events
//!
//! Reconnects replay from the last seen id, so a handler may see the same
//! event twice. Wrapping it with [`dedup_handler`] skips ids seen recently.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::{handler, EventHandler};
use crate::types::Event;

/// Default number of ids remembered
pub const DEFAULT_WINDOW: usize = 256;

/// Bounded memory of recently seen event ids
#[derive(Debug)]
pub struct EventDeduplicator {
    window: usize,
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl EventDeduplicator {
    /// Remember up to `window` ids (at least one)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            seen: HashSet::with_capacity(window),
            order: VecDeque::with_capacity(window),
        }
    }

    /// True the first time an id is seen. Events without an id always pass.
    pub fn first_seen(&mut self, event: &Event) -> bool {
        let Some(id) = event.event_id.as_deref() else {
            return true;
        };
        if self.seen.contains(id) {
            return false;
        }

        if self.order.len() == self.window {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    /// Number of ids currently remembered
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Wrap `inner` so it runs at most once per event id within the window
pub fn dedup_handler(window: usize, inner: EventHandler) -> EventHandler {
    let dedup = Arc::new(Mutex::new(EventDeduplicator::new(window)));
    handler(move |event| {
        if dedup.lock().first_seen(event) {
            inner(event);
        }
    })
}
