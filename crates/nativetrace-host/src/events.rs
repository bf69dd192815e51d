//! Listener storage for event targets
//!
//! Listeners are stored host-side, keyed by the target's identity, and are
//! invoked by dispatch with the raw target and event. Nothing here ever
//! passes through a proxy.

use crate::object::ObjectId;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A registered listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    /// Event type
    pub event_type: Rc<str>,
    /// Callback function
    pub callback: ObjectId,
    /// Capture-phase flag
    pub capture: bool,
}

/// Per-target listener lists
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    targets: RefCell<FxHashMap<ObjectId, Vec<Listener>>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; duplicates (same type, callback and capture) are ignored
    pub fn add(&self, target: ObjectId, listener: Listener) -> bool {
        let mut targets = self.targets.borrow_mut();
        let list = targets.entry(target).or_default();
        if list.contains(&listener) {
            return false;
        }
        list.push(listener);
        true
    }

    /// Remove a listener; returns false if it was not registered
    pub fn remove(&self, target: ObjectId, listener: &Listener) -> bool {
        let mut targets = self.targets.borrow_mut();
        let Some(list) = targets.get_mut(&target) else {
            return false;
        };
        let Some(pos) = list.iter().position(|l| l == listener) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            targets.remove(&target);
        }
        true
    }

    /// Snapshot of the listeners for an event type, in registration order
    pub fn listeners_for(&self, target: ObjectId, event_type: &str) -> Vec<Listener> {
        self.targets
            .borrow()
            .get(&target)
            .map(|list| {
                list.iter()
                    .filter(|l| &*l.event_type == event_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of listeners on a target, across all event types
    pub fn count(&self, target: ObjectId) -> usize {
        self.targets.borrow().get(&target).map_or(0, Vec::len)
    }

    /// Drop every listener list owned by a target
    pub fn clear_target(&self, target: ObjectId) {
        self.targets.borrow_mut().remove(&target);
    }
}
