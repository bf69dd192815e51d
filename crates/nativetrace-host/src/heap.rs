//! Object heap
//!
//! Objects live in a dense slot table addressed by generation-tagged
//! [`ObjectId`] handles. Releasing an object frees its slot and bumps the
//! slot generation, so stale handles are detected instead of aliasing the
//! next object allocated there.
//!
//! All access goes through short `RefCell` borrows. Callers must never invoke
//! host code (natives, proxy traps) while holding a borrow obtained from
//! [`Heap::with`] or [`Heap::with_mut`].

use crate::object::{ObjectData, ObjectId};
use std::cell::RefCell;

/// A single heap slot
struct Slot {
    generation: u32,
    data: Option<ObjectData>,
}

/// Heap statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live objects
    pub live_objects: usize,
    /// Number of slots ever allocated
    pub capacity: usize,
    /// Number of slots waiting for reuse
    pub free_slots: usize,
}

/// Slot-table heap for host objects
pub struct Heap {
    /// All slots (live and free)
    slots: RefCell<Vec<Slot>>,
    /// Indices of released slots
    free: RefCell<Vec<u32>>,
}

impl Heap {
    /// Create a new empty heap
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
        }
    }

    /// Allocate an object, reusing a released slot when one is available
    pub fn allocate(&self, data: ObjectData) -> ObjectId {
        let mut slots = self.slots.borrow_mut();
        if let Some(index) = self.free.borrow_mut().pop() {
            let slot = &mut slots[index as usize];
            slot.data = Some(data);
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }

        let index = slots.len() as u32;
        slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    /// Release an object
    ///
    /// Returns false if the handle was already stale.
    pub fn release(&self, id: ObjectId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.data.is_none() {
            return false;
        }
        slot.data = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.borrow_mut().push(id.index);
        true
    }

    /// Check whether a handle still refers to a live object
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.slots
            .borrow()
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.data.is_some())
    }

    /// Run a closure against an object's data
    pub fn with<R>(&self, id: ObjectId, f: impl FnOnce(&ObjectData) -> R) -> Option<R> {
        let slots = self.slots.borrow();
        let slot = slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref().map(f)
    }

    /// Run a closure against an object's data, mutably
    pub fn with_mut<R>(&self, id: ObjectId, f: impl FnOnce(&mut ObjectData) -> R) -> Option<R> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut().map(f)
    }

    /// Get heap statistics
    pub fn stats(&self) -> HeapStats {
        let slots = self.slots.borrow();
        let free_slots = self.free.borrow().len();
        HeapStats {
            live_objects: slots.len() - free_slots,
            capacity: slots.len(),
            free_slots,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::RealmId;

    fn data() -> ObjectData {
        ObjectData::new(RealmId::MAIN, "Object", None)
    }

    #[test]
    fn test_allocate_and_access() {
        let heap = Heap::new();
        let id = heap.allocate(data());
        assert!(heap.is_live(id));
        assert_eq!(
            heap.with(id, |obj| obj.class_name.to_string()),
            Some("Object".to_string())
        );
    }

    #[test]
    fn test_release_invalidates_handle() {
        let heap = Heap::new();
        let id = heap.allocate(data());
        assert!(heap.release(id));
        assert!(!heap.is_live(id));
        assert!(!heap.release(id));
        assert!(heap.with(id, |_| ()).is_none());
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let heap = Heap::new();
        let first = heap.allocate(data());
        heap.release(first);
        let second = heap.allocate(data());

        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(!heap.is_live(first));
        assert!(heap.is_live(second));
    }

    #[test]
    fn test_stats() {
        let heap = Heap::new();
        let a = heap.allocate(data());
        let _b = heap.allocate(data());
        heap.release(a);

        let stats = heap.stats();
        assert_eq!(stats.live_objects, 1);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.free_slots, 1);
    }
}
