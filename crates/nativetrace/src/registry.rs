//! Identity registry: originals, their wrappers and wrapper metadata
//!
//! Records live in a dense table addressed by [`RecordId`]; two side indexes
//! resolve an original or a wrapper to its record. Objects shimmed in place
//! are their own wrapper, so they appear in both indexes under the same
//! handle.
//!
//! The registry never keeps heap objects alive. Handles carry a generation,
//! so a record whose object was released can never match a newer object in
//! the same slot; [`IdentityRegistry::sweep`] reclaims such records.

use nativetrace_host::{ObjectId, Value};
use rustc_hash::FxHashMap;

/// Index of a record in the registry table
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(u32);

impl RecordId {
    /// Numeric index
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// One tracked original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperRecord {
    /// The object being observed
    pub original: ObjectId,
    /// The proxy handed out in its place (the original itself when shimmed)
    pub wrapper: ObjectId,
    /// Diagnostic name; the first name assigned sticks
    pub name: Option<String>,
    /// Whether the original's own properties were shimmed in place
    pub shimmed: bool,
}

/// Bidirectional original <-> wrapper mapping
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    records: Vec<WrapperRecord>,
    by_original: FxHashMap<ObjectId, RecordId>,
    by_wrapper: FxHashMap<ObjectId, RecordId>,
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, id: RecordId) -> Option<&WrapperRecord> {
        self.records.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: RecordId) -> Option<&mut WrapperRecord> {
        self.records.get_mut(id.0 as usize)
    }

    fn push(&mut self, record: WrapperRecord) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        self.by_original.insert(record.original, id);
        self.by_wrapper.insert(record.wrapper, id);
        self.records.push(record);
        id
    }

    /// The wrapper created for `original`, if any
    pub fn wrapper_for(&self, original: ObjectId) -> Option<ObjectId> {
        self.by_original
            .get(&original)
            .and_then(|&id| self.get(id))
            .map(|record| record.wrapper)
    }

    /// Record for a wrapper or an original (wrapper key first)
    pub fn record_for(&self, object: ObjectId) -> Option<&WrapperRecord> {
        self.by_wrapper
            .get(&object)
            .or_else(|| self.by_original.get(&object))
            .and_then(|&id| self.get(id))
    }

    /// Record for a wrapper (or in-place shimmed object) only
    pub fn record_for_wrapper(&self, wrapper: ObjectId) -> Option<&WrapperRecord> {
        self.by_wrapper.get(&wrapper).and_then(|&id| self.get(id))
    }

    /// Register a wrapper for `original`
    ///
    /// An existing registration is never replaced; a repeated call only
    /// fills a missing name.
    pub fn register(&mut self, original: ObjectId, wrapper: ObjectId, name: Option<&str>) -> RecordId {
        if let Some(&id) = self.by_original.get(&original) {
            self.fill_name(id, name);
            return id;
        }
        self.push(WrapperRecord {
            original,
            wrapper,
            name: name.map(str::to_string),
            shimmed: false,
        })
    }

    /// Register an object that is instrumented in place
    pub fn register_in_place(&mut self, object: ObjectId, name: Option<&str>) -> RecordId {
        if let Some(&id) = self.by_original.get(&object) {
            if let Some(record) = self.get_mut(id) {
                record.shimmed = true;
            }
            self.by_wrapper.insert(object, id);
            self.fill_name(id, name);
            return id;
        }
        self.push(WrapperRecord {
            original: object,
            wrapper: object,
            name: name.map(str::to_string),
            shimmed: true,
        })
    }

    /// Give a nameless record a name; named records keep theirs
    pub fn adopt_name(&mut self, object: ObjectId, name: Option<&str>) {
        let id = self
            .by_wrapper
            .get(&object)
            .or_else(|| self.by_original.get(&object))
            .copied();
        if let Some(id) = id {
            self.fill_name(id, name);
        }
    }

    fn fill_name(&mut self, id: RecordId, name: Option<&str>) {
        if let (Some(record), Some(name)) = (self.get_mut(id), name) {
            if record.name.is_none() {
                record.name = Some(name.to_string());
            }
        }
    }

    /// The original behind a wrapper; anything else is returned unchanged
    pub fn unwrap(&self, value: &Value) -> Value {
        match value {
            Value::Object(id) => match self.record_for_wrapper(*id) {
                Some(record) => Value::Object(record.original),
                None => value.clone(),
            },
            _ => value.clone(),
        }
    }

    /// Whether no further instrumentation is needed: primitives, wrappers
    /// and in-place shimmed objects
    pub fn is_tracked(&self, value: &Value) -> bool {
        match value {
            Value::Object(id) => self.by_wrapper.contains_key(id),
            _ => true,
        }
    }

    /// Drop every record whose original or wrapper is no longer live
    ///
    /// Returns the number of records removed.
    pub fn sweep(&mut self, is_live: impl Fn(ObjectId) -> bool) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| is_live(record.original) && is_live(record.wrapper));
        let removed = before - self.records.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.by_original.clear();
        self.by_wrapper.clear();
        for (index, record) in self.records.iter().enumerate() {
            let id = RecordId(index as u32);
            self.by_original.insert(record.original, id);
            self.by_wrapper.insert(record.wrapper, id);
            if record.shimmed {
                self.by_wrapper.insert(record.original, id);
            }
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records
    pub fn records(&self) -> impl Iterator<Item = &WrapperRecord> {
        self.records.iter()
    }
}
