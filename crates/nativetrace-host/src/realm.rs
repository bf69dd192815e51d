//! Execution realms
//!
//! A realm is one global scope with its own set of intrinsics (constructors,
//! prototypes, `document`). Objects remember the realm they were created in,
//! which is how cross-realm values are recognised.

use crate::object::ObjectId;
use rustc_hash::FxHashMap;
use std::fmt;

/// Realm identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RealmId(pub(crate) u32);

impl RealmId {
    /// The realm created by [`Host::new`](crate::Host::new)
    pub const MAIN: RealmId = RealmId(0);

    /// Get the numeric ID value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realm{}", self.0)
    }
}

/// A realm and its intrinsics
#[derive(Debug, Clone)]
pub struct Realm {
    id: RealmId,
    global: ObjectId,
    document: ObjectId,
    intrinsics: FxHashMap<String, ObjectId>,
}

impl Realm {
    pub(crate) fn new(
        id: RealmId,
        global: ObjectId,
        document: ObjectId,
        intrinsics: FxHashMap<String, ObjectId>,
    ) -> Self {
        Self {
            id,
            global,
            document,
            intrinsics,
        }
    }

    /// Realm identifier
    pub fn id(&self) -> RealmId {
        self.id
    }

    /// The global object (`window`)
    pub fn global(&self) -> ObjectId {
        self.global
    }

    /// The realm's document
    pub fn document(&self) -> ObjectId {
        self.document
    }

    /// Look up an intrinsic by path, e.g. `"Element.prototype"`
    pub fn intrinsic(&self, name: &str) -> Option<ObjectId> {
        self.intrinsics.get(name).copied()
    }

    /// Iterate over all intrinsic names
    pub fn intrinsic_names(&self) -> impl Iterator<Item = &str> {
        self.intrinsics.keys().map(String::as_str)
    }
}
