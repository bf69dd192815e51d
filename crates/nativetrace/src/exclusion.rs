//! Objects that must never be proxied or shimmed
//!
//! Two sets, seeded once when a session is installed. Fundamental
//! constructors and prototypes are in both: the tracer itself depends on
//! them, and wrapping them would break identity checks everywhere. The
//! document and window references are only barred from proxying; their
//! properties are shimmed instead.

use crate::config::TraceConfig;
use crate::error::{TraceError, TraceResult};
use nativetrace_host::{Host, ObjectId, Realm, Value};
use rustc_hash::FxHashSet;

/// Constructors excluded together with their prototypes
const FUNDAMENTALS: &[&str] = &[
    "Object", "String", "Number", "Boolean", "RegExp", "Function", "Error", "Set", "Array",
];

/// Objects excluded from both strategies
const SHARED: &[&str] = &["Reflect", "console", "console.__proto__"];

/// The two exclusion sets
#[derive(Debug, Default, Clone)]
pub struct ExclusionPolicy {
    never_wrap: FxHashSet<ObjectId>,
    never_shim: FxHashSet<ObjectId>,
}

impl ExclusionPolicy {
    /// Create an empty policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the policy from a realm's intrinsics and the configuration
    pub fn for_realm(host: &Host, realm: &Realm, config: &TraceConfig) -> TraceResult<Self> {
        let mut policy = Self::new();
        let intrinsic = |name: &str| {
            realm
                .intrinsic(name)
                .ok_or_else(|| TraceError::MissingIntrinsic(name.to_string()))
        };

        for name in FUNDAMENTALS {
            policy.exclude(intrinsic(name)?);
            policy.exclude(intrinsic(&format!("{}.prototype", name))?);
        }
        for name in SHARED {
            policy.exclude(intrinsic(name)?);
        }

        let set_add = host.get(intrinsic("Set.prototype")?, &"add".into())?;
        let console_log = host.get(intrinsic("console")?, &"log".into())?;
        let document_location = host.get(realm.document(), &"location".into())?;
        let window_location = host.get(realm.global(), &"location".into())?;
        for value in [set_add, console_log, document_location, window_location] {
            if let Value::Object(id) = value {
                policy.exclude(id);
            }
        }

        let global = realm.global();
        policy.exclude_from_wrapping(realm.document());
        policy.exclude_from_wrapping(global);
        for name in ["parent", "top"] {
            if let Value::Object(ancestor) = host.get(global, &name.into())? {
                policy.exclude_from_wrapping(ancestor);
                if ancestor != global {
                    policy.exclude_from_shimming(ancestor);
                }
            }
        }

        if config.exclude_array_families {
            policy.exclude_array_families(host, global)?;
        }
        for path in &config.never_wrap {
            policy.exclude_from_wrapping(resolve_path(host, global, path)?);
        }
        for path in &config.never_shim {
            policy.exclude_from_shimming(resolve_path(host, global, path)?);
        }
        Ok(policy)
    }

    /// Every global whose name contains `Array` (typed arrays, buffers),
    /// together with its `prototype`
    fn exclude_array_families(&mut self, host: &Host, global: ObjectId) -> TraceResult<()> {
        for key in host.own_keys(global) {
            let is_family = key.as_str().is_some_and(|name| name.contains("Array"));
            if !is_family {
                continue;
            }
            if let Value::Object(family) = host.get(global, &key)? {
                self.exclude(family);
                if let Value::Object(proto) = host.get(family, &"prototype".into())? {
                    self.exclude(proto);
                }
            }
        }
        Ok(())
    }

    /// Exclude from both strategies
    pub fn exclude(&mut self, id: ObjectId) {
        self.never_wrap.insert(id);
        self.never_shim.insert(id);
    }

    /// Exclude from proxying only
    pub fn exclude_from_wrapping(&mut self, id: ObjectId) {
        self.never_wrap.insert(id);
    }

    /// Exclude from shimming only
    pub fn exclude_from_shimming(&mut self, id: ObjectId) {
        self.never_shim.insert(id);
    }

    /// Whether `id` must never be proxied
    pub fn is_excluded_from_wrapping(&self, id: ObjectId) -> bool {
        self.never_wrap.contains(&id)
    }

    /// Whether `id`'s properties must never be shimmed
    pub fn is_excluded_from_shimming(&self, id: ObjectId) -> bool {
        self.never_shim.contains(&id)
    }
}

/// Resolve `"a.b.c"` starting at `root`; every step must yield an object
pub fn resolve_path(host: &Host, root: ObjectId, path: &str) -> TraceResult<ObjectId> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(TraceError::UnresolvedPath(path.to_string()));
        }
        current = match host.get(current, &segment.into())? {
            Value::Object(id) => id,
            _ => return Err(TraceError::UnresolvedPath(path.to_string())),
        };
    }
    Ok(current)
}
