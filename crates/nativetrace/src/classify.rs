//! Native boundary classification
//!
//! A callable is native when its `Function.prototype.toString` rendering has
//! the host's opaque `{ [native code] }` body. Script functions expose their
//! source and never match. Bound functions and proxies of callables render as
//! native code too, so the tracer marks those non-native when it creates
//! them. Every verdict is cached per object identity.

use crate::describe;
use crate::registry::IdentityRegistry;
use nativetrace_host::{Host, ObjectId, PropertyKey, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::cell::RefCell;

/// `function <name>(<params>) { ... [native code] ... }`
static NATIVE_SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^function[^()]*?\([^()]*?\)[^{}]*?\{[^{}]*?\[native code\](?s:.)*?\}$").unwrap()
});

/// Check a source rendering against the native signature
pub fn is_native_source(source: &str) -> bool {
    NATIVE_SOURCE.is_match(source)
}

/// Cached native / user-authored verdicts
#[derive(Debug, Default)]
pub struct NativeClassifier {
    cache: RefCell<FxHashMap<ObjectId, bool>>,
}

impl NativeClassifier {
    /// Create an empty classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `value` is a callable with an opaque native body
    pub fn is_native_callable(&self, host: &Host, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        if !host.is_callable(value) {
            return false;
        }
        if let Some(&known) = self.cache.borrow().get(id) {
            return known;
        }
        let native = host
            .function_source(*id)
            .map(|source| is_native_source(&source))
            .unwrap_or(false);
        self.cache.borrow_mut().insert(*id, native);
        native
    }

    /// Permanently classify `id` as user-authored
    pub fn mark_non_native(&self, id: ObjectId) {
        self.cache.borrow_mut().insert(id, false);
    }

    /// Whether `value` is a native callable, or a non-callable object whose
    /// `constructor` is a native callable other than `object_ctor`
    pub fn is_native_object(
        &self,
        host: &Host,
        registry: &IdentityRegistry,
        value: &Value,
        object_ctor: ObjectId,
    ) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        if host.is_callable(value) {
            return self.is_native_callable(host, value);
        }
        let key = PropertyKey::from("constructor");
        let constructor = match describe::find_property(host, *id, &key) {
            Some((_, desc)) => match desc.value() {
                Some(value @ Value::Object(_)) => value.clone(),
                _ => return false,
            },
            None => return false,
        };
        let constructor = registry.unwrap(&constructor);
        if constructor == Value::Object(object_ctor) {
            return false;
        }
        self.is_native_callable(host, &constructor)
    }

    /// Number of cached verdicts
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Check if nothing has been classified yet
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// Forget verdicts for objects that are no longer live
    pub fn sweep(&self, is_live: impl Fn(ObjectId) -> bool) -> usize {
        let mut cache = self.cache.borrow_mut();
        let before = cache.len();
        cache.retain(|id, _| is_live(*id));
        before - cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(host: &Host) -> Value {
        Value::Object(host.realm(host.main_realm()).unwrap().document())
    }

    fn object_ctor(host: &Host) -> ObjectId {
        host.realm(host.main_realm())
            .unwrap()
            .intrinsic("Object")
            .unwrap()
    }

    #[test]
    fn test_native_source_signature() {
        assert!(is_native_source("function cloneNode() {\n    [native code]\n}"));
        assert!(is_native_source("function () { [native code] }"));
        assert!(is_native_source("function get innerHTML() { [native code] }"));
        assert!(!is_native_source("function f() { return 1; }"));
        assert!(!is_native_source("function f() { if (x) { return '[native code]'; } }"));
        assert!(!is_native_source("() => 1"));
    }

    #[test]
    fn test_script_and_native_functions() {
        let host = Host::new();
        let realm = host.main_realm();
        let classifier = NativeClassifier::new();
        let native = host.create_native_function(realm, "n", |_, _, _| Ok(Value::Undefined));
        let script = host.create_script_function(realm, "s", "function s() {}", |_, _, _| {
            Ok(Value::Undefined)
        });

        assert!(classifier.is_native_callable(&host, &Value::Object(native)));
        assert!(!classifier.is_native_callable(&host, &Value::Object(script)));
        assert!(!classifier.is_native_callable(&host, &Value::string("function () { [native code] }")));
        assert_eq!(classifier.len(), 2);
    }

    #[test]
    fn test_mark_non_native_wins_over_source() {
        let host = Host::new();
        let realm = host.main_realm();
        let classifier = NativeClassifier::new();
        let native = host.create_native_function(realm, "n", |_, _, _| Ok(Value::Undefined));
        let bound = host.bind_function(native, Value::Undefined, vec![]).unwrap();

        assert!(classifier.is_native_callable(&host, &Value::Object(native)));
        classifier.mark_non_native(bound);
        assert!(!classifier.is_native_callable(&host, &Value::Object(bound)));
    }

    #[test]
    fn test_native_objects() {
        let host = Host::new();
        let realm = host.main_realm();
        let classifier = NativeClassifier::new();
        let registry = IdentityRegistry::new();
        let ctor = object_ctor(&host);

        let div = host
            .invoke(&document(&host), "createElement", &[Value::string("div")])
            .unwrap();
        assert!(classifier.is_native_object(&host, &registry, &div, ctor));

        let plain = Value::Object(host.create_plain_object(realm));
        assert!(!classifier.is_native_object(&host, &registry, &plain, ctor));

        let point = host.create_script_function(realm, "Point", "function Point() {}", |_, _, _| {
            Ok(Value::Undefined)
        });
        let instance = host.construct(&Value::Object(point), &[]).unwrap();
        assert!(!classifier.is_native_object(&host, &registry, &instance, ctor));

        let orphan = Value::Object(host.alloc_object(realm, "Object", None));
        assert!(!classifier.is_native_object(&host, &registry, &orphan, ctor));
        assert!(!classifier.is_native_object(&host, &registry, &Value::Number(1.0), ctor));
    }

    #[test]
    fn test_sweep_forgets_released() {
        let host = Host::new();
        let realm = host.main_realm();
        let classifier = NativeClassifier::new();
        let f = host.create_native_function(realm, "f", |_, _, _| Ok(Value::Undefined));
        classifier.is_native_callable(&host, &Value::Object(f));

        host.release(f);
        assert_eq!(classifier.sweep(|id| host.is_live(id)), 1);
        assert!(classifier.is_empty());
    }
}
