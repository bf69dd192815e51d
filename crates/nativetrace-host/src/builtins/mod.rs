//! Built-in library installed into every realm
//!
//! `lang` provides the language-level constructors (`Object`, `Function`,
//! `Array`, primitive wrappers, `Set`, typed arrays, `Reflect`, `console`),
//! `dom` the document surface (`EventTarget` down to `HTMLDivElement`,
//! `Document`, events, `Location`, `Window`) and the realm's global object.

mod lang;
mod dom;

use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::object::{ConstructFn, FunctionBody, NativeFn, ObjectId, PropertyDescriptor};
use crate::realm::{Realm, RealmId};
use crate::value::{PropertyKey, Value};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Build a fresh realm and register it with the host
pub(crate) fn create_realm(host: &Host) -> RealmId {
    let id = host.next_realm_id();
    let mut builder = RealmBuilder::new(host, id);
    lang::install(&mut builder);
    let (global, document) = dom::install(&mut builder);
    host.register_realm(builder.finish(global, document));
    id
}

/// Argument `index`, or `undefined` when absent
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

pub(crate) fn native_fn(
    f: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
) -> NativeFn {
    Rc::new(f)
}

pub(crate) fn construct_fn(f: impl Fn(&Host, &[Value]) -> HostResult<Value> + 'static) -> ConstructFn {
    Rc::new(f)
}

/// Incremental realm construction
///
/// Everything allocated here is fresh, so property writes go straight to the
/// heap without redefinition checks.
pub(crate) struct RealmBuilder<'h> {
    host: &'h Host,
    realm: RealmId,
    object_proto: ObjectId,
    function_proto: ObjectId,
    intrinsics: FxHashMap<String, ObjectId>,
    globals: Vec<(&'static str, ObjectId)>,
}

impl<'h> RealmBuilder<'h> {
    fn new(host: &'h Host, realm: RealmId) -> Self {
        let object_proto = host.alloc_object(realm, "Object", None);
        let function_proto = host.alloc_function(
            realm,
            Some(object_proto),
            "",
            FunctionBody::Native {
                call: native_fn(|_, _, _| Ok(Value::Undefined)),
                construct: None,
            },
        );
        let mut intrinsics = FxHashMap::default();
        intrinsics.insert("Object.prototype".to_string(), object_proto);
        intrinsics.insert("Function.prototype".to_string(), function_proto);
        Self {
            host,
            realm,
            object_proto,
            function_proto,
            intrinsics,
            globals: Vec::new(),
        }
    }

    pub(crate) fn host(&self) -> &'h Host {
        self.host
    }

    pub(crate) fn realm(&self) -> RealmId {
        self.realm
    }

    pub(crate) fn object_proto(&self) -> ObjectId {
        self.object_proto
    }

    pub(crate) fn function_proto(&self) -> ObjectId {
        self.function_proto
    }

    /// Allocate an ordinary object
    pub(crate) fn object(&self, class_name: &str, prototype: Option<ObjectId>) -> ObjectId {
        self.host.alloc_object(self.realm, class_name, prototype)
    }

    pub(crate) fn put(&self, target: ObjectId, key: impl Into<PropertyKey>, desc: PropertyDescriptor) {
        self.host.put_property(target, key.into(), desc);
    }

    /// Allocate a native function
    pub(crate) fn native(
        &self,
        name: &str,
        call: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) -> ObjectId {
        self.host.alloc_function(
            self.realm,
            Some(self.function_proto),
            name,
            FunctionBody::Native {
                call: Rc::new(call),
                construct: None,
            },
        )
    }

    /// Install a native method (writable, configurable, not enumerable)
    pub(crate) fn method(
        &self,
        target: ObjectId,
        name: &str,
        call: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) -> ObjectId {
        let func = self.native(name, call);
        self.put(target, name, PropertyDescriptor::builtin(Value::Object(func)));
        func
    }

    /// Install a read-only native accessor
    pub(crate) fn getter(
        &self,
        target: ObjectId,
        name: &str,
        get: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) {
        let get = self.native(&format!("get {}", name), get);
        self.put(target, name, PropertyDescriptor::accessor(Some(get), None));
    }

    /// Install a read-write native accessor
    pub(crate) fn accessor(
        &self,
        target: ObjectId,
        name: &str,
        get: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
        set: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) {
        let get = self.native(&format!("get {}", name), get);
        let set = self.native(&format!("set {}", name), set);
        self.put(target, name, PropertyDescriptor::accessor(Some(get), Some(set)));
    }

    /// Install a built-in data value (writable, configurable, not enumerable)
    pub(crate) fn value(&self, target: ObjectId, name: &str, value: Value) {
        self.put(target, name, PropertyDescriptor::builtin(value));
    }

    /// Allocate a prototype object
    pub(crate) fn prototype(&self, class_name: &str, parent: ObjectId) -> ObjectId {
        self.object(class_name, Some(parent))
    }

    /// Create a constructor for `proto`, link the two and expose the
    /// constructor as a global
    pub(crate) fn constructor(
        &mut self,
        name: &'static str,
        proto: ObjectId,
        call: NativeFn,
        construct: Option<ConstructFn>,
    ) -> ObjectId {
        let ctor = self.host.alloc_function(
            self.realm,
            Some(self.function_proto),
            name,
            FunctionBody::Native { call, construct },
        );
        self.put(ctor, "prototype", PropertyDescriptor::frozen(Value::Object(proto)));
        self.put(proto, "constructor", PropertyDescriptor::builtin(Value::Object(ctor)));
        self.register(name, ctor);
        self.intrinsics.insert(format!("{}.prototype", name), proto);
        self.globals.push((name, ctor));
        ctor
    }

    /// DOM interface constructor
    ///
    /// Calling without `new` always fails; `new` fails with "Illegal
    /// constructor" unless a construct behaviour is given.
    pub(crate) fn interface(
        &mut self,
        name: &'static str,
        proto: ObjectId,
        construct: Option<ConstructFn>,
    ) -> ObjectId {
        let constructible = construct.is_some();
        let call = native_fn(move |_, _, _| {
            if constructible {
                Err(HostError::type_error(format!(
                    "Failed to construct '{}': Please use the 'new' operator, this DOM object constructor cannot be called as a function.",
                    name
                )))
            } else {
                Err(HostError::type_error("Illegal constructor"))
            }
        });
        let construct = construct
            .unwrap_or_else(|| construct_fn(|_, _| Err(HostError::type_error("Illegal constructor"))));
        self.constructor(name, proto, call, Some(construct))
    }

    /// Register an intrinsic by name
    pub(crate) fn register(&mut self, name: &str, id: ObjectId) {
        self.intrinsics.insert(name.to_string(), id);
    }

    /// Expose a non-constructor global (`Reflect`, `console`)
    pub(crate) fn global(&mut self, name: &'static str, id: ObjectId) {
        self.register(name, id);
        self.globals.push((name, id));
    }

    pub(crate) fn globals(&self) -> &[(&'static str, ObjectId)] {
        &self.globals
    }

    fn finish(self, global: ObjectId, document: ObjectId) -> Realm {
        let mut intrinsics = self.intrinsics;
        intrinsics.insert("window".to_string(), global);
        intrinsics.insert("document".to_string(), document);
        Realm::new(self.realm, global, document, intrinsics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_has_core_and_dom_intrinsics() {
        let host = Host::new();
        let realm = host.realm(host.main_realm()).unwrap();
        for name in [
            "Object",
            "Function.prototype",
            "Array",
            "Set.prototype",
            "Uint8Array",
            "EventTarget.prototype",
            "Element.prototype",
            "CustomEvent",
            "console",
            "window",
            "document",
        ] {
            assert!(realm.intrinsic(name).is_some(), "missing intrinsic {}", name);
        }
    }

    #[test]
    fn test_interface_constructor_rejects_plain_call() {
        let host = Host::new();
        let realm = host.realm(host.main_realm()).unwrap();
        let node = Value::Object(realm.intrinsic("Node").unwrap());

        assert!(host.call(&node, Value::Undefined, &[]).is_err());
        let err = host.construct(&node, &[]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Illegal constructor");
    }

    #[test]
    fn test_prototype_links_back_to_constructor() {
        let host = Host::new();
        let realm = host.realm(host.main_realm()).unwrap();
        let element = realm.intrinsic("Element").unwrap();
        let proto = realm.intrinsic("Element.prototype").unwrap();

        assert_eq!(host.get(element, &"prototype".into()).unwrap(), Value::Object(proto));
        assert_eq!(host.get(proto, &"constructor".into()).unwrap(), Value::Object(element));
        assert_eq!(host.class_of(&Value::Object(proto)), "ElementPrototype");
    }
}
