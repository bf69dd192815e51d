//! The host: realms, heap and the object operations
//!
//! Every property read, write, call and construction goes through [`Host`].
//! When the addressed object is a proxy the operation is handed to the
//! proxy's [`ProxyHandler`]; everything else follows ordinary prototype-chain
//! semantics.
//!
//! The host is single-threaded and reentrant: natives and proxy traps receive
//! `&Host` and may call back into it freely. Heap borrows are always released
//! before user-supplied code runs.

use crate::builtins;
use crate::error::{HostError, HostResult};
use crate::events::ListenerRegistry;
use crate::heap::{Heap, HeapStats};
use crate::object::{
    ConstructFn, FunctionBody, FunctionData, NativeFn, ObjectData, ObjectId, ObjectKind,
    PropertyDescriptor, ProxyData,
};
use crate::proxy::ProxyHandler;
use crate::realm::{Realm, RealmId};
use crate::value::{number_to_string, PropertyKey, Value};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Result of looking a key up on one object of a prototype chain
enum Lookup {
    /// The object is a proxy; the operation belongs to its handler
    Proxy(ObjectId, Rc<dyn ProxyHandler>),
    /// Own property found
    Found(PropertyDescriptor),
    /// Not found here; continue with the prototype
    Next(Option<ObjectId>),
}

/// What a call or construct resolves to, copied out of the heap
enum Invocation {
    Proxy(ObjectId, Rc<dyn ProxyHandler>),
    Native(NativeFn, Option<ConstructFn>),
    Script(NativeFn, bool),
    Bound(ObjectId, Value, Vec<Value>),
    NotCallable,
}

/// The host environment
pub struct Host {
    heap: Heap,
    realms: RefCell<Vec<Rc<Realm>>>,
    listeners: ListenerRegistry,
    console: RefCell<Vec<String>>,
}

impl Host {
    /// Create a host with a single main realm
    pub fn new() -> Self {
        let host = Self {
            heap: Heap::new(),
            realms: RefCell::new(Vec::new()),
            listeners: ListenerRegistry::new(),
            console: RefCell::new(Vec::new()),
        };
        builtins::create_realm(&host);
        host
    }

    // ========================================================================
    // Realms
    // ========================================================================

    /// The realm created together with the host
    pub fn main_realm(&self) -> RealmId {
        RealmId::MAIN
    }

    /// Look up a realm
    pub fn realm(&self, id: RealmId) -> HostResult<Rc<Realm>> {
        self.realms
            .borrow()
            .get(id.0 as usize)
            .cloned()
            .ok_or(HostError::UnknownRealm(id.0))
    }

    /// Create an unrelated realm (a separate window)
    pub fn create_realm(&self) -> RealmId {
        builtins::create_realm(self)
    }

    /// Create a realm nested in `parent` (a frame), wiring `parent` and `top`
    pub fn create_child_realm(&self, parent: RealmId) -> HostResult<RealmId> {
        let parent_global = self.realm(parent)?.global();
        let top = match self.get_own_property(parent_global, &"top".into()) {
            Some(PropertyDescriptor::Data {
                value: Value::Object(top),
                ..
            }) => top,
            _ => parent_global,
        };

        let child = builtins::create_realm(self);
        let child_global = self.realm(child)?.global();
        self.define_own_property(
            child_global,
            &"parent".into(),
            PropertyDescriptor::data(Value::Object(parent_global)),
        )?;
        self.define_own_property(
            child_global,
            &"top".into(),
            PropertyDescriptor::data(Value::Object(top)),
        )?;
        Ok(child)
    }

    pub(crate) fn next_realm_id(&self) -> RealmId {
        RealmId(self.realms.borrow().len() as u32)
    }

    pub(crate) fn register_realm(&self, realm: Realm) {
        self.realms.borrow_mut().push(Rc::new(realm));
    }

    fn intrinsic(&self, realm: RealmId, name: &str) -> Option<ObjectId> {
        self.realms
            .borrow()
            .get(realm.0 as usize)
            .and_then(|r| r.intrinsic(name))
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate an object from raw data
    pub fn allocate(&self, data: ObjectData) -> ObjectId {
        self.heap.allocate(data)
    }

    /// Allocate an ordinary object with the given class tag and prototype
    pub fn alloc_object(&self, realm: RealmId, class_name: &str, prototype: Option<ObjectId>) -> ObjectId {
        self.heap
            .allocate(ObjectData::new(realm, class_name, prototype))
    }

    /// Allocate `{}` in a realm
    pub fn create_plain_object(&self, realm: RealmId) -> ObjectId {
        let proto = self.intrinsic(realm, "Object.prototype");
        self.alloc_object(realm, "Object", proto)
    }

    /// Allocate an array holding `values`
    pub fn create_array(&self, realm: RealmId, values: &[Value]) -> ObjectId {
        let proto = self.intrinsic(realm, "Array.prototype");
        let array = self.alloc_object(realm, "Array", proto);
        self.heap.with_mut(array, |obj| {
            for (i, value) in values.iter().enumerate() {
                obj.put_property(i.into(), PropertyDescriptor::data(value.clone()));
            }
            obj.put_property(
                "length".into(),
                PropertyDescriptor::Data {
                    value: Value::Number(values.len() as f64),
                    writable: true,
                    enumerable: false,
                    configurable: false,
                },
            );
        });
        array
    }

    /// Read the elements of an array-like object
    ///
    /// Lengths past `u32::MAX` are refused the way argument spreading
    /// refuses them, instead of reading that many elements.
    pub fn array_elements(&self, array: ObjectId) -> HostResult<Vec<Value>> {
        let len = match self.get(array, &"length".into())? {
            Value::Number(n) if n > f64::from(u32::MAX) => {
                return Err(HostError::RangeError("Invalid array length".to_string()));
            }
            Value::Number(n) if n >= 0.0 => n as usize,
            _ => 0,
        };
        (0..len).map(|i| self.get(array, &i.into())).collect()
    }

    pub(crate) fn alloc_function(
        &self,
        realm: RealmId,
        prototype: Option<ObjectId>,
        name: &str,
        body: FunctionBody,
    ) -> ObjectId {
        let mut data = ObjectData::new(realm, "Function", prototype);
        data.kind = ObjectKind::Function(FunctionData {
            name: Rc::from(name),
            body,
        });
        data.put_property(
            "name".into(),
            PropertyDescriptor::Data {
                value: Value::string(name),
                writable: false,
                enumerable: false,
                configurable: true,
            },
        );
        self.heap.allocate(data)
    }

    /// Create an opaque native function
    pub fn create_native_function(
        &self,
        realm: RealmId,
        name: &str,
        call: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) -> ObjectId {
        let proto = self.intrinsic(realm, "Function.prototype");
        self.alloc_function(
            realm,
            proto,
            name,
            FunctionBody::Native {
                call: Rc::new(call),
                construct: None,
            },
        )
    }

    /// Create a script-authored function with inspectable source text
    ///
    /// Script functions are constructible; `new f()` allocates an object whose
    /// prototype is `f.prototype` and runs `call` with it as `this`.
    pub fn create_script_function(
        &self,
        realm: RealmId,
        name: &str,
        source: &str,
        call: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) -> ObjectId {
        let fn_proto = self.intrinsic(realm, "Function.prototype");
        let func = self.alloc_function(
            realm,
            fn_proto,
            name,
            FunctionBody::Script {
                source: Rc::from(source),
                call: Rc::new(call),
                constructible: true,
            },
        );
        let instance_proto = self.create_plain_object(realm);
        self.heap.with_mut(instance_proto, |obj| {
            obj.put_property("constructor".into(), PropertyDescriptor::builtin(Value::Object(func)));
        });
        self.heap.with_mut(func, |obj| {
            obj.put_property(
                "prototype".into(),
                PropertyDescriptor::Data {
                    value: Value::Object(instance_proto),
                    writable: true,
                    enumerable: false,
                    configurable: false,
                },
            );
        });
        func
    }

    /// Create a script-authored method: inspectable source, no `prototype`,
    /// not constructible (accessor halves and object-literal methods)
    pub fn create_script_method(
        &self,
        realm: RealmId,
        name: &str,
        source: &str,
        call: impl Fn(&Host, Value, &[Value]) -> HostResult<Value> + 'static,
    ) -> ObjectId {
        let fn_proto = self.intrinsic(realm, "Function.prototype");
        self.alloc_function(
            realm,
            fn_proto,
            name,
            FunctionBody::Script {
                source: Rc::from(source),
                call: Rc::new(call),
                constructible: false,
            },
        )
    }

    /// `Function.prototype.bind`
    pub fn bind_function(&self, target: ObjectId, this: Value, args: Vec<Value>) -> HostResult<ObjectId> {
        if !self.is_callable(&Value::Object(target)) {
            return Err(HostError::type_error("Bind must be called on a function"));
        }
        let realm = self.data(target, |obj| obj.realm)?;
        let name = self
            .function_name(target)
            .map(|name| name.to_string())
            .unwrap_or_default();
        let proto = self.intrinsic(realm, "Function.prototype");
        Ok(self.alloc_function(
            realm,
            proto,
            &format!("bound {}", name),
            FunctionBody::Bound { target, this, args },
        ))
    }

    /// Create a proxy around `target`
    ///
    /// The proxy lives in the target's realm and is callable/constructible
    /// exactly when the target is.
    pub fn create_proxy(&self, target: ObjectId, handler: Rc<dyn ProxyHandler>) -> HostResult<ObjectId> {
        let (realm, class_name) = self.data(target, |obj| (obj.realm, obj.class_name.clone()))?;
        let mut data = ObjectData::new(realm, &class_name, None);
        data.kind = ObjectKind::Proxy(ProxyData { target, handler });
        Ok(self.heap.allocate(data))
    }

    /// Release an object from the heap
    pub fn release(&self, id: ObjectId) -> bool {
        self.listeners.clear_target(id);
        self.heap.release(id)
    }

    /// Check whether a handle refers to a live object
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.heap.is_live(id)
    }

    /// Heap statistics
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    // ========================================================================
    // Introspection (transparent through proxies)
    // ========================================================================

    fn data<R>(&self, id: ObjectId, f: impl FnOnce(&ObjectData) -> R) -> HostResult<R> {
        self.heap.with(id, f).ok_or(HostError::StaleHandle(id))
    }

    /// Follow proxies down to the innermost target
    fn resolve(&self, id: ObjectId) -> ObjectId {
        let mut current = id;
        while let Some(target) = self.proxy_target(current) {
            current = target;
        }
        current
    }

    /// Realm an object belongs to
    pub fn realm_of(&self, id: ObjectId) -> Option<RealmId> {
        self.heap.with(id, |obj| obj.realm)
    }

    /// Check if an object is a proxy
    pub fn is_proxy(&self, id: ObjectId) -> bool {
        self.heap
            .with(id, |obj| matches!(obj.kind, ObjectKind::Proxy(_)))
            .unwrap_or(false)
    }

    /// The direct target of a proxy
    pub fn proxy_target(&self, id: ObjectId) -> Option<ObjectId> {
        self.heap
            .with(id, |obj| match &obj.kind {
                ObjectKind::Proxy(p) => Some(p.target),
                _ => None,
            })
            .flatten()
    }

    /// Check if a value can be called
    pub fn is_callable(&self, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        let id = self.resolve(*id);
        self.heap.with(id, ObjectData::is_function).unwrap_or(false)
    }

    /// Check if a value can be used with `new`
    pub fn is_constructor(&self, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        let id = self.resolve(*id);
        self.heap
            .with(id, |obj| match &obj.kind {
                ObjectKind::Function(f) => match &f.body {
                    FunctionBody::Native { construct, .. } => construct.is_some(),
                    FunctionBody::Script { constructible, .. } => *constructible,
                    FunctionBody::Bound { .. } => true,
                },
                _ => false,
            })
            .unwrap_or(false)
    }

    /// Internal name of a function
    pub fn function_name(&self, id: ObjectId) -> Option<Rc<str>> {
        let id = self.resolve(id);
        self.heap
            .with(id, |obj| match &obj.kind {
                ObjectKind::Function(f) => Some(f.name.clone()),
                _ => None,
            })
            .flatten()
    }

    /// `Function.prototype.toString`
    ///
    /// Natives, bound functions and proxies of callables all render with the
    /// `[native code]` body; only script functions expose their source.
    pub fn function_source(&self, id: ObjectId) -> HostResult<String> {
        let rendered = self.data(id, |obj| match &obj.kind {
            ObjectKind::Function(f) => match &f.body {
                FunctionBody::Native { .. } => Some(format!(
                    "function {}() {{\n    [native code]\n}}",
                    f.name
                )),
                FunctionBody::Bound { .. } => Some("function () { [native code] }".to_string()),
                FunctionBody::Script { source, .. } => Some(source.to_string()),
            },
            ObjectKind::Proxy(_) => None,
            ObjectKind::Ordinary => None,
        })?;
        match rendered {
            Some(source) => Ok(source),
            None if self.is_proxy(id) && self.is_callable(&Value::Object(id)) => {
                Ok("function () { [native code] }".to_string())
            }
            None => Err(HostError::type_error(
                "Function.prototype.toString requires that 'this' be a Function",
            )),
        }
    }

    /// Class tag as reported by `Object.prototype.toString`
    pub fn class_of(&self, value: &Value) -> String {
        match value {
            Value::Undefined => "Undefined".to_string(),
            Value::Null => "Null".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Number(_) => "Number".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Symbol(_) => "Symbol".to_string(),
            Value::Object(id) => {
                let id = self.resolve(*id);
                self.heap
                    .with(id, |obj| obj.class_name.to_string())
                    .unwrap_or_else(|| "Object".to_string())
            }
        }
    }

    /// The `typeof` operator
    pub fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Object(_) if self.is_callable(value) => "function",
            Value::Object(_) => "object",
        }
    }

    /// Prototype of an object
    pub fn prototype_of(&self, id: ObjectId) -> Option<ObjectId> {
        let id = self.resolve(id);
        self.heap.with(id, |obj| obj.prototype).flatten()
    }

    /// Replace an object's prototype
    pub fn set_prototype_of(&self, id: ObjectId, prototype: Option<ObjectId>) -> HostResult<()> {
        let id = self.resolve(id);
        self.heap
            .with_mut(id, |obj| obj.prototype = prototype)
            .ok_or(HostError::StaleHandle(id))
    }

    /// Own property descriptor
    pub fn get_own_property(&self, id: ObjectId, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let id = self.resolve(id);
        self.heap
            .with(id, |obj| obj.own_property(key).cloned())
            .flatten()
    }

    /// Define (or redefine) an own property
    ///
    /// Fails when the existing property is non-configurable and the new
    /// descriptor is not a permitted change.
    pub fn define_own_property(&self, id: ObjectId, key: &PropertyKey, desc: PropertyDescriptor) -> HostResult<()> {
        let id = self.resolve(id);
        self.heap
            .with_mut(id, |obj| {
                if let Some(existing) = obj.own_property(key) {
                    if !existing.configurable() && !is_permitted_redefinition(existing, &desc) {
                        return Err(HostError::type_error(format!(
                            "Cannot redefine property: {}",
                            key
                        )));
                    }
                }
                obj.put_property(key.clone(), desc);
                Ok(())
            })
            .ok_or(HostError::StaleHandle(id))?
    }

    /// Delete an own property; non-configurable properties are kept
    pub fn delete_property(&self, id: ObjectId, key: &PropertyKey) -> HostResult<bool> {
        let id = self.resolve(id);
        self.heap
            .with_mut(id, |obj| match obj.own_property(key) {
                None => true,
                Some(desc) if !desc.configurable() => false,
                Some(_) => {
                    obj.remove_property(key);
                    true
                }
            })
            .ok_or(HostError::StaleHandle(id))
    }

    /// Write a property without any redefinition checks (realm setup)
    pub(crate) fn put_property(&self, id: ObjectId, key: PropertyKey, desc: PropertyDescriptor) {
        self.heap.with_mut(id, |obj| obj.put_property(key, desc));
    }

    /// Own keys in insertion order
    pub fn own_keys(&self, id: ObjectId) -> Vec<PropertyKey> {
        let id = self.resolve(id);
        self.heap
            .with(id, |obj| obj.properties.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    /// Keys visited by `for (key in obj)`: enumerable string keys along the
    /// prototype chain, shadowed keys reported once
    pub fn enumerable_keys(&self, id: ObjectId) -> Vec<PropertyKey> {
        let mut seen = FxHashSet::default();
        let mut keys = Vec::new();
        let mut current = Some(id);
        while let Some(obj) = current {
            let obj = self.resolve(obj);
            let level = self
                .heap
                .with(obj, |data| {
                    data.properties
                        .iter()
                        .map(|(k, d)| (k.clone(), d.enumerable()))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            for (key, enumerable) in level {
                if matches!(key, PropertyKey::Symbol(_)) {
                    continue;
                }
                if seen.insert(key.clone()) && enumerable {
                    keys.push(key);
                }
            }
            current = self.heap.with(obj, |data| data.prototype).flatten();
        }
        keys
    }

    /// `key in obj` (no traps involved)
    pub fn has_property(&self, id: ObjectId, key: &PropertyKey) -> bool {
        let mut current = Some(id);
        while let Some(obj) = current {
            if self.get_own_property(obj, key).is_some() {
                return true;
            }
            current = self.prototype_of(obj);
        }
        false
    }

    // ========================================================================
    // Internal slots
    // ========================================================================

    /// Read an internal slot
    pub fn slot(&self, id: ObjectId, name: &'static str) -> Option<Value> {
        self.heap.with(id, |obj| obj.slots.get(name).cloned()).flatten()
    }

    /// Write an internal slot
    pub fn set_slot(&self, id: ObjectId, name: &'static str, value: Value) -> HostResult<()> {
        self.heap
            .with_mut(id, |obj| {
                obj.slots.insert(name, value);
            })
            .ok_or(HostError::StaleHandle(id))
    }

    // ========================================================================
    // Object operations
    // ========================================================================

    fn lookup(&self, id: ObjectId, key: &PropertyKey) -> HostResult<Lookup> {
        self.data(id, |obj| match &obj.kind {
            ObjectKind::Proxy(p) => Lookup::Proxy(p.target, Rc::clone(&p.handler)),
            _ => match obj.own_property(key) {
                Some(desc) => Lookup::Found(desc.clone()),
                None => Lookup::Next(obj.prototype),
            },
        })
    }

    /// `obj[key]`
    pub fn get(&self, id: ObjectId, key: &PropertyKey) -> HostResult<Value> {
        self.get_with_receiver(id, key, Value::Object(id))
    }

    /// `obj[key]` with an explicit receiver for getters
    pub fn get_with_receiver(&self, id: ObjectId, key: &PropertyKey, receiver: Value) -> HostResult<Value> {
        let mut current = id;
        loop {
            match self.lookup(current, key)? {
                Lookup::Proxy(target, handler) => {
                    return handler.get(self, target, key, receiver);
                }
                Lookup::Found(PropertyDescriptor::Data { value, .. }) => return Ok(value),
                Lookup::Found(PropertyDescriptor::Accessor { get, .. }) => {
                    return match get {
                        Some(getter) => self.call(&Value::Object(getter), receiver, &[]),
                        None => Ok(Value::Undefined),
                    };
                }
                Lookup::Next(Some(proto)) => current = proto,
                Lookup::Next(None) => return Ok(Value::Undefined),
            }
        }
    }

    /// `obj[key] = value`; returns false when the assignment was refused
    pub fn set(&self, id: ObjectId, key: &PropertyKey, value: Value) -> HostResult<bool> {
        self.set_with_receiver(id, key, value, Value::Object(id))
    }

    /// `obj[key] = value` with an explicit receiver for setters
    pub fn set_with_receiver(
        &self,
        id: ObjectId,
        key: &PropertyKey,
        value: Value,
        receiver: Value,
    ) -> HostResult<bool> {
        let mut current = id;
        loop {
            match self.lookup(current, key)? {
                Lookup::Proxy(target, handler) => {
                    return handler.set(self, target, key, value, receiver);
                }
                Lookup::Found(PropertyDescriptor::Accessor { set, .. }) => {
                    return match set {
                        Some(setter) => {
                            self.call(&Value::Object(setter), receiver, &[value])?;
                            Ok(true)
                        }
                        None => Ok(false),
                    };
                }
                Lookup::Found(PropertyDescriptor::Data { writable: false, .. }) => return Ok(false),
                Lookup::Found(PropertyDescriptor::Data { .. }) | Lookup::Next(None) => break,
                Lookup::Next(Some(proto)) => current = proto,
            }
        }

        let Value::Object(target) = receiver else {
            return Ok(false);
        };
        match self.get_own_property(target, key) {
            Some(PropertyDescriptor::Data {
                writable: true,
                enumerable,
                configurable,
                ..
            }) => {
                self.define_own_property(
                    target,
                    key,
                    PropertyDescriptor::Data {
                        value,
                        writable: true,
                        enumerable,
                        configurable,
                    },
                )?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                self.define_own_property(target, key, PropertyDescriptor::data(value))?;
                Ok(true)
            }
        }
    }

    fn invocation(&self, id: ObjectId) -> HostResult<Invocation> {
        self.data(id, |obj| match &obj.kind {
            ObjectKind::Proxy(p) => Invocation::Proxy(p.target, Rc::clone(&p.handler)),
            ObjectKind::Function(f) => match &f.body {
                FunctionBody::Native { call, construct } => {
                    Invocation::Native(Rc::clone(call), construct.clone())
                }
                FunctionBody::Script {
                    call, constructible, ..
                } => Invocation::Script(Rc::clone(call), *constructible),
                FunctionBody::Bound { target, this, args } => {
                    Invocation::Bound(*target, this.clone(), args.clone())
                }
            },
            ObjectKind::Ordinary => Invocation::NotCallable,
        })
    }

    /// `callee.call(this, ...args)`
    pub fn call(&self, callee: &Value, this: Value, args: &[Value]) -> HostResult<Value> {
        let Value::Object(id) = callee else {
            return Err(HostError::type_error(format!(
                "{} is not a function",
                self.to_display_string(callee)
            )));
        };
        match self.invocation(*id)? {
            Invocation::Proxy(target, handler) => {
                if !self.is_callable(&Value::Object(target)) {
                    return Err(HostError::type_error("proxy target is not a function"));
                }
                handler.apply(self, target, this, args)
            }
            Invocation::Native(call, _) | Invocation::Script(call, _) => call(self, this, args),
            Invocation::Bound(target, bound_this, mut bound_args) => {
                bound_args.extend_from_slice(args);
                self.call(&Value::Object(target), bound_this, &bound_args)
            }
            Invocation::NotCallable => Err(HostError::type_error(format!(
                "{} is not a function",
                self.to_display_string(callee)
            ))),
        }
    }

    /// `new callee(...args)`
    pub fn construct(&self, callee: &Value, args: &[Value]) -> HostResult<Value> {
        let not_a_constructor = || {
            HostError::type_error(format!(
                "{} is not a constructor",
                self.to_display_string(callee)
            ))
        };
        let Value::Object(id) = callee else {
            return Err(not_a_constructor());
        };
        match self.invocation(*id)? {
            Invocation::Proxy(target, handler) => {
                if !self.is_constructor(&Value::Object(target)) {
                    return Err(not_a_constructor());
                }
                handler.construct(self, target, args)
            }
            Invocation::Native(_, Some(construct)) => construct(self, args),
            Invocation::Script(call, true) => {
                let realm = self.realm_of(*id).unwrap_or(RealmId::MAIN);
                let proto = match self.get(*id, &"prototype".into())? {
                    Value::Object(proto) => Some(proto),
                    _ => self.intrinsic(realm, "Object.prototype"),
                };
                let instance = self.alloc_object(realm, "Object", proto);
                match call(self, Value::Object(instance), args)? {
                    result @ Value::Object(_) => Ok(result),
                    _ => Ok(Value::Object(instance)),
                }
            }
            Invocation::Bound(target, _, mut bound_args) => {
                bound_args.extend_from_slice(args);
                self.construct(&Value::Object(target), &bound_args)
            }
            Invocation::Native(_, None) | Invocation::Script(_, false) | Invocation::NotCallable => {
                Err(not_a_constructor())
            }
        }
    }

    /// `receiver.name(...args)`
    pub fn invoke(&self, receiver: &Value, name: &str, args: &[Value]) -> HostResult<Value> {
        let Value::Object(id) = receiver else {
            return Err(HostError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                self.to_display_string(receiver),
                name
            )));
        };
        let method = self.get(*id, &name.into())?;
        self.call(&method, receiver.clone(), args)
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// `String(value)`
    pub fn to_display_string(&self, value: &Value) -> String {
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Symbol(sym) => sym.to_string(),
            Value::Object(_) => format!("[object {}]", self.class_of(value)),
        }
    }

    /// `ToPropertyKey(value)`
    pub fn to_property_key(&self, value: &Value) -> PropertyKey {
        match value {
            Value::Symbol(sym) => PropertyKey::Symbol(sym.clone()),
            Value::String(s) => PropertyKey::String(s.clone()),
            other => PropertyKey::from(self.to_display_string(other)),
        }
    }

    // ========================================================================
    // Listeners and console
    // ========================================================================

    /// Host-side listener storage
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Number of listeners registered on a target
    pub fn listener_count(&self, target: ObjectId) -> usize {
        self.listeners.count(target)
    }

    /// Lines written through `console.log` / `console.warn`
    pub fn console_output(&self) -> Vec<String> {
        self.console.borrow().clone()
    }

    pub(crate) fn console_write(&self, line: String) {
        self.console.borrow_mut().push(line);
    }

    // ========================================================================
    // Receiver checks used by natives
    // ========================================================================

    /// The raw object a native was invoked on; proxies are rejected
    pub(crate) fn this_object(&self, this: &Value) -> HostResult<ObjectId> {
        match this {
            Value::Object(id) if !self.is_proxy(*id) => Ok(*id),
            _ => Err(HostError::illegal_invocation()),
        }
    }

    /// Like [`Host::this_object`], also requiring an internal slot (a brand)
    pub(crate) fn this_branded(&self, this: &Value, brand: &'static str) -> HostResult<ObjectId> {
        let id = self.this_object(this)?;
        if self.slot(id, brand).is_none() {
            return Err(HostError::illegal_invocation());
        }
        Ok(id)
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes allowed on a non-configurable property
fn is_permitted_redefinition(existing: &PropertyDescriptor, new: &PropertyDescriptor) -> bool {
    if new.configurable() || new.enumerable() != existing.enumerable() {
        return false;
    }
    match (existing, new) {
        (
            PropertyDescriptor::Data {
                writable: true, ..
            },
            PropertyDescriptor::Data { .. },
        ) => true,
        (
            PropertyDescriptor::Data {
                value: old,
                writable: false,
                ..
            },
            PropertyDescriptor::Data {
                value,
                writable: false,
                ..
            },
        ) => old.same_value(value),
        (
            PropertyDescriptor::Accessor { get, set, .. },
            PropertyDescriptor::Accessor {
                get: new_get,
                set: new_set,
                ..
            },
        ) => get == new_get && set == new_set,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_walks_prototype_chain() {
        let host = Host::new();
        let realm = host.main_realm();
        let parent = host.create_plain_object(realm);
        host.set(parent, &"inherited".into(), Value::Number(7.0)).unwrap();
        let child = host.alloc_object(realm, "Object", Some(parent));

        assert_eq!(host.get(child, &"inherited".into()).unwrap(), Value::Number(7.0));
        assert_eq!(host.get(child, &"missing".into()).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_set_creates_own_property_on_receiver() {
        let host = Host::new();
        let realm = host.main_realm();
        let parent = host.create_plain_object(realm);
        host.set(parent, &"x".into(), Value::Number(1.0)).unwrap();
        let child = host.alloc_object(realm, "Object", Some(parent));

        assert!(host.set(child, &"x".into(), Value::Number(2.0)).unwrap());
        assert_eq!(host.get(parent, &"x".into()).unwrap(), Value::Number(1.0));
        assert_eq!(host.get(child, &"x".into()).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_set_refuses_readonly() {
        let host = Host::new();
        let realm = host.main_realm();
        let obj = host.create_plain_object(realm);
        host.define_own_property(obj, &"k".into(), PropertyDescriptor::frozen(Value::Number(1.0)))
            .unwrap();

        assert!(!host.set(obj, &"k".into(), Value::Number(2.0)).unwrap());
        assert_eq!(host.get(obj, &"k".into()).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_array_elements_reads_array_likes() {
        let host = Host::new();
        let realm = host.main_realm();
        let like = host.create_plain_object(realm);
        host.set(like, &"length".into(), Value::Number(2.0)).unwrap();
        host.set(like, &0usize.into(), Value::string("a")).unwrap();

        assert_eq!(
            host.array_elements(like).unwrap(),
            vec![Value::string("a"), Value::Undefined]
        );
    }

    #[test]
    fn test_array_elements_refuses_huge_length() {
        let host = Host::new();
        let realm = host.main_realm();
        let like = host.create_plain_object(realm);
        host.set(like, &"length".into(), Value::Number(1e15)).unwrap();

        let err = host.array_elements(like).unwrap_err();
        assert!(matches!(err, HostError::RangeError(_)));
    }

    #[test]
    fn test_redefine_non_configurable_fails() {
        let host = Host::new();
        let realm = host.main_realm();
        let obj = host.create_plain_object(realm);
        host.define_own_property(obj, &"k".into(), PropertyDescriptor::frozen(Value::Null))
            .unwrap();

        let err = host
            .define_own_property(obj, &"k".into(), PropertyDescriptor::data(Value::Null))
            .unwrap_err();
        assert!(matches!(err, HostError::TypeError(_)));
    }

    #[test]
    fn test_accessor_receives_receiver() {
        let host = Host::new();
        let realm = host.main_realm();
        let getter = host.create_native_function(realm, "get tag", |host, this, _| {
            let id = this.as_object().ok_or_else(HostError::illegal_invocation)?;
            Ok(host.slot(id, "tag").unwrap_or_default())
        });
        let proto = host.create_plain_object(realm);
        host.define_own_property(proto, &"tag".into(), PropertyDescriptor::accessor(Some(getter), None))
            .unwrap();
        let obj = host.alloc_object(realm, "Object", Some(proto));
        host.set_slot(obj, "tag", Value::string("mine")).unwrap();

        assert_eq!(host.get(obj, &"tag".into()).unwrap(), Value::string("mine"));
        // no setter: assignment is refused, nothing is shadowed
        assert!(!host.set(obj, &"tag".into(), Value::Null).unwrap());
        assert!(host.get_own_property(obj, &"tag".into()).is_none());
    }

    #[test]
    fn test_bound_function_prepends_args() {
        let host = Host::new();
        let realm = host.main_realm();
        let f = host.create_native_function(realm, "count", |_, this, args| {
            Ok(Value::Number(args.len() as f64 + if this.is_object() { 100.0 } else { 0.0 }))
        });
        let receiver = host.create_plain_object(realm);
        let bound = host
            .bind_function(f, Value::Object(receiver), vec![Value::Null])
            .unwrap();

        let result = host.call(&Value::Object(bound), Value::Undefined, &[Value::Null]).unwrap();
        assert_eq!(result, Value::Number(102.0));
        assert_eq!(host.function_name(bound).as_deref(), Some("bound count"));
    }

    #[test]
    fn test_function_source_rendering() {
        let host = Host::new();
        let realm = host.main_realm();
        let native = host.create_native_function(realm, "n", |_, _, _| Ok(Value::Undefined));
        let script = host.create_script_function(realm, "s", "function s() { return 1; }", |_, _, _| {
            Ok(Value::Number(1.0))
        });
        let bound = host.bind_function(script, Value::Undefined, vec![]).unwrap();

        assert!(host.function_source(native).unwrap().contains("[native code]"));
        assert_eq!(host.function_source(script).unwrap(), "function s() { return 1; }");
        assert!(host.function_source(bound).unwrap().contains("[native code]"));
        let plain = host.create_plain_object(realm);
        assert!(host.function_source(plain).is_err());
    }

    #[test]
    fn test_script_method_is_not_constructible() {
        let host = Host::new();
        let realm = host.main_realm();
        let method = host.create_script_method(realm, "get x", "get x() { return 1; }", |_, _, _| {
            Ok(Value::Number(1.0))
        });

        assert!(host.is_callable(&Value::Object(method)));
        assert!(!host.is_constructor(&Value::Object(method)));
        assert!(host.get_own_property(method, &"prototype".into()).is_none());
        assert!(host.construct(&Value::Object(method), &[]).is_err());
    }

    #[test]
    fn test_script_constructor_uses_prototype() {
        let host = Host::new();
        let realm = host.main_realm();
        let ctor = host.create_script_function(realm, "Point", "function Point() {}", |host, this, _| {
            if let Value::Object(id) = this {
                host.set(id, &"x".into(), Value::Number(1.0))?;
            }
            Ok(Value::Undefined)
        });
        let instance = host.construct(&Value::Object(ctor), &[]).unwrap();
        let id = instance.as_object().unwrap();

        assert_eq!(host.get(id, &"x".into()).unwrap(), Value::Number(1.0));
        let proto = host.get(ctor, &"prototype".into()).unwrap();
        assert_eq!(host.prototype_of(id).map(Value::Object), Some(proto));
    }

    #[test]
    fn test_enumerable_keys_skip_shadowed_and_hidden() {
        let host = Host::new();
        let realm = host.main_realm();
        let proto = host.create_plain_object(realm);
        host.set(proto, &"a".into(), Value::Null).unwrap();
        host.set(proto, &"b".into(), Value::Null).unwrap();
        let obj = host.alloc_object(realm, "Object", Some(proto));
        host.define_own_property(obj, &"a".into(), PropertyDescriptor::builtin(Value::Null))
            .unwrap();
        host.set(obj, &"c".into(), Value::Null).unwrap();

        let keys: Vec<String> = host.enumerable_keys(obj).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["c", "b"]);
    }

    #[test]
    fn test_type_and_class() {
        let host = Host::new();
        let realm = host.main_realm();
        let f = host.create_native_function(realm, "f", |_, _, _| Ok(Value::Undefined));
        assert_eq!(host.type_of(&Value::Object(f)), "function");
        assert_eq!(host.type_of(&Value::Null), "object");
        assert_eq!(host.class_of(&Value::Object(f)), "Function");
        assert_eq!(host.class_of(&Value::string("x")), "String");
        assert_eq!(host.to_display_string(&Value::Object(f)), "[object Function]");
    }

    #[test]
    fn test_release_makes_operations_fail() {
        let host = Host::new();
        let realm = host.main_realm();
        let obj = host.create_plain_object(realm);
        assert!(host.release(obj));
        assert!(matches!(
            host.get(obj, &"x".into()),
            Err(HostError::StaleHandle(_))
        ));
    }
}
