//! Object model: handles, property descriptors and object payloads

use crate::error::HostResult;
use crate::host::Host;
use crate::proxy::ProxyHandler;
use crate::realm::RealmId;
use crate::value::{PropertyKey, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Handle to a heap object
///
/// The generation distinguishes a live object from a later object that
/// reuses the same slot after the first one was released.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    /// Slot index in the heap
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Native function body: `(host, this, args) -> result`
pub type NativeFn = Rc<dyn Fn(&Host, Value, &[Value]) -> HostResult<Value>>;

/// Native constructor body: `(host, args) -> new object`
pub type ConstructFn = Rc<dyn Fn(&Host, &[Value]) -> HostResult<Value>>;

/// Property descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDescriptor {
    /// Data property
    Data {
        /// Stored value
        value: Value,
        /// Whether assignment may change the value
        writable: bool,
        /// Whether for-in enumeration sees the key
        enumerable: bool,
        /// Whether the property may be redefined
        configurable: bool,
    },
    /// Accessor property
    Accessor {
        /// Getter function
        get: Option<ObjectId>,
        /// Setter function
        set: Option<ObjectId>,
        /// Whether for-in enumeration sees the key
        enumerable: bool,
        /// Whether the property may be redefined
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// Ordinary assignment-created property: writable, enumerable, configurable
    pub fn data(value: Value) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Built-in method slot: writable, configurable, not enumerable
    pub fn builtin(value: Value) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Read-only, non-configurable data property
    pub fn frozen(value: Value) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// Enumerable, configurable accessor
    pub fn accessor(get: Option<ObjectId>, set: Option<ObjectId>) -> Self {
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable: true,
            configurable: true,
        }
    }

    /// Getter function, for accessor properties
    pub fn getter(&self) -> Option<ObjectId> {
        match self {
            PropertyDescriptor::Accessor { get, .. } => *get,
            PropertyDescriptor::Data { .. } => None,
        }
    }

    /// Setter function, for accessor properties
    pub fn setter(&self) -> Option<ObjectId> {
        match self {
            PropertyDescriptor::Accessor { set, .. } => *set,
            PropertyDescriptor::Data { .. } => None,
        }
    }

    /// Stored value, for data properties
    pub fn value(&self) -> Option<&Value> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    /// Writability (accessors are never writable)
    pub fn is_writable(&self) -> bool {
        matches!(self, PropertyDescriptor::Data { writable: true, .. })
    }

    /// Check for an accessor property
    pub fn is_accessor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor { .. })
    }

    /// Configurability
    pub fn configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. }
            | PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    /// Enumerability
    pub fn enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. }
            | PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }
}

/// How a function object executes
#[derive(Clone)]
pub enum FunctionBody {
    /// Opaque host-implemented function
    Native {
        /// Call behaviour
        call: NativeFn,
        /// Construct behaviour (`None` = not a constructor)
        construct: Option<ConstructFn>,
    },
    /// Script-authored function; its source text is inspectable
    Script {
        /// Source text returned by `Function.prototype.toString`
        source: Rc<str>,
        /// Call behaviour
        call: NativeFn,
        /// Whether `new` is allowed
        constructible: bool,
    },
    /// Result of `Function.prototype.bind`
    Bound {
        /// Bound target function
        target: ObjectId,
        /// Bound receiver
        this: Value,
        /// Leading arguments
        args: Vec<Value>,
    },
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::Native { construct, .. } => f
                .debug_struct("Native")
                .field("constructible", &construct.is_some())
                .finish(),
            FunctionBody::Script { source, .. } => {
                f.debug_struct("Script").field("source", source).finish()
            }
            FunctionBody::Bound { target, this, args } => f
                .debug_struct("Bound")
                .field("target", target)
                .field("this", this)
                .field("args", args)
                .finish(),
        }
    }
}

/// Function payload
#[derive(Debug, Clone)]
pub struct FunctionData {
    /// Function name
    pub name: Rc<str>,
    /// Execution body
    pub body: FunctionBody,
}

/// Proxy payload
#[derive(Clone)]
pub struct ProxyData {
    /// The wrapped object
    pub target: ObjectId,
    /// Trap handler
    pub handler: Rc<dyn ProxyHandler>,
}

impl fmt::Debug for ProxyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyData")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Object kind
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Callable object
    Function(FunctionData),
    /// Proxy forwarding to a target through a handler
    Proxy(ProxyData),
}

/// Heap-allocated object payload
#[derive(Debug, Clone)]
pub struct ObjectData {
    /// Class tag reported by `Object.prototype.toString`
    pub class_name: Rc<str>,
    /// Prototype link
    pub prototype: Option<ObjectId>,
    /// Realm the object was created in
    pub realm: RealmId,
    /// Own properties in insertion order
    pub properties: Vec<(PropertyKey, PropertyDescriptor)>,
    /// Internal slots, invisible to property access
    pub slots: FxHashMap<&'static str, Value>,
    /// Object kind
    pub kind: ObjectKind,
}

impl ObjectData {
    /// Create an ordinary object
    pub fn new(realm: RealmId, class_name: &str, prototype: Option<ObjectId>) -> Self {
        Self {
            class_name: Rc::from(class_name),
            prototype,
            realm,
            properties: Vec::new(),
            slots: FxHashMap::default(),
            kind: ObjectKind::Ordinary,
        }
    }

    /// Look up an own property
    pub fn own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, desc)| desc)
    }

    /// Insert or replace an own property, keeping its original position
    pub fn put_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        if let Some(entry) = self.properties.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = desc;
        } else {
            self.properties.push((key, desc));
        }
    }

    /// Remove an own property
    pub fn remove_property(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let pos = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(pos).1)
    }

    /// Check if this object can be called
    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_property_keeps_order() {
        let mut obj = ObjectData::new(RealmId::MAIN, "Object", None);
        obj.put_property("a".into(), PropertyDescriptor::data(Value::Number(1.0)));
        obj.put_property("b".into(), PropertyDescriptor::data(Value::Number(2.0)));
        obj.put_property("a".into(), PropertyDescriptor::data(Value::Number(3.0)));

        let keys: Vec<String> = obj.properties.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            obj.own_property(&"a".into()).and_then(|d| d.value().cloned()),
            Some(Value::Number(3.0))
        );
    }

    #[test]
    fn test_descriptor_flags() {
        let frozen = PropertyDescriptor::frozen(Value::Null);
        assert!(!frozen.is_writable());
        assert!(!frozen.configurable());

        let acc = PropertyDescriptor::accessor(None, None);
        assert!(acc.is_accessor());
        assert!(!acc.is_writable());
        assert!(acc.configurable());
        assert!(acc.enumerable());
    }
}
