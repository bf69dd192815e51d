//! Proxy Object Support
//!
//! A proxy is a heap object that forwards every operation to a target
//! object through a [`ProxyHandler`]. The host consults the handler for the
//! four interceptable operations:
//! - `get(target, key, receiver)` - property read
//! - `set(target, key, value, receiver)` - property write
//! - `apply(target, this, args)` - function call
//! - `construct(target, args)` - `new`
//!
//! Every other operation (descriptor lookup, prototype walk, key listing,
//! class tag) sees straight through the proxy to its target, which is what
//! keeps a proxy indistinguishable from the object it wraps.
//!
//! Each trap has a default that forwards to the target unchanged, so a
//! handler only overrides the operations it cares about.

use crate::error::HostResult;
use crate::host::Host;
use crate::object::ObjectId;
use crate::value::{PropertyKey, Value};

/// Trap handler for proxy objects
pub trait ProxyHandler {
    /// Intercept a property read
    fn get(
        &self,
        host: &Host,
        target: ObjectId,
        key: &PropertyKey,
        receiver: Value,
    ) -> HostResult<Value> {
        host.get_with_receiver(target, key, receiver)
    }

    /// Intercept a property write
    fn set(
        &self,
        host: &Host,
        target: ObjectId,
        key: &PropertyKey,
        value: Value,
        receiver: Value,
    ) -> HostResult<bool> {
        let _ = receiver;
        host.set(target, key, value)
    }

    /// Intercept a function call
    fn apply(&self, host: &Host, target: ObjectId, this: Value, args: &[Value]) -> HostResult<Value> {
        host.call(&Value::Object(target), this, args)
    }

    /// Intercept a constructor call
    fn construct(&self, host: &Host, target: ObjectId, args: &[Value]) -> HostResult<Value> {
        host.construct(&Value::Object(target), args)
    }
}

/// Handler that forwards everything to the target
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardingHandler;

impl ProxyHandler for ForwardingHandler {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PropertyDescriptor;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingHandler {
        seen: RefCell<Vec<String>>,
    }

    impl ProxyHandler for RecordingHandler {
        fn get(
            &self,
            host: &Host,
            target: ObjectId,
            key: &PropertyKey,
            _receiver: Value,
        ) -> HostResult<Value> {
            self.seen.borrow_mut().push(format!("get {}", key));
            host.get(target, key)
        }

        fn set(
            &self,
            host: &Host,
            target: ObjectId,
            key: &PropertyKey,
            value: Value,
            _receiver: Value,
        ) -> HostResult<bool> {
            self.seen.borrow_mut().push(format!("set {}", key));
            host.set(target, key, value)
        }
    }

    #[test]
    fn test_forwarding_handler_is_transparent() {
        let host = Host::new();
        let realm = host.main_realm();
        let target = host.create_plain_object(realm);
        host.set(target, &"x".into(), Value::Number(1.0)).unwrap();

        let proxy = host.create_proxy(target, Rc::new(ForwardingHandler)).unwrap();
        assert_eq!(host.get(proxy, &"x".into()).unwrap(), Value::Number(1.0));

        host.set(proxy, &"y".into(), Value::Bool(true)).unwrap();
        assert_eq!(
            host.get_own_property(target, &"y".into()),
            Some(PropertyDescriptor::data(Value::Bool(true)))
        );
    }

    #[test]
    fn test_recording_handler_sees_get_and_set() {
        let host = Host::new();
        let realm = host.main_realm();
        let target = host.create_plain_object(realm);
        let handler = Rc::new(RecordingHandler::default());
        let proxy = host.create_proxy(target, handler.clone()).unwrap();

        host.set(proxy, &"a".into(), Value::Number(2.0)).unwrap();
        host.get(proxy, &"a".into()).unwrap();

        assert_eq!(*handler.seen.borrow(), vec!["set a", "get a"]);
    }

    #[test]
    fn test_proxy_introspection_sees_target() {
        let host = Host::new();
        let realm = host.main_realm();
        let target = host.create_plain_object(realm);
        let proxy = host.create_proxy(target, Rc::new(ForwardingHandler)).unwrap();

        assert!(host.is_proxy(proxy));
        assert_eq!(host.proxy_target(proxy), Some(target));
        assert_eq!(host.prototype_of(proxy), host.prototype_of(target));
        assert_eq!(host.class_of(&Value::Object(proxy)), "Object");
    }
}
