//! Object Model Tests
//!
//! Integration tests for the host object model:
//! - Realm isolation and parent/top wiring
//! - Proxy transparency (descriptors, prototypes, class tags, source text)
//! - Reentrant accessors calling back into the host
//! - Heap handle lifetime
//!
//! # Running Tests
//! ```bash
//! cargo test --test object_model_tests
//! ```

use nativetrace_host::{
    ForwardingHandler, Host, HostError, HostResult, ObjectId, PropertyDescriptor, PropertyKey,
    ProxyHandler, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

fn document_of(host: &Host) -> Value {
    Value::Object(host.realm(host.main_realm()).unwrap().document())
}

// ===== Realm Tests =====

#[test]
fn test_realms_have_distinct_intrinsics() {
    let host = Host::new();
    let other = host.create_realm();
    let main = host.realm(host.main_realm()).unwrap();
    let other = host.realm(other).unwrap();

    assert_ne!(main.global(), other.global());
    assert_ne!(main.intrinsic("Element.prototype"), other.intrinsic("Element.prototype"));
    assert_eq!(host.realm_of(other.document()), Some(other.id()));
}

#[test]
fn test_child_realm_parent_and_top() {
    let host = Host::new();
    let main = host.realm(host.main_realm()).unwrap();
    let child = host.create_child_realm(main.id()).unwrap();
    let grandchild = host.create_child_realm(child).unwrap();

    let child_global = host.realm(child).unwrap().global();
    let grandchild_global = host.realm(grandchild).unwrap().global();

    assert_eq!(
        host.get(grandchild_global, &"parent".into()).unwrap(),
        Value::Object(child_global)
    );
    assert_eq!(
        host.get(grandchild_global, &"top".into()).unwrap(),
        Value::Object(main.global())
    );
    assert_eq!(
        host.get(main.global(), &"top".into()).unwrap(),
        Value::Object(main.global())
    );
}

#[test]
fn test_unknown_realm() {
    let host = Host::new();
    let bogus = {
        let other = Host::new();
        other.create_realm();
        other.create_realm()
    };
    assert!(matches!(host.realm(bogus), Err(HostError::UnknownRealm(_))));
}

// ===== Proxy Transparency Tests =====

#[test]
fn test_proxy_of_function_is_callable_and_renders_native() {
    let host = Host::new();
    let realm = host.main_realm();
    let f = host.create_native_function(realm, "answer", |_, _, _| Ok(Value::Number(42.0)));
    let proxy = host.create_proxy(f, Rc::new(ForwardingHandler)).unwrap();

    assert_eq!(host.type_of(&Value::Object(proxy)), "function");
    assert_eq!(
        host.call(&Value::Object(proxy), Value::Undefined, &[]).unwrap(),
        Value::Number(42.0)
    );
    assert_eq!(
        host.function_source(proxy).unwrap(),
        "function () { [native code] }"
    );
    assert_eq!(host.function_name(proxy).as_deref(), Some("answer"));
}

#[test]
fn test_proxy_sees_target_descriptors() {
    let host = Host::new();
    let div = host
        .invoke(&document_of(&host), "createElement", &[Value::string("div")])
        .unwrap();
    let target = div.as_object().unwrap();
    let proxy = host.create_proxy(target, Rc::new(ForwardingHandler)).unwrap();

    host.set(proxy, &"custom".into(), Value::Number(1.0)).unwrap();
    assert_eq!(
        host.get_own_property(proxy, &"custom".into()),
        host.get_own_property(target, &"custom".into())
    );
    assert_eq!(host.class_of(&Value::Object(proxy)), "HTMLDivElement");
    assert_eq!(host.own_keys(proxy), host.own_keys(target));
}

#[test]
fn test_non_callable_proxy_is_not_a_function() {
    let host = Host::new();
    let target = host.create_plain_object(host.main_realm());
    let proxy = host.create_proxy(target, Rc::new(ForwardingHandler)).unwrap();

    assert!(host.call(&Value::Object(proxy), Value::Undefined, &[]).is_err());
    assert!(host.construct(&Value::Object(proxy), &[]).is_err());
}

struct CountingHandler {
    applies: RefCell<usize>,
}

impl ProxyHandler for CountingHandler {
    fn apply(&self, host: &Host, target: ObjectId, this: Value, args: &[Value]) -> HostResult<Value> {
        *self.applies.borrow_mut() += 1;
        host.call(&Value::Object(target), this, args)
    }
}

#[test]
fn test_function_call_through_prototype_reaches_apply_trap() {
    let host = Host::new();
    let realm = host.main_realm();
    let f = host.create_native_function(realm, "noop", |_, _, _| Ok(Value::Undefined));
    let handler = Rc::new(CountingHandler {
        applies: RefCell::new(0),
    });
    let proxy = Value::Object(host.create_proxy(f, handler.clone()).unwrap());

    host.invoke(&proxy, "call", &[Value::Null]).unwrap();
    host.invoke(&proxy, "apply", &[Value::Null, Value::Null]).unwrap();
    assert_eq!(*handler.applies.borrow(), 2);
}

// ===== Reentrancy Tests =====

#[test]
fn test_reentrant_accessor_sees_consistent_state() {
    let host = Host::new();
    let realm = host.main_realm();
    let proto = host.create_plain_object(realm);
    let depth = Rc::new(RefCell::new(Vec::new()));

    let inner_depth = Rc::clone(&depth);
    let inner = host.create_native_function(realm, "get inner", move |_, _, _| {
        inner_depth.borrow_mut().push("inner");
        Ok(Value::Number(1.0))
    });
    let outer_depth = Rc::clone(&depth);
    let outer = host.create_native_function(realm, "get outer", move |host, this, _| {
        let id = this.as_object().ok_or_else(HostError::illegal_invocation)?;
        let value = host.get(id, &"inner".into())?;
        outer_depth.borrow_mut().push("outer");
        Ok(value)
    });
    host.define_own_property(proto, &"inner".into(), PropertyDescriptor::accessor(Some(inner), None))
        .unwrap();
    host.define_own_property(proto, &"outer".into(), PropertyDescriptor::accessor(Some(outer), None))
        .unwrap();

    let obj = host.alloc_object(realm, "Object", Some(proto));
    assert_eq!(host.get(obj, &"outer".into()).unwrap(), Value::Number(1.0));
    assert_eq!(*depth.borrow(), vec!["inner", "outer"]);
}

// ===== Heap Lifetime Tests =====

#[test]
fn test_released_object_slot_is_reused_with_new_generation() {
    let host = Host::new();
    let realm = host.main_realm();
    let before = host.heap_stats();

    let obj = host.create_plain_object(realm);
    assert!(host.release(obj));
    let reused = host.create_plain_object(realm);

    assert_eq!(obj.index(), reused.index());
    assert!(!host.is_live(obj));
    assert!(host.is_live(reused));
    assert_eq!(host.heap_stats().live_objects, before.live_objects + 1);
}

#[test]
fn test_release_drops_listeners() {
    let host = Host::new();
    let realm = host.main_realm();
    let target = host
        .invoke(&document_of(&host), "createElement", &[Value::string("div")])
        .unwrap();
    let callback = host.create_native_function(realm, "cb", |_, _, _| Ok(Value::Undefined));
    host.invoke(
        &target,
        "addEventListener",
        &[Value::string("click"), Value::Object(callback)],
    )
    .unwrap();

    let id = target.as_object().unwrap();
    assert_eq!(host.listener_count(id), 1);
    host.release(id);
    assert_eq!(host.listener_count(id), 0);
}

#[test]
fn test_symbol_keys() {
    let host = Host::new();
    let obj = host.create_plain_object(host.main_realm());
    let key = PropertyKey::from(nativetrace_host::Symbol::new("tag"));
    host.set(obj, &key, Value::Bool(true)).unwrap();

    assert_eq!(host.get(obj, &key).unwrap(), Value::Bool(true));
    assert!(host.enumerable_keys(obj).is_empty());
}
