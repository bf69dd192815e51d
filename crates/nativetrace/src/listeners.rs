//! Listener boxing for `EventTarget`
//!
//! Native dispatch invokes listeners with raw targets and events, which would
//! let callbacks escape tracing. `addEventListener` and `removeEventListener`
//! are replaced by script functions that register a box instead of the
//! callback. The box wraps `this` and every argument before forwarding.
//! Boxes are cached per callback so removal finds the same box again.

use crate::describe;
use crate::proxy::detached_call;
use crate::tracer::Tracer;
use nativetrace_host::{Host, HostResult, ObjectId, PropertyDescriptor, PropertyKey, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

const ADD_SOURCE: &str = "function addEventListener(type, listener, options) { return traced.add(this, type, listener, options); }";
const REMOVE_SOURCE: &str = "function removeEventListener(type, listener, options) { return traced.remove(this, type, listener, options); }";
const BOX_SOURCE: &str = "function (event) { return listener.apply(traced.wrap(this), traced.wrapAll(arguments)); }";

impl Tracer {
    /// Replace the listener entry points on `event_target_proto`
    pub(crate) fn install_listener_adapter(&self, host: &Host, event_target_proto: ObjectId) -> HostResult<()> {
        let realm = self.realm();
        let add_key = PropertyKey::from("addEventListener");
        let remove_key = PropertyKey::from("removeEventListener");
        let native_add = host.get(event_target_proto, &add_key)?;
        let native_remove = host.get(event_target_proto, &remove_key)?;

        let tracer = self.me.clone();
        let add = host.create_script_method(realm, "addEventListener", ADD_SOURCE, move |host, this, args| {
            match tracer.upgrade() {
                Some(tracer) => tracer.add_listener(host, &native_add, this, args),
                None => detached_call(host, &native_add, this, args),
            }
        });
        let tracer = self.me.clone();
        let boxes = Rc::clone(&self.listener_boxes);
        let remove = host.create_script_method(realm, "removeEventListener", REMOVE_SOURCE, move |host, this, args| {
            match tracer.upgrade() {
                Some(tracer) => tracer.remove_listener(host, &native_remove, this, args),
                // boxes registered while attached stay removable
                None => {
                    let callback = args.get(1).cloned().unwrap_or_default();
                    let forwarded = forwarded_args(args, box_for(&boxes, callback));
                    detached_call(host, &native_remove, this, &forwarded)
                }
            }
        });

        host.define_own_property(event_target_proto, &add_key, PropertyDescriptor::builtin(Value::Object(add)))?;
        host.define_own_property(event_target_proto, &remove_key, PropertyDescriptor::builtin(Value::Object(remove)))?;
        tracing::debug!("listener adapter installed");
        Ok(())
    }

    fn add_listener(&self, host: &Host, native_add: &Value, this: Value, args: &[Value]) -> HostResult<Value> {
        let callback = args.get(1).cloned().unwrap_or_default();
        if !callback.is_truthy() {
            return Ok(Value::Undefined);
        }
        let this = self.unwrap(&this);
        let boxed = match callback {
            Value::Object(id) if host.is_callable(&Value::Object(id)) => Value::Object(self.listener_box(host, id)),
            other => other,
        };
        host.call(native_add, this, &forwarded_args(args, boxed))
    }

    fn remove_listener(&self, host: &Host, native_remove: &Value, this: Value, args: &[Value]) -> HostResult<Value> {
        let callback = args.get(1).cloned().unwrap_or_default();
        if !callback.is_truthy() {
            return Ok(Value::Undefined);
        }
        let this = self.unwrap(&this);
        let boxed = box_for(&self.listener_boxes, callback);
        host.call(native_remove, this, &forwarded_args(args, boxed))
    }

    /// The box standing in for `callback`, reused while it is live
    ///
    /// `this` is named after the target it is dispatched on, so one callback
    /// shared by several targets names each of them correctly.
    fn listener_box(&self, host: &Host, callback: ObjectId) -> ObjectId {
        let cached = self.listener_boxes.borrow().get(&callback).copied();
        if let Some(boxed) = cached.filter(|id| host.is_live(*id)) {
            return boxed;
        }

        let tracer = self.me.clone();
        let boxed = host.create_script_function(self.realm(), "", BOX_SOURCE, move |host, this, args| {
            let Some(tracer) = tracer.upgrade() else {
                return host.call(&Value::Object(callback), this, args);
            };
            let name = format!("EventTarget<{}>", describe::type_name(host, &this));
            let this = tracer.wrap(host, this, Some(&name));
            let args: Vec<Value> = args
                .iter()
                .map(|arg| {
                    let label = describe::type_name(host, arg);
                    tracer.wrap(host, arg.clone(), Some(&label))
                })
                .collect();
            host.call(&Value::Object(callback), this, &args)
        });
        self.listener_boxes.borrow_mut().insert(callback, boxed);
        boxed
    }
}

/// The box registered for `callback`, else `callback` itself
fn box_for(boxes: &RefCell<FxHashMap<ObjectId, ObjectId>>, callback: Value) -> Value {
    if let Value::Object(id) = callback {
        if let Some(boxed) = boxes.borrow().get(&id).copied() {
            return Value::Object(boxed);
        }
    }
    callback
}

/// `[type, listener, ...rest]` with the listener replaced
fn forwarded_args(args: &[Value], listener: Value) -> Vec<Value> {
    let mut forwarded = args.to_vec();
    if forwarded.is_empty() {
        forwarded.push(Value::Undefined);
    }
    if forwarded.len() < 2 {
        forwarded.push(listener);
    } else {
        forwarded[1] = listener;
    }
    forwarded
}
