//! Transparent wrappers and their traps
//!
//! A wrapper is a host proxy whose handler is the session's [`TraceHandler`].
//! Every trap performs the real operation on the target first, then logs,
//! then wraps whatever object comes back. The operation's own outcome
//! (value or error) always reaches the caller unchanged; the log entry is
//! written even when the operation fails.
//!
//! Labels:
//! - get: `"<OwnerType>.<key>"`
//! - set: `"<OwnerType>.<key>=<type>"`
//! - apply: `"<name>(<argtypes>)"`
//! - construct: `"new <name>(<argtypes>)"`

use crate::classify::is_native_source;
use crate::describe;
use crate::diagnostics::DiagnosticKind;
use crate::tracer::Tracer;
use nativetrace_host::{Host, HostResult, ObjectId, PropertyKey, ProxyHandler, Value};
use std::rc::{Rc, Weak};

/// Proxy handler shared by every wrapper of a session
pub(crate) struct TraceHandler {
    tracer: Weak<Tracer>,
}

impl TraceHandler {
    pub(crate) fn new(tracer: Weak<Tracer>) -> Self {
        Self { tracer }
    }
}

impl ProxyHandler for TraceHandler {
    fn get(&self, host: &Host, target: ObjectId, key: &PropertyKey, _receiver: Value) -> HostResult<Value> {
        match self.tracer.upgrade() {
            Some(tracer) => tracer.trap_get(host, target, key),
            None => host.get(target, key),
        }
    }

    fn set(
        &self,
        host: &Host,
        target: ObjectId,
        key: &PropertyKey,
        value: Value,
        _receiver: Value,
    ) -> HostResult<bool> {
        match self.tracer.upgrade() {
            Some(tracer) => tracer.trap_set(host, target, key, value),
            None => host.set(target, key, value),
        }
    }

    fn apply(&self, host: &Host, target: ObjectId, this: Value, args: &[Value]) -> HostResult<Value> {
        match self.tracer.upgrade() {
            Some(tracer) => tracer.trap_apply(host, target, this, args),
            None => detached_call(host, &Value::Object(target), this, args),
        }
    }

    fn construct(&self, host: &Host, target: ObjectId, args: &[Value]) -> HostResult<Value> {
        match self.tracer.upgrade() {
            Some(tracer) => tracer.trap_construct(host, target, args),
            None => {
                let callee = Value::Object(target);
                if is_native_callee(host, target) {
                    host.construct(&callee, &strip_all(host, args))
                } else {
                    host.construct(&callee, args)
                }
            }
        }
    }
}

/// Forward a call with no tracer attached: natives get the objects behind
/// any wrappers, other callees see exactly what the caller passed
pub(crate) fn detached_call(host: &Host, callee: &Value, this: Value, args: &[Value]) -> HostResult<Value> {
    match callee {
        Value::Object(id) if is_native_callee(host, *id) => {
            host.call(callee, strip_wrappers(host, &this), &strip_all(host, args))
        }
        _ => host.call(callee, this, args),
    }
}

fn is_native_callee(host: &Host, callee: ObjectId) -> bool {
    host.function_source(callee)
        .map_or(false, |source| is_native_source(&source))
}

/// The object at the bottom of a chain of proxies
fn strip_wrappers(host: &Host, value: &Value) -> Value {
    let mut current = value.clone();
    while let Value::Object(id) = current {
        match host.proxy_target(id) {
            Some(target) => current = Value::Object(target),
            None => break,
        }
    }
    current
}

fn strip_all(host: &Host, values: &[Value]) -> Vec<Value> {
    values.iter().map(|value| strip_wrappers(host, value)).collect()
}

impl Tracer {
    /// Whether `value` deserves a wrapper: an untracked native object of
    /// this realm that no exclusion covers
    pub(crate) fn should_wrap(&self, host: &Host, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        !self.is_tracked(value)
            && self.is_same_realm(host, *id)
            && !self.exclusions.is_excluded_from_wrapping(*id)
            && !self.exclusions.is_excluded_from_shimming(*id)
            && self.is_native_object(host, value)
    }

    /// Return the wrapper standing in for `value`, creating it when needed
    ///
    /// Never fails: anything that cannot or should not be wrapped comes back
    /// unchanged.
    pub(crate) fn wrap(&self, host: &Host, value: Value, name: Option<&str>) -> Value {
        let Value::Object(id) = value else {
            return value;
        };
        if self.exclusions.is_excluded_from_wrapping(id) || !host.is_live(id) {
            return value;
        }
        if !self.is_same_realm(host, id) {
            self.report(
                DiagnosticKind::ForeignRealm,
                id,
                name,
                None,
                "Cross-document object detected",
            );
            return value;
        }

        {
            let mut registry = self.registry.borrow_mut();
            if let Some(wrapper) = registry.wrapper_for(id) {
                registry.adopt_name(id, name);
                return Value::Object(wrapper);
            }
            if registry.is_tracked(&value) {
                registry.adopt_name(id, name);
                return value;
            }
        }

        if !self.should_wrap(host, &value) {
            return value;
        }
        match self.create_wrapper(host, id, name) {
            Ok(wrapper) => Value::Object(wrapper),
            Err(err) => {
                tracing::debug!(object = %id, error = %err, "wrapping failed, passing the original through");
                value
            }
        }
    }

    fn create_wrapper(&self, host: &Host, original: ObjectId, name: Option<&str>) -> HostResult<ObjectId> {
        let handler: Rc<dyn ProxyHandler> = self.handler.clone();
        let wrapper = host.create_proxy(original, handler)?;
        self.registry.borrow_mut().register(original, wrapper, name);
        // proxies of callables render as native code
        self.classifier.mark_non_native(wrapper);
        self.shim_prototype_chain(host, original);
        Ok(wrapper)
    }

    /// Shim every prototype above `id` up to the first tracked one, each
    /// named after its constructor
    pub(crate) fn shim_prototype_chain(&self, host: &Host, id: ObjectId) {
        let mut proto = host.prototype_of(id);
        while let Some(current) = proto {
            if self.is_tracked(&Value::Object(current)) {
                break;
            }
            let name = describe::constructor_name(host, current);
            self.shim_properties_of(host, current, name.as_deref());
            proto = host.prototype_of(current);
        }
    }

    pub(crate) fn trap_get(&self, host: &Host, target: ObjectId, key: &PropertyKey) -> HostResult<Value> {
        let result = host.get(target, key);

        let found = describe::find_property(host, target, key);
        let produced = matches!(&result, Ok(value) if !value.is_undefined());
        if found.is_some() || produced {
            let getter_is_native = found
                .as_ref()
                .and_then(|(_, desc)| desc.getter())
                .map_or(true, |getter| self.is_native_fn(host, &Value::Object(getter)));
            if getter_is_native {
                self.record(&format!(
                    "{}.{}",
                    describe::owner_type(host, target, key),
                    describe::key_label(key)
                ));
            }
        }

        let value = result?;
        if !value.is_truthy() || !self.should_wrap(host, &value) {
            return Ok(value);
        }

        let proxyable = match &found {
            None => true,
            Some((_, desc)) => desc.setter().is_some() || desc.is_writable() || desc.configurable(),
        };
        if proxyable {
            let prefix = self
                .name_of(target)
                .unwrap_or_else(|| describe::type_name(host, &Value::Object(target)));
            let name = format!("{}.{}", prefix, describe::key_label(key));
            Ok(self.wrap(host, value, Some(&name)))
        } else {
            // a frozen slot must keep returning the same object
            if let Value::Object(id) = value {
                let name = format!(
                    "{}.{}",
                    describe::owner_type(host, target, key),
                    describe::key_label(key)
                );
                self.shim_properties_of(host, id, Some(&name));
            }
            Ok(value)
        }
    }

    pub(crate) fn trap_set(&self, host: &Host, target: ObjectId, key: &PropertyKey, value: Value) -> HostResult<bool> {
        let result = host.set(target, key, value.clone());

        if let Some((_, desc)) = describe::find_property(host, target, key) {
            let setter_is_native = desc
                .setter()
                .map_or(true, |setter| self.is_native_fn(host, &Value::Object(setter)));
            if setter_is_native {
                self.record(&format!(
                    "{}.{}={}",
                    describe::owner_type(host, target, key),
                    describe::key_label(key),
                    describe::type_name(host, &value)
                ));
            }
        }

        result?;
        Ok(true)
    }

    pub(crate) fn trap_apply(&self, host: &Host, target: ObjectId, this: Value, args: &[Value]) -> HostResult<Value> {
        let callee = Value::Object(target);
        let native = self.is_native_fn(host, &callee);
        let (this, args): (Value, Vec<Value>) = if native {
            (self.unwrap(&this), args.iter().map(|arg| self.unwrap(arg)).collect())
        } else {
            (this, args.to_vec())
        };

        let result = host.call(&callee, this.clone(), &args);

        if native {
            let label = self.call_label(host, target, &this);
            self.record(&self.signature(host, &label, &args));
        }

        let value = result?;
        let name = host.function_name(target).map(|name| format!("{}()", name));
        Ok(self.wrap(host, value, name.as_deref()))
    }

    pub(crate) fn trap_construct(&self, host: &Host, target: ObjectId, args: &[Value]) -> HostResult<Value> {
        let callee = Value::Object(target);
        let native = self.is_native_fn(host, &callee);
        let args: Vec<Value> = if native {
            args.iter().map(|arg| self.unwrap(arg)).collect()
        } else {
            args.to_vec()
        };

        let result = host.construct(&callee, &args);

        if native {
            let label = self
                .wrapper_name(target)
                .or_else(|| {
                    host.function_name(target)
                        .filter(|name| !name.is_empty())
                        .map(|name| describe::key_label(&PropertyKey::from(name.to_string())))
                })
                .unwrap_or_else(|| match &result {
                    Ok(instance) => describe::type_name(host, instance),
                    Err(_) => describe::type_name(host, &Value::Undefined),
                });
            self.record(&self.signature(host, &format!("new {}", label), &args));
        }

        let value = result?;
        let name = format!("new {}()", host.function_name(target).unwrap_or_default());
        Ok(self.wrap(host, value, Some(&name)))
    }

    /// Label for a native call: the callee's recorded name, else the key it
    /// is stored under on the receiver (or the global), else `"<type>.[???]"`
    fn call_label(&self, host: &Host, callee: ObjectId, this: &Value) -> String {
        if let Some(name) = self.wrapper_name(callee) {
            return name;
        }

        let holder = match this {
            Value::Object(id) => Some(*id),
            other if !other.is_truthy() => Some(self.objects.global),
            _ => None,
        };
        if let (Some(holder), Some(name)) = (holder, host.function_name(callee)) {
            if !name.is_empty() {
                let key = PropertyKey::from(name.to_string());
                if let Some((owner, desc)) = describe::find_property(host, holder, &key) {
                    let stored = desc.value().map(|value| self.unwrap(value));
                    if stored == Some(Value::Object(callee)) {
                        return format!(
                            "{}.{}",
                            host.class_of(&Value::Object(owner)),
                            describe::key_label(&key)
                        );
                    }
                }
            }
        }

        let subject = match holder {
            Some(id) => Value::Object(id),
            None => this.clone(),
        };
        format!("{}.[???]", describe::type_name(host, &subject))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TraceConfig;
    use crate::session::TraceSession;
    use nativetrace_host::{
        FunctionBody, FunctionData, Host, HostResult, ObjectData, ObjectId, ObjectKind, PropertyDescriptor, Value,
    };
    use std::rc::Rc;

    fn install(host: &Host) -> TraceSession {
        TraceSession::install(host, host.main_realm(), &TraceConfig::default()).unwrap()
    }

    fn object(value: &Value) -> ObjectId {
        value.as_object().unwrap()
    }

    #[test]
    fn test_frozen_slot_value_is_shimmed_in_place() {
        let host = Host::new();
        let session = install(&host);
        let realm = host.main_realm();
        let ctor = host.create_native_function(realm, "Gadget", |_, _, _| Ok(Value::Undefined));
        let proto = host.alloc_object(realm, "GadgetPrototype", None);
        host.define_own_property(proto, &"constructor".into(), PropertyDescriptor::builtin(Value::Object(ctor)))
            .unwrap();
        let gadget = host.alloc_object(realm, "Gadget", Some(proto));
        let measure = Value::Object(host.create_native_function(realm, "measure", |_, _, _| Ok(Value::Null)));
        host.define_own_property(gadget, &"sensor".into(), PropertyDescriptor::frozen(measure.clone()))
            .unwrap();

        let wrapper = session.wrap(&host, Value::Object(gadget), Some("gadget"));
        assert!(host.is_proxy(object(&wrapper)));
        let value = host.get(object(&wrapper), &"sensor".into()).unwrap();

        // the same object comes back, instrumented where it stands
        assert_eq!(value, measure);
        assert!(!host.is_proxy(object(&value)));
        assert!(session.is_tracked(&value));
        assert_eq!(
            session.record_for(object(&value)).unwrap().name.as_deref(),
            Some("Gadget.sensor")
        );
        assert_eq!(session.log(), vec!["Gadget.sensor"]);
    }

    #[test]
    fn test_construct_label_falls_back_to_result_type() {
        let host = Host::new();
        let session = install(&host);
        let realm = host.main_realm();
        let function_proto = host.realm(realm).unwrap().intrinsic("Function.prototype");
        let mut data = ObjectData::new(realm, "Function", function_proto);
        data.kind = ObjectKind::Function(FunctionData {
            name: Rc::from(""),
            body: FunctionBody::Native {
                call: Rc::new(|_: &Host, _: Value, _: &[Value]| -> HostResult<Value> { Ok(Value::Undefined) }),
                construct: Some(Rc::new(|host: &Host, _: &[Value]| -> HostResult<Value> {
                    Ok(Value::Object(host.alloc_object(host.main_realm(), "Gizmo", None)))
                })),
            },
        });
        let anonymous = host.allocate(data);

        let wrapper = session.wrap(&host, Value::Object(anonymous), None);
        assert!(host.is_proxy(object(&wrapper)));
        let instance = host.construct(&wrapper, &[]).unwrap();

        assert_eq!(host.class_of(&instance), "Gizmo");
        assert_eq!(session.log(), vec!["new Gizmo()"]);
    }
}
