//! In-place instrumentation for objects that cannot be replaced by a wrapper
//!
//! Prototypes are shared by every instance, and the global and the document
//! are referenced directly by the host, so none of them can be swapped for a
//! proxy. Their properties are rewritten one by one instead:
//!
//! | where defined | descriptor                        | outcome                        |
//! |---------------|-----------------------------------|--------------------------------|
//! | inherited     | configurable                      | skipped (shimmed where defined)|
//! | own           | configurable accessor with getter | traced accessor pair           |
//! | inherited     | non-configurable with getter      | traced accessor pair (own)     |
//! | own           | configurable writable data        | value wrapped in place         |
//! | inherited     | non-configurable read-only data   | own frozen copy of the wrapper |
//! | own           | non-configurable writable data    | value wrapped in place         |
//! | own           | non-configurable read-only data   | coverage gap reported          |
//! | own           | non-configurable accessor         | coverage gap reported          |

use crate::describe;
use crate::diagnostics::DiagnosticKind;
use crate::proxy::detached_call;
use crate::tracer::Tracer;
use nativetrace_host::{Host, HostResult, ObjectId, PropertyDescriptor, PropertyKey, Value};
use rustc_hash::FxHashSet;

/// Prototype plumbing, never touched anywhere
const ALWAYS_SKIPPED: &[&str] = &[
    "__proto__",
    "__lookupGetter__",
    "__lookupSetter__",
    "__defineGetter__",
    "__defineSetter__",
];

/// Global bindings the tracer itself depends on
const GLOBAL_SKIPPED: &[&str] = &[
    "window", "top", "self", "document", "location", "Object", "Array", "Function", "Date",
    "Number", "String", "Boolean", "Symbol",
];

/// Own properties of functions
const CALLABLE_SKIPPED: &[&str] = &["name", "length", "prototype"];

const TRACED_GETTER_SOURCE: &str = "function get() { return traced.get.call(this); }";
const TRACED_SETTER_SOURCE: &str = "function set(value) { traced.set.call(this, value); }";

/// What a traced accessor needs to know about the property it replaces
struct AccessorSite {
    getter: ObjectId,
    setter: Option<ObjectId>,
    /// `"<OwnerType>.<key>"`, logged on native accesses
    label: String,
    /// `"<object name>.<key>"`, given to wrapped getter results
    member: String,
}

impl Tracer {
    /// Instrument `object` in place, its prototype chain first
    pub(crate) fn shim_properties_of(&self, host: &Host, object: ObjectId, name: Option<&str>) {
        if self.is_tracked(&Value::Object(object)) {
            return;
        }
        self.registry.borrow_mut().register_in_place(object, name);

        self.shim_prototype_chain(host, object);

        if self.exclusions.is_excluded_from_shimming(object) {
            return;
        }

        let base = name
            .map(str::to_string)
            .unwrap_or_else(|| describe::type_name(host, &Value::Object(object)));
        for key in shim_keys(host, object) {
            if self.is_skipped(host, object, &key) {
                continue;
            }
            if let Err(err) = self.shim_property(host, object, &base, &key) {
                self.report(
                    DiagnosticKind::ShimFailed,
                    object,
                    Some(&base),
                    Some(&key),
                    format!("Unable to wrap property: {}", err),
                );
            }
        }
    }

    fn is_skipped(&self, host: &Host, object: ObjectId, key: &PropertyKey) -> bool {
        let Some(key) = key.as_str() else {
            return true;
        };
        if ALWAYS_SKIPPED.contains(&key) {
            return true;
        }
        let objects = &self.objects;
        if object == objects.global
            && (GLOBAL_SKIPPED.contains(&key) || self.export_name.as_deref() == Some(key))
        {
            return true;
        }
        if object == objects.document && key == "location" {
            return true;
        }
        if object == objects.function_proto && key == "toString" {
            return true;
        }
        host.is_callable(&Value::Object(object)) && CALLABLE_SKIPPED.contains(&key)
    }

    fn shim_property(&self, host: &Host, object: ObjectId, base: &str, key: &PropertyKey) -> HostResult<()> {
        let Some((owner, desc)) = describe::find_property(host, object, key) else {
            return Ok(());
        };
        let own = owner == object;
        let member = format!("{}.{}", base, key);

        if own && !desc.configurable() {
            return self.shim_fixed_property(host, object, base, key, &desc, &member);
        }
        if !own && desc.configurable() {
            return Ok(());
        }

        if let Some(getter) = desc.getter() {
            let site = AccessorSite {
                getter,
                setter: desc.setter(),
                label: format!(
                    "{}.{}",
                    host.class_of(&Value::Object(owner)),
                    describe::key_label(key)
                ),
                member,
            };
            let (enumerable, configurable) = if own {
                (desc.enumerable(), desc.configurable())
            } else {
                (false, false)
            };
            return self.install_traced_accessor(host, object, key, site, enumerable, configurable);
        }

        match &desc {
            PropertyDescriptor::Data {
                value,
                writable: true,
                ..
            } if own => {
                if value.is_truthy() && self.should_wrap(host, value) {
                    let wrapped = self.wrap(host, value.clone(), Some(&member));
                    let replaced = host.set(object, key, wrapped).unwrap_or(false);
                    if !replaced {
                        self.report(
                            DiagnosticKind::UnwrappedProperty,
                            object,
                            Some(base),
                            Some(key),
                            format!(
                                "Read-write property {} of {} object was left unwrapped",
                                key,
                                describe::type_name(host, &Value::Object(object))
                            ),
                        );
                    }
                }
            }
            PropertyDescriptor::Data {
                value,
                writable: false,
                enumerable,
                ..
            } if !own => {
                if self.should_wrap(host, value) {
                    let wrapped = self.wrap(host, value.clone(), Some(&member));
                    host.define_own_property(
                        object,
                        key,
                        PropertyDescriptor::Data {
                            value: wrapped,
                            writable: false,
                            enumerable: *enumerable,
                            configurable: false,
                        },
                    )?;
                }
            }
            PropertyDescriptor::Data { value, .. } if own => {
                if value.is_truthy() && self.should_wrap(host, value) {
                    self.report(
                        DiagnosticKind::ReadonlyProperty,
                        object,
                        Some(base),
                        Some(key),
                        "Unable to wrap readonly property at this level",
                    );
                }
            }
            // setter-only accessors and inherited writable slots need nothing
            _ => {}
        }
        Ok(())
    }

    /// Own non-configurable properties: only writable data can be touched
    fn shim_fixed_property(
        &self,
        host: &Host,
        object: ObjectId,
        base: &str,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        member: &str,
    ) -> HostResult<()> {
        match desc {
            PropertyDescriptor::Data {
                value: value @ Value::Object(_),
                writable: true,
                ..
            } => {
                let wrapped = self.wrap(host, value.clone(), Some(member));
                if wrapped != *value {
                    if let Err(err) = host.set(object, key, wrapped) {
                        tracing::debug!(key = %key, error = %err, "fixed writable property left unwrapped");
                    }
                }
            }
            PropertyDescriptor::Data { writable: true, .. } => {}
            PropertyDescriptor::Data { value, .. } => {
                if self.should_wrap(host, value) {
                    self.report(
                        DiagnosticKind::ReadonlyProperty,
                        object,
                        Some(base),
                        Some(key),
                        "Unable to wrap readonly property",
                    );
                }
            }
            PropertyDescriptor::Accessor { .. } => {
                self.report(
                    DiagnosticKind::UnrecognizedProperty,
                    object,
                    Some(base),
                    Some(key),
                    "Unable to wrap strange property",
                );
            }
        }
        Ok(())
    }

    fn install_traced_accessor(
        &self,
        host: &Host,
        object: ObjectId,
        key: &PropertyKey,
        site: AccessorSite,
        enumerable: bool,
        configurable: bool,
    ) -> HostResult<()> {
        let realm = self.realm();
        let getter = site.getter;
        let setter = site.setter;
        let site = std::rc::Rc::new(site);

        let get = {
            let tracer = self.me.clone();
            let site = std::rc::Rc::clone(&site);
            host.create_script_method(realm, &format!("get {}", key), TRACED_GETTER_SOURCE, move |host, this, _| {
                match tracer.upgrade() {
                    Some(tracer) => tracer.traced_get(host, &site, this),
                    None => detached_call(host, &Value::Object(getter), this, &[]),
                }
            })
        };
        let set = setter.map(|setter| {
            let tracer = self.me.clone();
            let site = std::rc::Rc::clone(&site);
            host.create_script_method(realm, &format!("set {}", key), TRACED_SETTER_SOURCE, move |host, this, args| {
                let value = args.first().cloned().unwrap_or_default();
                match tracer.upgrade() {
                    Some(tracer) => tracer.traced_set(host, &site, setter, this, value),
                    None => detached_call(host, &Value::Object(setter), this, &[value]),
                }
            })
        });

        host.define_own_property(
            object,
            key,
            PropertyDescriptor::Accessor {
                get: Some(get),
                set,
                enumerable,
                configurable,
            },
        )
    }

    fn traced_get(&self, host: &Host, site: &AccessorSite, this: Value) -> HostResult<Value> {
        let getter = Value::Object(site.getter);
        let native = self.is_native_fn(host, &getter);
        let this = if native { self.unwrap(&this) } else { this };

        let result = host.call(&getter, this, &[]);
        if native {
            self.record(&site.label);
        }

        let value = result?;
        Ok(self.wrap(host, value, Some(&site.member)))
    }

    fn traced_set(
        &self,
        host: &Host,
        site: &AccessorSite,
        setter: ObjectId,
        this: Value,
        value: Value,
    ) -> HostResult<Value> {
        let setter = Value::Object(setter);
        let native = self.is_native_fn(host, &setter);
        let (this, value) = if native {
            (self.unwrap(&this), self.unwrap(&value))
        } else {
            (this, value)
        };

        let result = host.call(&setter, this, &[value.clone()]);
        if native {
            self.record(&format!("{}={}", site.label, describe::type_name(host, &value)));
        }
        result
    }
}

/// Own string keys followed by the remaining enumerable (for-in) keys
fn shim_keys(host: &Host, object: ObjectId) -> Vec<PropertyKey> {
    let mut seen = FxHashSet::default();
    let mut keys = Vec::new();
    let own = host
        .own_keys(object)
        .into_iter()
        .filter(|key| key.as_str().is_some());
    for key in own.chain(host.enumerable_keys(object)) {
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use crate::config::TraceConfig;
    use crate::diagnostics::DiagnosticKind;
    use crate::session::TraceSession;
    use nativetrace_host::{Host, HostResult, ObjectId, PropertyDescriptor, PropertyKey, ProxyHandler, Value};
    use std::rc::Rc;

    fn install(host: &Host) -> TraceSession {
        TraceSession::install(host, host.main_realm(), &TraceConfig::default()).unwrap()
    }

    fn native(host: &Host, name: &str) -> Value {
        Value::Object(host.create_native_function(host.main_realm(), name, |_, _, _| {
            Ok(Value::Number(7.0))
        }))
    }

    fn object(value: &Value) -> ObjectId {
        value.as_object().unwrap()
    }

    /// Accepts reads, refuses every write
    struct RefusingHandler;

    impl ProxyHandler for RefusingHandler {
        fn set(&self, _: &Host, _: ObjectId, _: &PropertyKey, _: Value, _: Value) -> HostResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_inherited_readonly_data_gets_frozen_copy() {
        let host = Host::new();
        let session = install(&host);
        let realm = host.main_realm();
        let measure = native(&host, "measure");
        let proto = host.alloc_object(realm, "GadgetPrototype", None);
        let key = PropertyKey::from("sensor");
        host.define_own_property(
            proto,
            &key,
            PropertyDescriptor::Data {
                value: measure.clone(),
                writable: false,
                enumerable: true,
                configurable: false,
            },
        )
        .unwrap();
        let gadget = host.alloc_object(realm, "Gadget", Some(proto));

        session.tracer().shim_properties_of(&host, gadget, Some("gadget"));

        let Some(PropertyDescriptor::Data {
            value,
            writable,
            enumerable,
            configurable,
        }) = host.get_own_property(gadget, &key)
        else {
            panic!("expected an own data property");
        };
        assert!(!writable && enumerable && !configurable);
        assert!(host.is_proxy(object(&value)));
        assert_eq!(session.unwrap(&value), measure);
        assert_eq!(
            session.record_for(object(&value)).unwrap().name.as_deref(),
            Some("gadget.sensor")
        );
        // the prototype keeps the original
        assert_eq!(host.get_own_property(proto, &key).unwrap().value(), Some(&measure));
    }

    #[test]
    fn test_inherited_fixed_getter_gets_traced_accessor() {
        let host = Host::new();
        let session = install(&host);
        let realm = host.main_realm();
        let getter = object(&native(&host, "get level"));
        let proto = host.alloc_object(realm, "GadgetPrototype", None);
        let key = PropertyKey::from("level");
        host.define_own_property(
            proto,
            &key,
            PropertyDescriptor::Accessor {
                get: Some(getter),
                set: None,
                enumerable: true,
                configurable: false,
            },
        )
        .unwrap();
        let gadget = host.alloc_object(realm, "Gadget", Some(proto));

        session.tracer().shim_properties_of(&host, gadget, Some("gadget"));

        let Some(PropertyDescriptor::Accessor {
            get: Some(traced),
            set: None,
            enumerable: false,
            configurable: false,
        }) = host.get_own_property(gadget, &key)
        else {
            panic!("expected an own fixed accessor");
        };
        assert_ne!(traced, getter);
        assert!(session.log().is_empty());
        assert_eq!(host.get(gadget, &key).unwrap(), Value::Number(7.0));
        assert_eq!(session.log(), vec!["Gadget.level"]);
    }

    #[test]
    fn test_refused_wrapper_is_reported() {
        let host = Host::new();
        let session = install(&host);
        let measure = native(&host, "measure");
        let target = host.alloc_object(host.main_realm(), "Gadget", None);
        let key = PropertyKey::from("sensor");
        host.define_own_property(target, &key, PropertyDescriptor::data(measure.clone()))
            .unwrap();
        let handler: Rc<dyn ProxyHandler> = Rc::new(RefusingHandler);
        let guarded = host.create_proxy(target, handler).unwrap();

        session.tracer().shim_properties_of(&host, guarded, Some("gadget"));

        let reports = session.diagnostics_of(DiagnosticKind::UnwrappedProperty);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key.as_deref(), Some("sensor"));
        assert_eq!(
            reports[0].message,
            "Read-write property sensor of Gadget object was left unwrapped"
        );
        assert_eq!(host.get(target, &key).unwrap(), measure);
    }
}
