//! Session bootstrap
//!
//! [`TraceSession::install`] instruments one realm and returns the handle
//! the host keeps to read the log. Bootstrap order matters: every hook the
//! tracer installs is in place before the first object is shimmed, and the
//! log is cleared last so it starts empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use nativetrace::{TraceConfig, TraceSession};
//! use nativetrace_host::{Host, Value};
//!
//! let host = Host::new();
//! let session = TraceSession::install(&host, host.main_realm(), &TraceConfig::default())?;
//! let document = host.get(host.realm(host.main_realm())?.global(), &"document".into())?;
//! host.invoke(&document, "createElement", &[Value::string("div")])?;
//! assert_eq!(session.log(), vec!["Document.createElement(string)"]);
//! ```

use crate::config::TraceConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{TraceError, TraceResult};
use crate::exclusion::ExclusionPolicy;
use crate::logger::{strip_marker, LogSink, MemorySink, TraceLog};
use crate::registry::WrapperRecord;
use crate::tracer::{RealmObjects, Tracer};
use nativetrace_host::{Host, HostError, HostResult, ObjectId, PropertyDescriptor, PropertyKey, Realm, RealmId, Value};
use std::rc::{Rc, Weak};

const BIND_SOURCE: &str = "function bind(thisArg, ...args) { return traced.bind(this, thisArg, args); }";
const CALL_SOURCE: &str = "function call(thisArg, ...args) { return traced.wrap(this.apply(thisArg, args)); }";
const APPLY_SOURCE: &str = "function apply(thisArg, args) { return traced.wrap(Reflect.apply(this, thisArg, args)); }";

/// Counts returned by [`TraceSession::sweep`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Registry records dropped
    pub records: usize,
    /// Classification verdicts dropped
    pub classifications: usize,
    /// Listener boxes dropped
    pub listener_boxes: usize,
}

/// An installed trace session
///
/// Dropping the session detaches the tracer: every wrapper, shim accessor
/// and replaced built-in keeps working but forwards without logging.
pub struct TraceSession {
    tracer: Rc<Tracer>,
    log_object: ObjectId,
}

impl TraceSession {
    /// Instrument `realm` with an in-memory log
    pub fn install(host: &Host, realm: RealmId, config: &TraceConfig) -> TraceResult<Self> {
        Self::install_with_sink(host, realm, config, Box::new(MemorySink::new()))
    }

    /// Instrument `realm`, appending log entries to `sink`
    pub fn install_with_sink(
        host: &Host,
        realm: RealmId,
        config: &TraceConfig,
        sink: Box<dyn LogSink>,
    ) -> TraceResult<Self> {
        let realm = host.realm(realm)?;
        let objects = realm_objects(&realm)?;
        let event_target_proto = intrinsic(&realm, "EventTarget.prototype")?;
        let object_proto = intrinsic(&realm, "Object.prototype")?;

        let log_object = host.alloc_object(objects.realm, "TraceLog", Some(object_proto));
        let mut exclusions = ExclusionPolicy::for_realm(host, &realm, config)?;
        exclusions.exclude(log_object);

        let log = TraceLog::new(sink, strip_marker(&config.prototype_marker));
        let tracer = Tracer::new(objects, exclusions, log, config.export_name.clone());
        tracing::debug!(realm = %objects.realm, "installing trace session");

        install_log_object(host, &tracer, log_object)?;
        install_bind_hook(host, &tracer)?;
        install_call_hooks(host, &tracer)?;
        tracer.install_listener_adapter(host, event_target_proto)?;

        tracer.shim_properties_of(host, objects.document, Some("document"));
        if config.trace_ancestors {
            shim_ancestors(host, &tracer)?;
        }
        tracer.shim_properties_of(host, objects.global, Some("window"));

        if let Some(name) = &config.export_name {
            host.set(objects.global, &PropertyKey::from(name.as_str()), Value::Object(log_object))?;
        }
        tracer.log.clear();
        tracing::debug!(
            records = tracer.registry.borrow().len(),
            diagnostics = tracer.diagnostics.len(),
            "trace session installed"
        );

        Ok(Self { tracer, log_object })
    }

    /// Snapshot of the log
    pub fn log(&self) -> Vec<String> {
        self.tracer.log.entries()
    }

    /// Empty the log
    pub fn clear_log(&self) {
        self.tracer.log.clear();
    }

    /// Wrap `value` the way the traps do
    pub fn wrap(&self, host: &Host, value: Value, name: Option<&str>) -> Value {
        self.tracer.wrap(host, value, name)
    }

    /// The original behind a wrapper, anything else unchanged
    pub fn unwrap(&self, value: &Value) -> Value {
        self.tracer.unwrap(value)
    }

    /// Record for a wrapper or an original
    pub fn record_for(&self, id: ObjectId) -> Option<WrapperRecord> {
        self.tracer.registry.borrow().record_for(id).cloned()
    }

    /// Whether `value` is a primitive, a wrapper or a shimmed object
    pub fn is_tracked(&self, value: &Value) -> bool {
        self.tracer.is_tracked(value)
    }

    /// Every coverage gap and foreign-realm report so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.tracer.diagnostics.all()
    }

    /// Reports of one kind
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.tracer.diagnostics.of_kind(kind)
    }

    /// Forget everything keyed by objects the host has released
    pub fn sweep(&self, host: &Host) -> SweepReport {
        let is_live = |id: ObjectId| host.is_live(id);
        let records = self.tracer.registry.borrow_mut().sweep(is_live);
        let classifications = self.tracer.classifier.sweep(is_live);

        let mut boxes = self.tracer.listener_boxes.borrow_mut();
        let before = boxes.len();
        boxes.retain(|callback, boxed| is_live(*callback) && is_live(*boxed));
        let listener_boxes = before - boxes.len();

        tracing::debug!(records, classifications, listener_boxes, "swept");
        SweepReport {
            records,
            classifications,
            listener_boxes,
        }
    }

    /// The log object exported into the host
    pub fn log_object(&self) -> ObjectId {
        self.log_object
    }

    /// The instrumented realm
    pub fn realm(&self) -> RealmId {
        self.tracer.realm()
    }

    #[cfg(test)]
    pub(crate) fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

fn intrinsic(realm: &Realm, name: &str) -> TraceResult<ObjectId> {
    realm
        .intrinsic(name)
        .ok_or_else(|| TraceError::MissingIntrinsic(name.to_string()))
}

fn realm_objects(realm: &Realm) -> TraceResult<RealmObjects> {
    Ok(RealmObjects {
        realm: realm.id(),
        global: realm.global(),
        document: realm.document(),
        function_proto: intrinsic(realm, "Function.prototype")?,
        object_ctor: intrinsic(realm, "Object")?,
    })
}

fn upgrade(tracer: &Weak<Tracer>) -> HostResult<Rc<Tracer>> {
    tracer
        .upgrade()
        .ok_or_else(|| HostError::type_error("trace session has ended"))
}

/// `entries()`, `clear()` and `length` on the exported log object
fn install_log_object(host: &Host, tracer: &Rc<Tracer>, log_object: ObjectId) -> HostResult<()> {
    let realm = tracer.realm();

    let weak = Rc::downgrade(tracer);
    let entries = host.create_native_function(realm, "entries", move |host, _, _| {
        let tracer = upgrade(&weak)?;
        let entries: Vec<Value> = tracer.log.entries().iter().map(|e| Value::string(e)).collect();
        Ok(Value::Object(host.create_array(tracer.realm(), &entries)))
    });
    let weak = Rc::downgrade(tracer);
    let clear = host.create_native_function(realm, "clear", move |_, _, _| {
        upgrade(&weak)?.log.clear();
        Ok(Value::Undefined)
    });
    let weak = Rc::downgrade(tracer);
    let length = host.create_native_function(realm, "get length", move |_, _, _| {
        Ok(Value::Number(upgrade(&weak)?.log.len() as f64))
    });

    host.define_own_property(log_object, &"entries".into(), PropertyDescriptor::builtin(Value::Object(entries)))?;
    host.define_own_property(log_object, &"clear".into(), PropertyDescriptor::builtin(Value::Object(clear)))?;
    host.define_own_property(
        log_object,
        &"length".into(),
        PropertyDescriptor::Accessor {
            get: Some(length),
            set: None,
            enumerable: false,
            configurable: true,
        },
    )
}

/// Bound functions render as native code; mark each one non-native as it
/// is created
fn install_bind_hook(host: &Host, tracer: &Rc<Tracer>) -> HostResult<()> {
    let function_proto = tracer.objects.function_proto;
    let weak = Rc::downgrade(tracer);
    let bind = host.create_script_method(tracer.realm(), "bind", BIND_SOURCE, move |host, this, args| {
        let Value::Object(target) = this else {
            return Err(HostError::type_error("Bind must be called on a function"));
        };
        let bound_this = args.first().cloned().unwrap_or_default();
        let bound_args = args.iter().skip(1).cloned().collect();
        let bound = host.bind_function(target, bound_this, bound_args)?;
        if let Some(tracer) = weak.upgrade() {
            tracer.classifier.mark_non_native(bound);
        }
        Ok(Value::Object(bound))
    });
    host.define_own_property(function_proto, &"bind".into(), PropertyDescriptor::builtin(Value::Object(bind)))
}

/// `call` and `apply` that wrap what they return
fn install_call_hooks(host: &Host, tracer: &Rc<Tracer>) -> HostResult<()> {
    let function_proto = tracer.objects.function_proto;

    let weak = Rc::downgrade(tracer);
    let call = host.create_script_method(tracer.realm(), "call", CALL_SOURCE, move |host, this, args| {
        let this_arg = args.first().cloned().unwrap_or_default();
        let rest = args.get(1..).unwrap_or_default();
        let result = host.call(&this, this_arg, rest)?;
        Ok(match weak.upgrade() {
            Some(tracer) => tracer.wrap(host, result, None),
            None => result,
        })
    });

    let weak = Rc::downgrade(tracer);
    let apply = host.create_script_method(tracer.realm(), "apply", APPLY_SOURCE, move |host, this, args| {
        let this_arg = args.first().cloned().unwrap_or_default();
        let tracer = weak.upgrade();
        let list = match (args.get(1), &tracer) {
            (Some(list), Some(tracer)) => tracer.unwrap(list),
            (Some(list), None) => list.clone(),
            (None, _) => Value::Undefined,
        };
        let spread = match list {
            Value::Object(array) => host.array_elements(array)?,
            Value::Undefined | Value::Null => Vec::new(),
            _ => return Err(HostError::type_error("CreateListFromArrayLike called on non-object")),
        };
        let result = host.call(&this, this_arg, &spread)?;
        Ok(match tracer {
            Some(tracer) => tracer.wrap(host, result, None),
            None => result,
        })
    });

    host.define_own_property(function_proto, &"call".into(), PropertyDescriptor::builtin(Value::Object(call)))?;
    host.define_own_property(function_proto, &"apply".into(), PropertyDescriptor::builtin(Value::Object(apply)))
}

/// `parent` and `top` when they are distinct same-realm windows
fn shim_ancestors(host: &Host, tracer: &Tracer) -> TraceResult<()> {
    let global = tracer.objects.global;
    let mut seen = Vec::new();
    for name in ["parent", "top"] {
        let Value::Object(ancestor) = host.get(global, &name.into())? else {
            continue;
        };
        if ancestor == global || seen.contains(&ancestor) {
            continue;
        }
        seen.push(ancestor);
        if !tracer.is_same_realm(host, ancestor) {
            tracer.report(
                DiagnosticKind::ForeignRealm,
                ancestor,
                Some(name),
                None,
                "Cross-document ancestor left untraced",
            );
            continue;
        }
        tracer.shim_properties_of(host, ancestor, Some(name));
    }
    Ok(())
}
