//! Shared tracer state
//!
//! One [`Tracer`] per session holds every table the instrumentation consults.
//! Its behaviour is split by concern across `proxy` (wrapping and the four
//! traps), `shim` (in-place accessor rewriting) and `listeners` (callback
//! boxing), each adding an `impl Tracer` block.
//!
//! Everything the tracer installs into the host (the proxy handler, shim
//! accessors, replaced built-ins) reaches back through a `Weak<Tracer>`. Once
//! the session is dropped those entry points forward to the original
//! behaviour untouched.

use crate::classify::NativeClassifier;
use crate::describe;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::exclusion::ExclusionPolicy;
use crate::logger::TraceLog;
use crate::proxy::TraceHandler;
use crate::registry::IdentityRegistry;
use nativetrace_host::{Host, ObjectId, PropertyKey, RealmId, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Well-known objects of the traced realm
#[derive(Debug, Clone, Copy)]
pub(crate) struct RealmObjects {
    pub(crate) realm: RealmId,
    pub(crate) global: ObjectId,
    pub(crate) document: ObjectId,
    pub(crate) function_proto: ObjectId,
    pub(crate) object_ctor: ObjectId,
}

pub(crate) struct Tracer {
    pub(crate) objects: RealmObjects,
    pub(crate) export_name: Option<String>,
    pub(crate) registry: RefCell<IdentityRegistry>,
    pub(crate) classifier: NativeClassifier,
    pub(crate) exclusions: ExclusionPolicy,
    pub(crate) log: TraceLog,
    pub(crate) diagnostics: Diagnostics,
    /// Original callback -> boxed listener registered in its place
    pub(crate) listener_boxes: Rc<RefCell<FxHashMap<ObjectId, ObjectId>>>,
    pub(crate) me: Weak<Tracer>,
    pub(crate) handler: Rc<TraceHandler>,
}

impl Tracer {
    pub(crate) fn new(
        objects: RealmObjects,
        exclusions: ExclusionPolicy,
        log: TraceLog,
        export_name: Option<String>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Tracer>| Tracer {
            objects,
            export_name,
            registry: RefCell::new(IdentityRegistry::new()),
            classifier: NativeClassifier::new(),
            exclusions,
            log,
            diagnostics: Diagnostics::new(),
            listener_boxes: Rc::new(RefCell::new(FxHashMap::default())),
            me: me.clone(),
            handler: Rc::new(TraceHandler::new(me.clone())),
        })
    }

    pub(crate) fn realm(&self) -> RealmId {
        self.objects.realm
    }

    pub(crate) fn unwrap(&self, value: &Value) -> Value {
        self.registry.borrow().unwrap(value)
    }

    pub(crate) fn is_tracked(&self, value: &Value) -> bool {
        self.registry.borrow().is_tracked(value)
    }

    /// Name recorded for a wrapper or an original
    pub(crate) fn name_of(&self, id: ObjectId) -> Option<String> {
        self.registry
            .borrow()
            .record_for(id)
            .and_then(|record| record.name.clone())
    }

    /// Name recorded for a wrapper or in-place shimmed object only
    pub(crate) fn wrapper_name(&self, id: ObjectId) -> Option<String> {
        self.registry
            .borrow()
            .record_for_wrapper(id)
            .and_then(|record| record.name.clone())
    }

    pub(crate) fn is_native_fn(&self, host: &Host, value: &Value) -> bool {
        self.classifier.is_native_callable(host, value)
    }

    pub(crate) fn is_native_object(&self, host: &Host, value: &Value) -> bool {
        let registry = self.registry.borrow();
        self.classifier
            .is_native_object(host, &registry, value, self.objects.object_ctor)
    }

    pub(crate) fn is_same_realm(&self, host: &Host, id: ObjectId) -> bool {
        host.realm_of(id) == Some(self.objects.realm)
    }

    /// `"<label>(<argtype>,...)"`
    pub(crate) fn signature(&self, host: &Host, label: &str, args: &[Value]) -> String {
        let types: Vec<String> = args.iter().map(|arg| describe::type_name(host, arg)).collect();
        format!("{}({})", label, types.join(","))
    }

    pub(crate) fn record(&self, label: &str) {
        self.log.record(label);
    }

    pub(crate) fn report(
        &self,
        kind: DiagnosticKind,
        object: ObjectId,
        name: Option<&str>,
        key: Option<&PropertyKey>,
        message: impl Into<String>,
    ) {
        let name = name.map(str::to_string).or_else(|| self.name_of(object));
        self.diagnostics.report(Diagnostic {
            kind,
            object,
            name,
            key: key.map(|k| k.to_string()),
            message: message.into(),
        });
    }
}
