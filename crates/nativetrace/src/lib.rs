//! Transparent call tracing for host objects
//!
//! A [`TraceSession`] instruments one realm of a [`nativetrace_host::Host`]
//! so that property reads, property writes, calls and constructions on
//! native objects are recorded as short labels, while instrumented objects
//! keep behaving exactly like the originals:
//! - **Wrapping**: native objects reached from the document or the global are
//!   replaced by proxies whose traps log and then forward (`proxy`)
//! - **Shimming**: objects that cannot be replaced (prototypes, the global,
//!   the document) get traced accessors and wrapped values in place (`shim`)
//! - **Identity**: every wrapper maps back to its original ([`registry`])
//! - **Classification**: only native objects are traced ([`classify`])
//! - **Exclusions**: fundamentals the tracer depends on are never touched
//!   ([`exclusion`])
//! - **Listeners**: callbacks registered on event targets receive wrapped
//!   arguments (`listeners`)
//!
//! Coverage gaps are collected as [`Diagnostic`]s and emitted through
//! `tracing`.
//!
//! # Example
//!
//! ```rust,ignore
//! use nativetrace::{TraceConfig, TraceSession};
//! use nativetrace_host::{Host, Value};
//!
//! let host = Host::new();
//! let session = TraceSession::install(&host, host.main_realm(), &TraceConfig::default())?;
//! let global = host.realm(host.main_realm())?.global();
//! let document = host.get(global, &"document".into())?;
//! let div = host.invoke(&document, "createElement", &[Value::string("div")])?;
//! host.set(div.as_object().unwrap(), &"innerHTML".into(), Value::string("<b>hi</b>"))?;
//! println!("{:?}", session.log());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Native callable and native object detection
pub mod classify;

/// Session configuration
pub mod config;

/// Type names, key labels and descriptor lookup
pub mod describe;

/// Coverage-gap reports
pub mod diagnostics;

/// Tracer error types
pub mod error;

/// Objects the tracer must never touch
pub mod exclusion;

/// Log sinks and label normalisation
pub mod logger;

/// Original / wrapper bookkeeping
pub mod registry;

/// Session bootstrap and the host-facing handle
pub mod session;

mod listeners;
mod proxy;
mod shim;
mod tracer;

pub use classify::{is_native_source, NativeClassifier};
pub use config::TraceConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{TraceError, TraceResult};
pub use exclusion::ExclusionPolicy;
pub use logger::{strip_marker, LogSink, MemorySink, Normalizer, TraceLog};
pub use registry::{IdentityRegistry, RecordId, WrapperRecord};
pub use session::{SweepReport, TraceSession};
