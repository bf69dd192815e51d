//! Host object model for nativetrace
//!
//! This crate provides the live object graph that the tracer instruments:
//! - **Heap**: generation-tagged object handles (`heap`, `object`)
//! - **Host**: property access, calls and construction with prototype-chain
//!   semantics, dispatched to proxy handlers where the object is a proxy (`host`)
//! - **Proxies**: the trap handler trait (`proxy`)
//! - **Realms**: one global scope per realm with its own intrinsics (`realm`)
//! - **Built-ins**: language constructors and a DOM-like document surface
//!
//! # Example
//!
//! ```rust,ignore
//! use nativetrace_host::{Host, Value};
//!
//! let host = Host::new();
//! let document = Value::Object(host.realm(host.main_realm())?.document());
//! let div = host.invoke(&document, "createElement", &[Value::string("div")])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod builtins;

/// Host and object operation errors
pub mod error;

/// Listener storage for event targets
pub mod events;

/// Object heap
pub mod heap;

/// The host environment and its object operations
pub mod host;

/// Object handles, descriptors and payloads
pub mod object;

/// Proxy trap handlers
pub mod proxy;

/// Execution realms
pub mod realm;

/// Values and property keys
pub mod value;

pub use error::{HostError, HostResult};
pub use events::{Listener, ListenerRegistry};
pub use heap::HeapStats;
pub use host::Host;
pub use object::{
    ConstructFn, FunctionBody, FunctionData, NativeFn, ObjectData, ObjectId, ObjectKind,
    PropertyDescriptor, ProxyData,
};
pub use proxy::{ForwardingHandler, ProxyHandler};
pub use realm::{Realm, RealmId};
pub use value::{number_to_string, PropertyKey, Symbol, Value};
