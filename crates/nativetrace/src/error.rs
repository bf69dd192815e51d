//! Tracer error types
//!
//! Only bootstrap and configuration can fail. Instrumentation failures inside
//! traps and shims are swallowed where they happen and never reach the
//! instrumented code.

use nativetrace_host::HostError;
use thiserror::Error;

/// Tracer result type
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised while installing a trace session
#[derive(Debug, Error)]
pub enum TraceError {
    /// A host operation failed during bootstrap
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// The configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configured exclusion path does not resolve to an object
    #[error("exclusion path does not resolve to an object: {0}")]
    UnresolvedPath(String),

    /// The realm lacks an intrinsic the tracer relies on
    #[error("missing intrinsic: {0}")]
    MissingIntrinsic(String),
}
