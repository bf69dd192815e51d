//! Host error types

use crate::object::ObjectId;
use crate::value::Value;

/// Host operation result
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by host object operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// Type error (wrong receiver, not callable, illegal invocation, ...)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error (array lengths out of bounds)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// A value thrown by script code
    #[error("Uncaught {0:?}")]
    Thrown(Value),

    /// Handle refers to an object that has been released
    #[error("Stale object handle: {0:?}")]
    StaleHandle(ObjectId),

    /// Unknown realm identifier
    #[error("Unknown realm: {0}")]
    UnknownRealm(u32),
}

impl HostError {
    /// Shorthand for a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        HostError::TypeError(message.into())
    }

    /// The error browsers raise when a native is called on the wrong receiver
    pub fn illegal_invocation() -> Self {
        HostError::TypeError("Illegal invocation".to_string())
    }
}
