//! Proxy-creation error taxonomy
//!
//! All variants are `Clone`: a generation failure is published to every
//! waiter blocked on the same dispatch-cache key.

use thiserror::Error;

use veneer_core::{CallError, ClassId, ObjectError};

/// Errors surfaced by [`ProxyFactory`](crate::ProxyFactory) operations
#[derive(Debug, Error, Clone)]
pub enum ProxyError {
    /// The base class is sealed and cannot be subclassed
    #[error("class '{class}' is sealed and cannot be proxied")]
    NonExtensibleType {
        /// Base class name
        class: String,
    },

    /// No base constructor accepts the supplied arguments
    #[error("class '{class}' has no constructor compatible with {arg_count} argument(s)")]
    ConstructorMismatch {
        /// Base class name
        class: String,
        /// Arguments supplied
        arg_count: usize,
    },

    /// Subclass synthesis failed; the cache key is evicted so a later
    /// attempt may retry
    #[error("proxy generation failed for '{class}': {reason}")]
    CodeGeneration {
        /// Base class name
        class: String,
        /// Underlying reason
        reason: String,
    },

    /// No class registered under this id
    #[error("unknown class id {0}")]
    UnknownClass(ClassId),

    /// The base constructor body raised a failure
    #[error("constructor of '{class}' failed")]
    ConstructorFailed {
        /// Base class name
        class: String,
        /// Underlying failure
        #[source]
        source: CallError,
    },
}

impl ProxyError {
    /// Map instantiation failures onto the proxy taxonomy.
    pub(crate) fn from_object_error(err: ObjectError) -> Self {
        match err {
            ObjectError::ConstructorMismatch { class, arg_count } => {
                ProxyError::ConstructorMismatch { class, arg_count }
            }
            ObjectError::ConstructorFailed { class, source } => {
                ProxyError::ConstructorFailed { class, source }
            }
            ObjectError::NonExtensibleType { class } => ProxyError::NonExtensibleType { class },
            ObjectError::UnknownClass(id) => ProxyError::UnknownClass(id),
            other => ProxyError::CodeGeneration {
                class: String::new(),
                reason: other.to_string(),
            },
        }
    }
}
