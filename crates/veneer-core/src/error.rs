//! Error types for the object model
//!
//! Split along the two failure surfaces: `ObjectError` for class
//! registration and instantiation, `CallError` for method invocation.
//! Both are `Clone` so a failure can be published to every waiter of a
//! concurrent cache slot.

use thiserror::Error;

use crate::class::ClassId;
use crate::value::TypeTag;

/// Errors from class registration, lookup and instantiation
#[derive(Debug, Error, Clone)]
pub enum ObjectError {
    /// No class registered under this id
    #[error("unknown class id {0}")]
    UnknownClass(ClassId),

    /// Class names must be unique within a registry
    #[error("a class named '{0}' is already registered")]
    DuplicateClassName(String),

    /// A property name collides with one inherited from the parent
    #[error("class '{class}' redeclares property '{property}'")]
    DuplicateProperty {
        /// Class being registered
        class: String,
        /// Colliding property name
        property: String,
    },

    /// The parent class is sealed and cannot be extended
    #[error("class '{class}' is sealed and cannot be extended")]
    NonExtensibleType {
        /// Sealed class name
        class: String,
    },

    /// No property with this name on the class
    #[error("class '{class}' has no property '{property}'")]
    UnknownProperty {
        /// Class name
        class: String,
        /// Requested property
        property: String,
    },

    /// A value was written to a property slot of an incompatible tag
    #[error("property '{property}' on '{class}' expects {expected}, got incompatible value")]
    PropertyTypeMismatch {
        /// Class name
        class: String,
        /// Property name
        property: String,
        /// Declared property tag
        expected: TypeTag,
    },

    /// No constructor accepts the supplied arguments
    #[error("class '{class}' has no constructor compatible with {arg_count} argument(s)")]
    ConstructorMismatch {
        /// Class name
        class: String,
        /// Number of arguments supplied
        arg_count: usize,
    },

    /// A constructor body raised a failure
    #[error("constructor of '{class}' failed")]
    ConstructorFailed {
        /// Class name
        class: String,
        /// Underlying failure
        #[source]
        source: CallError,
    },

    /// A constructor produced the wrong number of field values
    #[error("class '{class}' expects {expected} field(s), constructor produced {actual}")]
    FieldCountMismatch {
        /// Class name
        class: String,
        /// Layout size
        expected: usize,
        /// Values produced
        actual: usize,
    },
}

/// Errors from invoking a method on an instance
#[derive(Debug, Error, Clone)]
pub enum CallError {
    /// Method name does not resolve anywhere on the class chain
    #[error("class '{class}' has no method '{method}'")]
    NoSuchMethod {
        /// Class name
        class: String,
        /// Method name
        method: String,
    },

    /// Wrong number of arguments
    #[error("method '{method}' on '{class}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Class name
        class: String,
        /// Method name
        method: String,
        /// Declared parameter count
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// The resolved method is an abstract declaration without a body
    #[error("method '{method}' on '{class}' is abstract")]
    AbstractMethod {
        /// Class name
        class: String,
        /// Method name
        method: String,
    },

    /// Defensive: an invocation record did not match any overridable
    /// method of the target class. Unreachable through generated dispatch.
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    /// A failure raised by a method body or interceptor. Interceptors may
    /// observe, translate or suppress these as they unwind.
    #[error("{kind}: {message}")]
    Raised {
        /// Failure kind, preserved across untranslated propagation
        kind: String,
        /// Human-readable detail
        message: String,
    },
}

impl CallError {
    /// Convenience constructor for user-raised failures.
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
