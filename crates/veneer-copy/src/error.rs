//! Copy-toolkit error taxonomy

use thiserror::Error;

use veneer_core::{ObjectError, TypeTag};

/// Errors from building or running copier plans
#[derive(Debug, Error, Clone)]
pub enum CopyError {
    /// `copy_by_class` and friends need a zero-argument constructor
    #[error("class '{class}' has no zero-argument constructor")]
    MissingDefaultConstructor {
        /// Target class name
        class: String,
    },

    /// Defensive: a planned step saw a source value that no longer matches
    /// the target tag and no converter was configured
    #[error("property '{property}' expects {expected}, source value has an incompatible tag")]
    TypeMismatch {
        /// Target property name
        property: String,
        /// Declared target tag
        expected: TypeTag,
    },

    /// Underlying object-model failure
    #[error(transparent)]
    Object(#[from] ObjectError),
}
