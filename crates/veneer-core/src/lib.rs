//! Veneer core object model
//!
//! A small dynamic object runtime: classes are explicit runtime metadata
//! (property layouts, method tables of shared closures, constructor
//! overloads) registered into a thread-safe [`ClassRegistry`]. Instances
//! carry lock-guarded field vectors and dispatch through the registry.
//!
//! The proxy layer (`veneer-proxy`) synthesizes interception subclasses on
//! top of this model, and the copy toolkit (`veneer-copy`) builds prepared
//! property-copy plans over it.

pub mod class;
pub mod error;
pub mod instance;
pub mod registry;
pub mod value;

pub use class::{
    ClassBuilder, ClassDef, ClassId, ConstructorDef, ConstructorInit, MethodBody, MethodDef,
    MethodKind, PropertyDef, StaticBody,
};
pub use error::{CallError, ObjectError};
pub use instance::{Instance, ObjectRef};
pub use registry::ClassRegistry;
pub use value::{TypeTag, Value};
