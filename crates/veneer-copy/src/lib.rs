//! Property-copy toolkit for the Veneer object model
//!
//! Copying is split into planning and execution. A [`Copier`] is planned
//! once per (source class, target class) pair by pairing properties
//! through a [`PropertySelector`], then applied to any number of
//! instances. [`CopyFilter`]s gate individual property writes,
//! [`Convert`]ers adapt values across tags, and the [`CopyEngine`] caches
//! plans and exposes the one-call conveniences on top.

mod convert;
mod copier;
mod engine;
mod error;
mod filter;
mod selector;

pub use convert::{Convert, SmartConvert};
pub use copier::Copier;
pub use engine::{CopierBuilder, CopyEngine};
pub use error::CopyError;
pub use filter::{
    And, CopyFilter, IfAbsent, IgnoreNull, IgnoreProperties, Negate, Or, Overwrite,
};
pub use selector::{
    default_selector, set_default_selector, PrefixedSelector, PropertySelector,
    SelectedProperty, StandardSelector,
};
