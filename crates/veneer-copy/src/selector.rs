//! Property selection
//!
//! A selector decides which properties of a class take part in copying
//! and under what logical name they match across classes. The standard
//! selector exposes every property under its declared name; the prefixed
//! selector strips a naming prefix (`mName` -> `name`) so differently
//! styled classes can still pair up.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use veneer_core::{ClassDef, ClassId, TypeTag};

/// A property as seen by the copy planner
#[derive(Debug, Clone)]
pub struct SelectedProperty {
    /// Slot index in the class layout
    pub index: usize,
    /// Logical name used to match source and target properties
    pub name: String,
    /// Declared tag of the slot
    pub ty: TypeTag,
}

/// Choose and rename the properties of a class for copying
pub trait PropertySelector: Send + Sync {
    fn select(&self, class: &Arc<ClassDef>) -> Arc<[SelectedProperty]>;
}

/// Every property, under its declared name
pub struct StandardSelector;

impl PropertySelector for StandardSelector {
    fn select(&self, class: &Arc<ClassDef>) -> Arc<[SelectedProperty]> {
        class
            .properties
            .iter()
            .enumerate()
            .map(|(index, p)| SelectedProperty {
                index,
                name: p.name.clone(),
                ty: p.ty,
            })
            .collect()
    }
}

/// Strips a naming prefix and lowercases the first remaining character,
/// so `mUserName` is selected as `userName`. Properties without the
/// prefix keep their declared name. Selections are memoized per class.
pub struct PrefixedSelector {
    prefix: String,
    cache: DashMap<ClassId, Arc<[SelectedProperty]>>,
}

impl PrefixedSelector {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrefixedSelector {
            prefix: prefix.into(),
            cache: DashMap::new(),
        }
    }

    fn logical_name(&self, declared: &str) -> String {
        match declared.strip_prefix(&self.prefix) {
            Some(rest) if !rest.is_empty() => {
                let mut chars = rest.chars();
                let head = chars.next().unwrap_or_default();
                head.to_lowercase().chain(chars).collect()
            }
            _ => declared.to_string(),
        }
    }
}

impl PropertySelector for PrefixedSelector {
    fn select(&self, class: &Arc<ClassDef>) -> Arc<[SelectedProperty]> {
        if let Some(cached) = self.cache.get(&class.id) {
            return Arc::clone(&cached);
        }
        let selected: Arc<[SelectedProperty]> = class
            .properties
            .iter()
            .enumerate()
            .map(|(index, p)| SelectedProperty {
                index,
                name: self.logical_name(&p.name),
                ty: p.ty,
            })
            .collect();
        self.cache.insert(class.id, Arc::clone(&selected));
        selected
    }
}

static DEFAULT_SELECTOR: Lazy<RwLock<Arc<dyn PropertySelector>>> =
    Lazy::new(|| RwLock::new(Arc::new(StandardSelector)));

/// The process-wide selector new engines start from.
pub fn default_selector() -> Arc<dyn PropertySelector> {
    Arc::clone(&DEFAULT_SELECTOR.read())
}

/// Replace the process-wide default selector. Engines created afterwards
/// pick it up; existing engines are unaffected.
pub fn set_default_selector(selector: Arc<dyn PropertySelector>) {
    *DEFAULT_SELECTOR.write() = selector;
}
