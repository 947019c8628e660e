//! Prepared copy plans
//!
//! A `Copier` is built once for a (source class, target class) pair and
//! then applied to any number of instance pairs. Planning resolves
//! property names to slot indices through a [`PropertySelector`], so the
//! per-copy work is index reads and writes, with optional filter and
//! converter hooks in between.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use veneer_core::{ClassId, ClassRegistry, ObjectRef, TypeTag, Value};

use crate::convert::Convert;
use crate::error::CopyError;
use crate::filter::CopyFilter;
use crate::selector::PropertySelector;

/// One planned property transfer
#[derive(Debug, Clone)]
struct CopyStep {
    source_index: usize,
    source_name: String,
    target_index: usize,
    target_name: String,
    target_ty: TypeTag,
}

/// A prepared plan for copying properties between two classes
pub struct Copier {
    source: ClassId,
    target: ClassId,
    steps: Vec<CopyStep>,
    use_filter: bool,
    use_converter: bool,
}

impl Copier {
    /// Plan the transfer between two registered classes.
    ///
    /// Target properties are paired with source properties by logical
    /// name (after applying `mapper` renames, keyed by target name).
    /// Unmatched target properties are left out of the plan. Without a
    /// converter, pairs whose tags disagree are also left out, except
    /// when the target slot accepts any value.
    pub fn create(
        registry: &ClassRegistry,
        source: ClassId,
        target: ClassId,
        use_filter: bool,
        use_converter: bool,
        mapper: &FxHashMap<String, String>,
        selector: &dyn PropertySelector,
    ) -> Result<Arc<Copier>, CopyError> {
        let source_class = registry.get(source)?;
        let target_class = registry.get(target)?;

        let source_props = selector.select(&source_class);
        let target_props = selector.select(&target_class);

        let mut steps = Vec::new();
        for t in target_props.iter() {
            let wanted = mapper.get(&t.name).map(String::as_str).unwrap_or(&t.name);
            let Some(s) = source_props.iter().find(|s| s.name == wanted) else {
                continue;
            };
            if !use_converter && s.ty != t.ty && t.ty != TypeTag::Any {
                continue;
            }
            steps.push(CopyStep {
                source_index: s.index,
                source_name: s.name.clone(),
                target_index: t.index,
                target_name: t.name.clone(),
                target_ty: t.ty,
            });
        }

        Ok(Arc::new(Copier {
            source,
            target,
            steps,
            use_filter,
            use_converter,
        }))
    }

    pub fn source_class(&self) -> ClassId {
        self.source
    }

    pub fn target_class(&self) -> ClassId {
        self.target
    }

    /// Number of planned property transfers.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Run the plan against an instance pair.
    ///
    /// The source fields are snapshotted up front, so a plan may copy an
    /// instance onto itself (or onto a proxy sharing its storage) without
    /// reading half-written state. The filter sees the target's current
    /// value at step time; a converter returning `None` skips the step.
    pub fn copy(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        filter: Option<&dyn CopyFilter>,
        converter: Option<&dyn Convert>,
    ) -> Result<(), CopyError> {
        debug_assert!(filter.is_none() || self.use_filter);
        debug_assert!(converter.is_none() || self.use_converter);

        let source_fields = source.fields_snapshot();
        for step in &self.steps {
            let Some(source_value) = source_fields.get(step.source_index) else {
                continue;
            };

            if let Some(filter) = filter {
                let target_value = target.get_index(step.target_index).unwrap_or(Value::Null);
                if !filter.accept(
                    &step.source_name,
                    source_value,
                    &step.target_name,
                    &target_value,
                ) {
                    continue;
                }
            }

            let value = match converter {
                Some(converter) => {
                    match converter.convert(source_value, &step.target_ty, &step.target_name) {
                        Some(value) => value,
                        None => continue,
                    }
                }
                None => source_value.clone(),
            };

            if !value.matches(&step.target_ty) {
                return Err(CopyError::TypeMismatch {
                    property: step.target_name.clone(),
                    expected: step.target_ty,
                });
            }
            let wrote = target.set_index(step.target_index, value);
            debug_assert!(
                wrote,
                "planned index {} outside target layout",
                step.target_index
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Copier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Copier")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("steps", &self.steps.len())
            .field("use_filter", &self.use_filter)
            .field("use_converter", &self.use_converter)
            .finish()
    }
}
