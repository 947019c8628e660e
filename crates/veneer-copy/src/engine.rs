//! Copy engine: cached plans and one-call conveniences
//!
//! The engine owns a concurrent cache of prepared [`Copier`] plans keyed
//! by the full plan shape (class pair, filter/converter participation and
//! the rename map), so structurally different requests can never collide
//! on a cache slot. On top of the cache it offers the common one-call
//! operations: copy into an existing instance, copy into a fresh
//! instance, list variants, null-skipping and converting variants, and
//! the dynamic helpers `set_value` and `add_properties`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use veneer_core::{ClassBuilder, ClassId, ClassRegistry, ObjectRef, TypeTag, Value};

use crate::convert::{Convert, SmartConvert};
use crate::copier::Copier;
use crate::error::CopyError;
use crate::filter::{CopyFilter, IgnoreNull, IgnoreProperties};
use crate::selector::{default_selector, PropertySelector};

/// Full structural identity of a prepared plan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CopierKey {
    source: ClassId,
    target: ClassId,
    use_filter: bool,
    use_converter: bool,
    /// Rename pairs in sorted order, so equal maps produce equal keys
    mapper: Vec<(String, String)>,
}

impl CopierKey {
    fn new(
        source: ClassId,
        target: ClassId,
        use_filter: bool,
        use_converter: bool,
        mapper: &FxHashMap<String, String>,
    ) -> Self {
        let mut pairs: Vec<(String, String)> = mapper
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        CopierKey {
            source,
            target,
            use_filter,
            use_converter,
            mapper: pairs,
        }
    }
}

/// Facade over plan creation, caching and execution
pub struct CopyEngine {
    registry: Arc<ClassRegistry>,
    copiers: DashMap<CopierKey, Arc<Copier>>,
    selector: RwLock<Arc<dyn PropertySelector>>,
    ext_seq: AtomicU64,
}

impl CopyEngine {
    /// Build an engine over a registry, starting from the process-wide
    /// default selector.
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        CopyEngine {
            registry,
            copiers: DashMap::new(),
            selector: RwLock::new(default_selector()),
            ext_seq: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Replace this engine's selector. Cached plans built under the old
    /// selector are discarded. The cache is cleared under the selector
    /// write lock, and plan insertion holds the read lock, so a plan built
    /// under the old selector can never outlive the swap.
    pub fn set_selector(&self, selector: Arc<dyn PropertySelector>) {
        let mut current = self.selector.write();
        *current = selector;
        self.copiers.clear();
    }

    /// Number of cached plans.
    pub fn cached_copiers(&self) -> usize {
        self.copiers.len()
    }

    /// Start describing a plan explicitly.
    pub fn copier(&self, source: ClassId, target: ClassId) -> CopierBuilder<'_> {
        CopierBuilder {
            engine: self,
            source,
            target,
            use_filter: false,
            use_converter: false,
            mapper: FxHashMap::default(),
            selector: None,
        }
    }

    fn cached_copier(
        &self,
        source: ClassId,
        target: ClassId,
        use_filter: bool,
        use_converter: bool,
        mapper: &FxHashMap<String, String>,
    ) -> Result<Arc<Copier>, CopyError> {
        let key = CopierKey::new(source, target, use_filter, use_converter, mapper);
        if let Some(copier) = self.copiers.get(&key) {
            return Ok(Arc::clone(&copier));
        }
        // Held across the insert: a concurrent selector swap (write lock)
        // cannot interleave between plan creation and publication, so the
        // swap's cache clear always covers this plan if it came first.
        let selector = self.selector.read();
        let copier = Copier::create(
            &self.registry,
            source,
            target,
            use_filter,
            use_converter,
            mapper,
            selector.as_ref(),
        )?;
        Ok(Arc::clone(
            self.copiers.entry(key).or_insert(copier).value(),
        ))
    }

    /// Copy all matching properties from `source` into `target`.
    pub fn copy(&self, source: &ObjectRef, target: &ObjectRef) -> Result<(), CopyError> {
        let copier = self.cached_copier(
            source.class_id(),
            target.class_id(),
            false,
            false,
            &FxHashMap::default(),
        )?;
        copier.copy(source, target, None, None)
    }

    /// Copy with an explicit filter and/or converter.
    pub fn copy_with(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        filter: Option<&dyn CopyFilter>,
        converter: Option<&dyn Convert>,
    ) -> Result<(), CopyError> {
        let copier = self.cached_copier(
            source.class_id(),
            target.class_id(),
            filter.is_some(),
            converter.is_some(),
            &FxHashMap::default(),
        )?;
        copier.copy(source, target, filter, converter)
    }

    /// Copy into a fresh instance of `target`, which must have a
    /// zero-argument constructor.
    pub fn copy_by_class(
        &self,
        source: &ObjectRef,
        target: ClassId,
    ) -> Result<ObjectRef, CopyError> {
        let instance = self.new_instance(target)?;
        self.copy(source, &instance)?;
        Ok(instance)
    }

    /// Copy each source into its own fresh instance of `target`.
    pub fn copy_list_by_class(
        &self,
        sources: &[ObjectRef],
        target: ClassId,
    ) -> Result<Vec<ObjectRef>, CopyError> {
        sources
            .iter()
            .map(|source| self.copy_by_class(source, target))
            .collect()
    }

    /// Copy, skipping null source values.
    pub fn copy_ignore_null(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
    ) -> Result<(), CopyError> {
        self.copy_with(source, target, Some(&IgnoreNull), None)
    }

    /// Copy, skipping the named source properties.
    pub fn copy_ignore_properties(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        ignored: &[&str],
    ) -> Result<(), CopyError> {
        let filter = IgnoreProperties::new(ignored.iter().copied());
        self.copy_with(source, target, Some(&filter), None)
    }

    /// Copy through an explicit converter.
    pub fn copy_convert(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        converter: &dyn Convert,
    ) -> Result<(), CopyError> {
        self.copy_with(source, target, None, Some(converter))
    }

    /// Copy with null-skipping and best-effort tag coercion.
    pub fn smart_copy(&self, source: &ObjectRef, target: &ObjectRef) -> Result<(), CopyError> {
        self.copy_with(source, target, Some(&IgnoreNull), Some(&SmartConvert))
    }

    /// Smart-copy into a fresh instance of `target`.
    pub fn smart_copy_by_class(
        &self,
        source: &ObjectRef,
        target: ClassId,
    ) -> Result<ObjectRef, CopyError> {
        let instance = self.new_instance(target)?;
        self.smart_copy(source, &instance)?;
        Ok(instance)
    }

    /// Smart-copy each source into its own fresh instance of `target`.
    pub fn smart_copy_list(
        &self,
        sources: &[ObjectRef],
        target: ClassId,
    ) -> Result<Vec<ObjectRef>, CopyError> {
        sources
            .iter()
            .map(|source| self.smart_copy_by_class(source, target))
            .collect()
    }

    /// Construct an instance through the zero-argument constructor.
    pub fn new_instance(&self, class: ClassId) -> Result<ObjectRef, CopyError> {
        let def = self.registry.get(class)?;
        if !def.constructors.iter().any(|c| c.params.is_empty()) {
            return Err(CopyError::MissingDefaultConstructor {
                class: def.name.clone(),
            });
        }
        Ok(self.registry.instantiate_class(&def, &[])?)
    }

    /// Write named values onto an instance, skipping unknown properties
    /// and tag mismatches. Returns how many writes were applied.
    pub fn set_value(&self, target: &ObjectRef, values: &[(&str, Value)]) -> usize {
        let mut applied = 0;
        for (name, value) in values {
            if target.set(name, value.clone()).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Rebuild `source` as an instance of a synthesized subclass carrying
    /// extra properties. The original fields are carried over; each extra
    /// value must match its declared tag.
    pub fn add_properties(
        &self,
        source: &ObjectRef,
        extras: &[(&str, TypeTag, Value)],
    ) -> Result<ObjectRef, CopyError> {
        let base = source.class();
        let seq = self.ext_seq.fetch_add(1, Ordering::Relaxed);
        let mut builder =
            ClassBuilder::new(format!("{}$ext{}", base.name, seq)).parent(base.id);
        for (name, ty, _) in extras {
            builder = builder.property(name.to_string(), *ty);
        }
        let id = self.registry.register(builder)?;
        let class = self.registry.get(id)?;

        let mut fields = source.fields_snapshot();
        fields.extend(extras.iter().map(|(_, _, value)| value.clone()));
        Ok(self.registry.instantiate_with_fields(&class, fields)?)
    }
}

impl std::fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyEngine")
            .field("cached_copiers", &self.copiers.len())
            .finish()
    }
}

/// Explicit plan description, mirroring the engine's cache key
pub struct CopierBuilder<'e> {
    engine: &'e CopyEngine,
    source: ClassId,
    target: ClassId,
    use_filter: bool,
    use_converter: bool,
    mapper: FxHashMap<String, String>,
    selector: Option<Arc<dyn PropertySelector>>,
}

impl CopierBuilder<'_> {
    /// Plan for use with a filter.
    pub fn filter(mut self, use_filter: bool) -> Self {
        self.use_filter = use_filter;
        self
    }

    /// Plan for use with a converter (keeps tag-mismatched pairs).
    pub fn converter(mut self, use_converter: bool) -> Self {
        self.use_converter = use_converter;
        self
    }

    /// Replace the rename map wholesale. Keys are target names, values
    /// the source names they read from.
    pub fn mapper(mut self, mapper: FxHashMap<String, String>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Read the target property `target_attr` from source property
    /// `source_attr`.
    pub fn append(mut self, source_attr: impl Into<String>, target_attr: impl Into<String>) -> Self {
        self.mapper.insert(target_attr.into(), source_attr.into());
        self
    }

    /// Plan with a one-off selector instead of the engine's. Such plans
    /// bypass the cache.
    pub fn selector(mut self, selector: Arc<dyn PropertySelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<Arc<Copier>, CopyError> {
        match self.selector {
            Some(selector) => Copier::create(
                &self.engine.registry,
                self.source,
                self.target,
                self.use_filter,
                self.use_converter,
                &self.mapper,
                selector.as_ref(),
            ),
            None => self.engine.cached_copier(
                self.source,
                self.target,
                self.use_filter,
                self.use_converter,
                &self.mapper,
            ),
        }
    }
}
