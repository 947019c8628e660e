//! Class registry: registration, resolution and dispatch
//!
//! The registry is the process-wide home of class definitions. Definitions
//! are immutable once registered and never unloaded; ids are assigned in
//! registration order. All operations are safe under concurrent access —
//! the inner state sits behind a `parking_lot::RwLock`, and resolution
//! returns shared handles so no lock is held while a method body runs.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{ClassBuilder, ClassDef, ClassId, MethodDef, StaticBody};
use crate::error::{CallError, ObjectError};
use crate::instance::{Instance, ObjectRef};
use crate::value::Value;

#[derive(Default)]
struct Inner {
    classes: Vec<Arc<ClassDef>>,
    name_to_id: FxHashMap<String, ClassId>,
}

/// Thread-safe registry of class definitions
#[derive(Default)]
pub struct ClassRegistry {
    inner: RwLock<Inner>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class assembled by a [`ClassBuilder`].
    ///
    /// Composes the final property layout (parent layout first), validates
    /// name uniqueness and parent extensibility, and assigns the id.
    pub fn register(&self, builder: ClassBuilder) -> Result<ClassId, ObjectError> {
        let mut inner = self.inner.write();

        if inner.name_to_id.contains_key(&builder.name) {
            return Err(ObjectError::DuplicateClassName(builder.name));
        }

        let mut properties = Vec::new();
        if let Some(parent_id) = builder.parent {
            let parent = inner
                .classes
                .get(parent_id.index())
                .ok_or(ObjectError::UnknownClass(parent_id))?;
            if parent.sealed {
                return Err(ObjectError::NonExtensibleType {
                    class: parent.name.clone(),
                });
            }
            properties.extend(parent.properties.iter().cloned());
        }
        for prop in &builder.properties {
            if properties.iter().any(|p| p.name == prop.name) {
                return Err(ObjectError::DuplicateProperty {
                    class: builder.name,
                    property: prop.name.clone(),
                });
            }
            properties.push(prop.clone());
        }

        let mut methods = FxHashMap::default();
        for method in builder.methods {
            methods.insert(method.name.clone(), method);
        }
        let mut statics = FxHashMap::default();
        for (name, body) in builder.statics {
            statics.insert(name, body);
        }

        let id = ClassId(inner.classes.len());
        let def = Arc::new(ClassDef {
            id,
            name: builder.name.clone(),
            parent: builder.parent,
            sealed: builder.sealed,
            properties,
            methods,
            constructors: builder.constructors,
            statics,
        });
        inner.classes.push(def);
        inner.name_to_id.insert(builder.name, id);
        Ok(id)
    }

    /// Fetch a class definition by id.
    pub fn get(&self, id: ClassId) -> Result<Arc<ClassDef>, ObjectError> {
        self.inner
            .read()
            .classes
            .get(id.index())
            .cloned()
            .ok_or(ObjectError::UnknownClass(id))
    }

    /// Fetch a class definition by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<ClassDef>> {
        let inner = self.inner.read();
        let id = inner.name_to_id.get(name)?;
        inner.classes.get(id.index()).cloned()
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.inner.read().classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `child` is `ancestor` or descends from it.
    pub fn is_subclass_of(&self, child: ClassId, ancestor: ClassId) -> bool {
        let inner = self.inner.read();
        let mut current = Some(child);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = inner.classes.get(id.index()).and_then(|c| c.parent);
        }
        false
    }

    /// Resolve a method by walking the parent chain; the nearest definition
    /// wins. Returns the declaring class along with the definition.
    pub fn resolve_method(
        &self,
        class: ClassId,
        name: &str,
    ) -> Result<(Arc<ClassDef>, Arc<MethodDef>), CallError> {
        let inner = self.inner.read();
        let start = inner
            .classes
            .get(class.index())
            .ok_or_else(|| CallError::InvalidInvocation(format!("unknown class id {class}")))?;

        let mut current = Some(Arc::clone(start));
        while let Some(def) = current {
            if let Some(method) = def.methods.get(name) {
                return Ok((Arc::clone(&def), Arc::clone(method)));
            }
            current = def
                .parent
                .and_then(|id| inner.classes.get(id.index()).cloned());
        }
        Err(CallError::NoSuchMethod {
            class: start.name.clone(),
            method: name.to_string(),
        })
    }

    /// Resolve a receiver-less class function by walking the parent chain.
    pub fn resolve_static(&self, class: ClassId, name: &str) -> Result<StaticBody, CallError> {
        let inner = self.inner.read();
        let start = inner
            .classes
            .get(class.index())
            .ok_or_else(|| CallError::InvalidInvocation(format!("unknown class id {class}")))?;

        let mut current = Some(Arc::clone(start));
        while let Some(def) = current {
            if let Some(body) = def.statics.get(name) {
                return Ok(Arc::clone(body));
            }
            current = def
                .parent
                .and_then(|id| inner.classes.get(id.index()).cloned());
        }
        Err(CallError::NoSuchMethod {
            class: start.name.clone(),
            method: name.to_string(),
        })
    }

    /// Invoke a method on an instance. No registry lock is held while the
    /// body runs, so bodies may re-enter the registry freely.
    pub fn invoke(
        &self,
        target: &ObjectRef,
        method: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let (declaring, def) = self.resolve_method(target.class_id(), method)?;
        if args.len() != def.params.len() {
            return Err(CallError::ArityMismatch {
                class: target.class_name().to_string(),
                method: method.to_string(),
                expected: def.params.len(),
                actual: args.len(),
            });
        }
        match &def.body {
            Some(body) => body(target, args),
            None => Err(CallError::AbstractMethod {
                class: declaring.name.clone(),
                method: method.to_string(),
            }),
        }
    }

    /// Invoke a receiver-less class function.
    pub fn invoke_static(
        &self,
        class: ClassId,
        name: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let body = self.resolve_static(class, name)?;
        body(args)
    }

    /// Construct an instance, selecting a constructor overload by argument
    /// count and tags.
    pub fn instantiate(&self, id: ClassId, args: &[Value]) -> Result<ObjectRef, ObjectError> {
        let class = self.get(id)?;
        self.instantiate_class(&class, args)
    }

    /// Construct an instance of an already-resolved class definition.
    pub fn instantiate_class(
        &self,
        class: &Arc<ClassDef>,
        args: &[Value],
    ) -> Result<ObjectRef, ObjectError> {
        let ctor = class
            .constructors
            .iter()
            .find(|c| c.accepts(args))
            .ok_or_else(|| ObjectError::ConstructorMismatch {
                class: class.name.clone(),
                arg_count: args.len(),
            })?;
        let fields = (ctor.init)(args).map_err(|source| ObjectError::ConstructorFailed {
            class: class.name.clone(),
            source,
        })?;
        self.instantiate_with_fields(class, fields)
    }

    /// Construct an instance over an explicit field vector, validating it
    /// against the class layout.
    pub fn instantiate_with_fields(
        &self,
        class: &Arc<ClassDef>,
        fields: Vec<Value>,
    ) -> Result<ObjectRef, ObjectError> {
        if fields.len() != class.properties.len() {
            return Err(ObjectError::FieldCountMismatch {
                class: class.name.clone(),
                expected: class.properties.len(),
                actual: fields.len(),
            });
        }
        for (value, prop) in fields.iter().zip(&class.properties) {
            if !value.matches(&prop.ty) {
                return Err(ObjectError::PropertyTypeMismatch {
                    class: class.name.clone(),
                    property: prop.name.clone(),
                    expected: prop.ty,
                });
            }
        }
        Ok(Instance::with_fields(Arc::clone(class), fields))
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.len())
            .finish()
    }
}
