//! Object instances
//!
//! An instance pairs a shared class definition with a field vector guarded
//! by a `parking_lot::RwLock`. Field storage is behind its own `Arc` so a
//! proxy can wrap a live instance and observe and mutate the same state.
//!
//! The attachment slot is a set-once `Any` used by the proxy layer to hang
//! per-instance interceptor state off an instance while the generated class
//! stays shared across all instances with the same chain signature.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::class::{ClassDef, ClassId};
use crate::error::ObjectError;
use crate::value::Value;

/// Shared handle to an instance
pub type ObjectRef = Arc<Instance>;

/// An object of a registered class
pub struct Instance {
    class: Arc<ClassDef>,
    fields: Arc<RwLock<Vec<Value>>>,
    attachment: OnceCell<Arc<dyn Any + Send + Sync>>,
}

impl Instance {
    /// Build an instance over a prepared field vector.
    ///
    /// Low-level: callers are expected to go through
    /// [`ClassRegistry`](crate::registry::ClassRegistry), which validates
    /// the vector against the class layout.
    pub fn with_fields(class: Arc<ClassDef>, fields: Vec<Value>) -> ObjectRef {
        Arc::new(Instance {
            class,
            fields: Arc::new(RwLock::new(fields)),
            attachment: OnceCell::new(),
        })
    }

    /// Build an instance that shares another instance's field storage.
    ///
    /// Used by proxy wrapping: the proxy and the wrapped target see the
    /// same state. The caller is responsible for layout compatibility.
    pub fn sharing_fields(class: Arc<ClassDef>, target: &ObjectRef) -> ObjectRef {
        Arc::new(Instance {
            class,
            fields: Arc::clone(&target.fields),
            attachment: OnceCell::new(),
        })
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    pub fn class_id(&self) -> ClassId {
        self.class.id
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Read a property by name.
    pub fn get(&self, property: &str) -> Result<Value, ObjectError> {
        let index = self.class.property_index(property).ok_or_else(|| {
            ObjectError::UnknownProperty {
                class: self.class.name.clone(),
                property: property.to_string(),
            }
        })?;
        Ok(self.fields.read()[index].clone())
    }

    /// Write a property by name, validating the declared tag.
    pub fn set(&self, property: &str, value: Value) -> Result<(), ObjectError> {
        let index = self.class.property_index(property).ok_or_else(|| {
            ObjectError::UnknownProperty {
                class: self.class.name.clone(),
                property: property.to_string(),
            }
        })?;
        let def = &self.class.properties[index];
        if !value.matches(&def.ty) {
            return Err(ObjectError::PropertyTypeMismatch {
                class: self.class.name.clone(),
                property: def.name.clone(),
                expected: def.ty,
            });
        }
        self.fields.write()[index] = value;
        Ok(())
    }

    /// Read a property slot by layout index.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned()
    }

    /// Write a property slot by layout index without tag validation.
    ///
    /// Low-level: used by prepared copy plans that validated tags when the
    /// plan was built. Out-of-range indices are ignored and reported.
    pub fn set_index(&self, index: usize, value: Value) -> bool {
        let mut fields = self.fields.write();
        match fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Clone the whole field vector under a single read lock.
    pub fn fields_snapshot(&self) -> Vec<Value> {
        self.fields.read().clone()
    }

    /// Attach opaque per-instance state. Returns `false` when a value was
    /// already attached; the slot is set-once.
    pub fn attach(&self, state: Arc<dyn Any + Send + Sync>) -> bool {
        self.attachment.set(state).is_ok()
    }

    /// Downcast the attachment, if any.
    pub fn attachment<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.attachment
            .get()
            .and_then(|state| Arc::clone(state).downcast::<T>().ok())
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &*self.fields.read())
            .finish()
    }
}
