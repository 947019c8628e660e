//! Immutable records of intercepted invocations
//!
//! One [`CallDescriptor`] is created per intercepted method call and
//! dropped when the interceptor chain completes. The target is held
//! weakly: the descriptor never keeps an instance alive.

use std::sync::{Arc, Weak};

use veneer_core::{
    CallError, ClassId, ClassRegistry, Instance, MethodKind, ObjectRef, TypeTag, Value,
};

/// Identity of a method: name, declaring class and parameter tags
#[derive(Debug, Clone)]
pub struct MethodIdentity {
    pub name: String,
    pub declaring_class: ClassId,
    pub params: Arc<[TypeTag]>,
}

/// Read-only record of a single intercepted invocation
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    target: Weak<Instance>,
    method: Arc<MethodIdentity>,
    args: Vec<Value>,
}

impl CallDescriptor {
    /// Build a descriptor, validating that the named method resolves to an
    /// overridable (virtual) method of the class with a matching argument
    /// count. Generated dispatch never trips this check; it exists for
    /// descriptors constructed by hand.
    pub fn new(
        registry: &ClassRegistry,
        class: ClassId,
        target: &ObjectRef,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Self, CallError> {
        let (declaring, def) = registry.resolve_method(class, name).map_err(|_| {
            CallError::InvalidInvocation(format!(
                "'{name}' does not resolve to a method of class {class}"
            ))
        })?;
        if def.kind != MethodKind::Virtual {
            return Err(CallError::InvalidInvocation(format!(
                "method '{name}' on '{}' is not overridable",
                declaring.name
            )));
        }
        if args.len() != def.params.len() {
            return Err(CallError::InvalidInvocation(format!(
                "method '{name}' expects {} argument(s), got {}",
                def.params.len(),
                args.len()
            )));
        }
        Ok(Self::from_identity(
            Arc::new(MethodIdentity {
                name: def.name.clone(),
                declaring_class: declaring.id,
                params: def.params.clone().into(),
            }),
            Arc::downgrade(target),
            args,
        ))
    }

    /// Assemble from pre-validated parts (generated dispatch path).
    pub(crate) fn from_identity(
        method: Arc<MethodIdentity>,
        target: Weak<Instance>,
        args: Vec<Value>,
    ) -> Self {
        CallDescriptor {
            target,
            method,
            args,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method.name
    }

    /// The class that declared the intercepted method (the base or one of
    /// its ancestors, never the generated proxy class).
    pub fn declaring_class(&self) -> ClassId {
        self.method.declaring_class
    }

    pub fn param_types(&self) -> &[TypeTag] {
        &self.method.params
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Upgrade the weak target reference. `None` once the proxy instance
    /// has been dropped.
    pub fn target(&self) -> Option<ObjectRef> {
        self.target.upgrade()
    }
}
