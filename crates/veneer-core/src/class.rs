//! Runtime class metadata
//!
//! A class is an immutable definition registered once into a
//! [`ClassRegistry`](crate::registry::ClassRegistry): a property layout,
//! a table of method definitions, constructor overloads and receiver-less
//! static functions. Method bodies are shared closures, so a synthesized
//! subclass (a proxy) can wrap a parent's body without copying it.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::CallError;
use crate::instance::ObjectRef;
use crate::value::{TypeTag, Value};

/// Identity of a registered class, assigned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed property slot
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeTag,
}

/// Whether a method participates in override-based dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Overridable; rewritten by proxy generation
    Virtual,
    /// Never overridden, never intercepted
    Final,
}

/// Shared method body: receiver plus argument slice
pub type MethodBody =
    Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<Value, CallError> + Send + Sync>;

/// Receiver-less class function
pub type StaticBody = Arc<dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync>;

/// Constructor initializer: arguments in, full field vector out
pub type ConstructorInit =
    Arc<dyn Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync>;

/// A method declared on a class
pub struct MethodDef {
    pub name: String,
    pub params: Vec<TypeTag>,
    pub kind: MethodKind,
    /// `None` marks an abstract declaration
    pub body: Option<MethodBody>,
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("kind", &self.kind)
            .field("abstract", &self.body.is_none())
            .finish()
    }
}

/// A constructor overload
pub struct ConstructorDef {
    pub params: Vec<TypeTag>,
    /// Produces field values for the class's full layout
    pub init: ConstructorInit,
}

impl ConstructorDef {
    /// Whether the supplied arguments select this overload.
    pub fn accepts(&self, args: &[Value]) -> bool {
        args.len() == self.params.len()
            && args.iter().zip(&self.params).all(|(v, t)| v.matches(t))
    }
}

impl fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDef")
            .field("params", &self.params)
            .finish()
    }
}

/// An immutable registered class definition
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    /// Sealed classes cannot be subclassed or proxied
    pub sealed: bool,
    /// Full layout: inherited properties first, own properties after
    pub properties: Vec<PropertyDef>,
    /// Methods declared on this class (resolution walks the parent chain)
    pub methods: FxHashMap<String, Arc<MethodDef>>,
    pub constructors: Vec<Arc<ConstructorDef>>,
    pub statics: FxHashMap<String, StaticBody>,
}

impl ClassDef {
    /// Index of a property in the layout.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// A method declared directly on this class.
    pub fn declared_method(&self, name: &str) -> Option<&Arc<MethodDef>> {
        self.methods.get(name)
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("sealed", &self.sealed)
            .field("properties", &self.properties)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent assembly of a class definition
///
/// ```ignore
/// let point = ClassBuilder::new("Point")
///     .property("x", TypeTag::Int)
///     .property("y", TypeTag::Int)
///     .constructor(&[TypeTag::Int, TypeTag::Int], |args| {
///         Ok(vec![args[0].clone(), args[1].clone()])
///     })
///     .method("sum", &[], |this, _| {
///         let x = this.get("x")?;
///         let y = this.get("y")?;
///         Ok(Value::Int(x.as_int().unwrap_or(0) + y.as_int().unwrap_or(0)))
///     })
///     .register(&registry)?;
/// ```
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) parent: Option<ClassId>,
    pub(crate) sealed: bool,
    pub(crate) properties: Vec<PropertyDef>,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) constructors: Vec<Arc<ConstructorDef>>,
    pub(crate) statics: Vec<(String, StaticBody)>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            name: name.into(),
            parent: None,
            sealed: false,
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            statics: Vec::new(),
        }
    }

    /// Extend another registered class.
    pub fn parent(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Forbid subclassing (and therefore proxying).
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn property(mut self, name: impl Into<String>, ty: TypeTag) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn constructor<F>(mut self, params: &[TypeTag], init: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync + 'static,
    {
        self.constructors.push(Arc::new(ConstructorDef {
            params: params.to_vec(),
            init: Arc::new(init),
        }));
        self
    }

    /// Share an existing constructor overload (used when a subclass keeps
    /// its parent's layout).
    pub fn inherit_constructor(mut self, ctor: Arc<ConstructorDef>) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Declare an overridable method.
    pub fn method<F>(self, name: impl Into<String>, params: &[TypeTag], body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.push_method(name, params, MethodKind::Virtual, Some(Arc::new(body)))
    }

    /// Declare a method that is never overridden or intercepted.
    pub fn final_method<F>(self, name: impl Into<String>, params: &[TypeTag], body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.push_method(name, params, MethodKind::Final, Some(Arc::new(body)))
    }

    /// Declare a method without a body.
    pub fn abstract_method(self, name: impl Into<String>, params: &[TypeTag]) -> Self {
        self.push_method(name, params, MethodKind::Virtual, None)
    }

    /// Add a prebuilt method definition (used by proxy generation).
    pub fn define(mut self, def: MethodDef) -> Self {
        self.methods.push(Arc::new(def));
        self
    }

    /// Declare a receiver-less class function.
    pub fn static_fn<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.statics.push((name.into(), Arc::new(body)));
        self
    }

    fn push_method(
        mut self,
        name: impl Into<String>,
        params: &[TypeTag],
        kind: MethodKind,
        body: Option<MethodBody>,
    ) -> Self {
        self.methods.push(Arc::new(MethodDef {
            name: name.into(),
            params: params.to_vec(),
            kind,
            body,
        }));
        self
    }

    /// Register into a registry, which assigns the id and composes the
    /// final layout. See [`ClassRegistry::register`](crate::registry::ClassRegistry::register).
    pub fn register(
        self,
        registry: &crate::registry::ClassRegistry,
    ) -> Result<ClassId, crate::error::ObjectError> {
        registry.register(self)
    }
}
