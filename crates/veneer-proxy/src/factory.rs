//! Proxy class synthesis and instantiation
//!
//! For a `(base class, chain signature)` pair the factory obtains or
//! generates a subclass whose virtual methods are rewritten to: build a
//! [`CallDescriptor`], pull the per-instance interceptor state off the
//! receiver, and dispatch the chain with the original body as the terminal
//! proceed. Final methods and statics are inherited untouched; constructors
//! are shared with the base. Generated classes are registered into the
//! class registry and live for the rest of the process — classes are never
//! unloaded.
//!
//! The generated class is cached per chain *signature* (concrete
//! interceptor types); the interceptor *instances* ride on each proxy
//! instance in its attachment slot, so two proxies of the same shape reuse
//! one class while keeping their own chain state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use veneer_core::{
    CallError, ClassBuilder, ClassDef, ClassId, ClassRegistry, Instance, MethodDef, MethodKind,
    ObjectRef, Value,
};

use crate::cache::{DispatchCache, ProxyKey};
use crate::call::{CallDescriptor, MethodIdentity};
use crate::error::ProxyError;
use crate::interceptor::{dispatch, Interceptor, InterceptorChain};

/// Per-instance interceptor state, attached to every proxy instance
pub(crate) struct ProxyState {
    pub(crate) chain: Arc<[Arc<dyn Interceptor>]>,
}

/// Creates proxy instances backed by cached generated classes
pub struct ProxyFactory {
    registry: Arc<ClassRegistry>,
    cache: DispatchCache,
    /// Class-generation events, successful or not
    generations: AtomicU64,
    /// Suffix source for unique generated class names
    seq: AtomicU64,
}

impl ProxyFactory {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        ProxyFactory {
            registry,
            cache: DispatchCache::new(),
            generations: AtomicU64::new(0),
            seq: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Number of class-generation events so far.
    pub fn generation_count(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    /// Number of dispatch-cache slots.
    pub fn cached_classes(&self) -> usize {
        self.cache.len()
    }

    /// Construct a proxy instance of `base`, selecting a base constructor
    /// overload for `ctor_args` and routing every virtual method through
    /// `chain`.
    pub fn create_proxy(
        &self,
        base: ClassId,
        chain: &InterceptorChain,
        ctor_args: &[Value],
    ) -> Result<ObjectRef, ProxyError> {
        let class = self.proxy_class(base, chain)?;
        let instance = self
            .registry
            .instantiate_class(&class, ctor_args)
            .map_err(ProxyError::from_object_error)?;
        let attached = instance.attach(Arc::new(ProxyState {
            chain: chain.items_shared(),
        }));
        debug_assert!(attached, "fresh instance already carried an attachment");
        Ok(instance)
    }

    /// Layer interception over a live instance: the proxy shares the
    /// target's field storage, so both views see the same state.
    pub fn wrap_proxy(
        &self,
        target: &ObjectRef,
        chain: &InterceptorChain,
    ) -> Result<ObjectRef, ProxyError> {
        let class = self.proxy_class(target.class_id(), chain)?;
        let instance = Instance::sharing_fields(class, target);
        let attached = instance.attach(Arc::new(ProxyState {
            chain: chain.items_shared(),
        }));
        debug_assert!(attached, "fresh instance already carried an attachment");
        Ok(instance)
    }

    /// Obtain or generate the proxy class for `(base, chain signature)`.
    ///
    /// The sealed check runs before any cache access, so a non-extensible
    /// base performs no cache mutation.
    fn proxy_class(
        &self,
        base: ClassId,
        chain: &InterceptorChain,
    ) -> Result<Arc<ClassDef>, ProxyError> {
        let base_def = self
            .registry
            .get(base)
            .map_err(|_| ProxyError::UnknownClass(base))?;
        if base_def.sealed {
            return Err(ProxyError::NonExtensibleType {
                class: base_def.name.clone(),
            });
        }
        let key = ProxyKey::new(base, chain.signature());
        self.cache.get_or_generate(key, || {
            self.generations.fetch_add(1, Ordering::Relaxed);
            self.generate(&base_def)
        })
    }

    /// Synthesize and register the subclass. Runs at most once per cache
    /// key; failures leave the registry untouched.
    fn generate(&self, base: &Arc<ClassDef>) -> Result<Arc<ClassDef>, ProxyError> {
        let name = format!("{}$proxy{}", base.name, self.seq.fetch_add(1, Ordering::Relaxed));
        let mut builder = ClassBuilder::new(name).parent(base.id);

        for (declaring, method) in self.collect_virtuals(base)? {
            let body = method.body.clone().ok_or_else(|| ProxyError::CodeGeneration {
                class: base.name.clone(),
                reason: format!("abstract method '{}' has no body", method.name),
            })?;
            let identity = Arc::new(MethodIdentity {
                name: method.name.clone(),
                declaring_class: declaring,
                params: method.params.clone().into(),
            });
            let wrapped = move |target: &ObjectRef, args: &[Value]| {
                let state = target.attachment::<ProxyState>().ok_or_else(|| {
                    CallError::InvalidInvocation(
                        "proxy instance carries no interceptor state".to_string(),
                    )
                })?;
                let call = CallDescriptor::from_identity(
                    Arc::clone(&identity),
                    Arc::downgrade(target),
                    args.to_vec(),
                );
                dispatch(&state.chain, &call, target, &body, args.to_vec())
            };
            builder = builder.define(MethodDef {
                name: method.name.clone(),
                params: method.params.clone(),
                kind: MethodKind::Virtual,
                body: Some(Arc::new(wrapped)),
            });
        }

        for ctor in &base.constructors {
            builder = builder.inherit_constructor(Arc::clone(ctor));
        }

        let id = builder
            .register(&self.registry)
            .map_err(|e| ProxyError::CodeGeneration {
                class: base.name.clone(),
                reason: e.to_string(),
            })?;
        self.registry
            .get(id)
            .map_err(|_| ProxyError::UnknownClass(id))
    }

    /// Walk the base's chain collecting the nearest definition per method
    /// name; only virtual ones are rewritten. A final definition shadows
    /// any virtual one further up, keeping the method unintercepted.
    fn collect_virtuals(
        &self,
        base: &Arc<ClassDef>,
    ) -> Result<Vec<(ClassId, Arc<MethodDef>)>, ProxyError> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut virtuals = Vec::new();
        let mut current = Some(Arc::clone(base));
        while let Some(def) = current {
            for (name, method) in &def.methods {
                if seen.insert(name.clone()) && method.kind == MethodKind::Virtual {
                    virtuals.push((def.id, Arc::clone(method)));
                }
            }
            current = match def.parent {
                Some(parent) => Some(
                    self.registry
                        .get(parent)
                        .map_err(|_| ProxyError::UnknownClass(parent))?,
                ),
                None => None,
            };
        }
        Ok(virtuals)
    }
}

impl std::fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("cached_classes", &self.cached_classes())
            .field("generations", &self.generation_count())
            .finish()
    }
}
