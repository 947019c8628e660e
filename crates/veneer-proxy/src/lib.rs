//! Veneer method-interception engine
//!
//! Builds dynamic proxies over the `veneer-core` object model: a
//! [`ProxyFactory`] synthesizes, per `(base class, interceptor-chain
//! signature)` pair, a subclass whose virtual methods route through an
//! ordered [`Interceptor`] chain before delegating to the original body.
//! Generated classes are memoized in a single-flight [`DispatchCache`], so
//! concurrent requests for the same pair never generate twice.
//!
//! ```ignore
//! let registry = Arc::new(ClassRegistry::new());
//! let base = ClassBuilder::new("Greeter")
//!     .method("greet", &[TypeTag::Str], |_, args| {
//!         Ok(Value::Str(format!("hello {}", args[0])))
//!     })
//!     .constructor(&[], |_| Ok(vec![]))
//!     .register(&registry)?;
//!
//! let factory = ProxyFactory::new(Arc::clone(&registry));
//! let chain = InterceptorChain::new().with(Logging::default());
//! let proxy = factory.create_proxy(base, &chain, &[])?;
//! registry.invoke(&proxy, "greet", &[Value::from("world")])?;
//! ```

pub mod cache;
pub mod call;
pub mod error;
pub mod factory;
pub mod interceptor;

pub use cache::{DispatchCache, ProxyKey};
pub use call::{CallDescriptor, MethodIdentity};
pub use error::ProxyError;
pub use factory::ProxyFactory;
pub use interceptor::{Interceptor, InterceptorChain, Proceed};
