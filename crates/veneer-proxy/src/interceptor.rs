//! Interceptors, chains and the proceed continuation
//!
//! An interceptor wraps a method call: it may proceed and pass the result
//! through, post-process the result, short-circuit with a substitute, or
//! translate a failure raised further in. Interceptors registered on one
//! proxy form an ordered chain nested like scopes: the first registered
//! interceptor is outermost, so registration order runs on the way in and
//! reverse order on the way out. The nesting is purely structural, so the
//! order is deterministic regardless of thread scheduling.

use std::any::{Any, TypeId};
use std::sync::Arc;

use veneer_core::{CallError, MethodBody, ObjectRef, Value};

use crate::call::CallDescriptor;

/// A capability invoked around an intercepted method call
///
/// `Any` is a supertrait so a chain's cache signature can be derived from
/// the concrete interceptor types.
pub trait Interceptor: Any + Send + Sync {
    /// Wrap one invocation. `proceed` continues with the rest of the chain
    /// and finally the original method body; it may be called zero or more
    /// times (normally exactly once).
    fn around(
        &self,
        call: &CallDescriptor,
        proceed: &mut Proceed<'_>,
    ) -> Result<Value, CallError>;
}

/// Ordered interceptor sequence, fixed at proxy-creation time
#[derive(Clone, Default)]
pub struct InterceptorChain {
    items: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; earlier entries run outermost.
    pub fn with<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.items.push(Arc::new(interceptor));
        self
    }

    /// Append an already-shared interceptor.
    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.items.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ordered concrete type identities; together with the base class this
    /// forms the dispatch-cache key.
    pub fn signature(&self) -> Vec<TypeId> {
        self.items.iter().map(|i| Any::type_id(&**i)).collect()
    }

    pub(crate) fn items_shared(&self) -> Arc<[Arc<dyn Interceptor>]> {
        self.items.clone().into()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.items.len())
            .finish()
    }
}

/// Continuation over the remainder of the chain plus the original body
///
/// [`invoke`](Proceed::invoke) continues with the current argument frame;
/// [`invoke_with`](Proceed::invoke_with) substitutes arguments for
/// everything downstream. The [`CallDescriptor`] itself is never mutated.
pub struct Proceed<'a> {
    chain: &'a [Arc<dyn Interceptor>],
    call: &'a CallDescriptor,
    target: &'a ObjectRef,
    terminal: &'a MethodBody,
    args: Vec<Value>,
}

impl Proceed<'_> {
    /// The argument frame this continuation will pass on.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Run the rest of the chain and the original body.
    pub fn invoke(&mut self) -> Result<Value, CallError> {
        let args = self.args.clone();
        dispatch(self.chain, self.call, self.target, self.terminal, args)
    }

    /// Run the rest of the chain with substituted arguments.
    pub fn invoke_with(&mut self, args: Vec<Value>) -> Result<Value, CallError> {
        dispatch(self.chain, self.call, self.target, self.terminal, args)
    }
}

/// Nest the chain around the terminal body: head interceptor outermost,
/// the original method body innermost.
pub(crate) fn dispatch(
    chain: &[Arc<dyn Interceptor>],
    call: &CallDescriptor,
    target: &ObjectRef,
    terminal: &MethodBody,
    args: Vec<Value>,
) -> Result<Value, CallError> {
    match chain.split_first() {
        None => terminal(target, &args),
        Some((outer, rest)) => {
            let mut proceed = Proceed {
                chain: rest,
                call,
                target,
                terminal,
                args,
            };
            outer.around(call, &mut proceed)
        }
    }
}
