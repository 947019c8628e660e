//! End-to-end interception semantics: ordering, short-circuit, argument
//! substitution, failure translation and pass-through policy.

use std::sync::Arc;

use parking_lot::Mutex;

use veneer_core::{
    CallError, ClassBuilder, ClassId, ClassRegistry, ObjectRef, TypeTag, Value,
};
use veneer_proxy::{CallDescriptor, Interceptor, InterceptorChain, Proceed, ProxyFactory};

type Log = Arc<Mutex<Vec<String>>>;

fn log_of(log: &Log) -> Vec<String> {
    log.lock().clone()
}

/// Account with a deposit method that rejects negative amounts.
/// The method body records "original" so tests can observe whether the
/// real implementation ran.
fn account_class(registry: &ClassRegistry, log: &Log) -> ClassId {
    let body_log = Arc::clone(log);
    ClassBuilder::new("Account")
        .property("balance", TypeTag::Int)
        .constructor(&[TypeTag::Int], |args| Ok(vec![args[0].clone()]))
        .method("deposit", &[TypeTag::Int], move |this, args| {
            let amount = args[0]
                .as_int()
                .ok_or_else(|| CallError::raised("type", "amount must be an int"))?;
            if amount < 0 {
                return Err(CallError::raised("negative-amount", "deposit must be >= 0"));
            }
            body_log.lock().push("original".to_string());
            let balance = this
                .get("balance")
                .map_err(|e| CallError::raised("state", e.to_string()))?
                .as_int()
                .unwrap_or(0);
            this.set("balance", Value::Int(balance + amount))
                .map_err(|e| CallError::raised("state", e.to_string()))?;
            Ok(Value::Int(balance + amount))
        })
        .final_method("kind", &[], |_, _| Ok(Value::from("account")))
        .register(registry)
        .unwrap()
}

struct TraceA {
    log: Log,
}

impl Interceptor for TraceA {
    fn around(&self, _call: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        self.log.lock().push("A-before".to_string());
        let result = proceed.invoke();
        match &result {
            Ok(_) => self.log.lock().push("A-after".to_string()),
            Err(e) => self.log.lock().push(format!("A-error:{}", error_kind(e))),
        }
        result
    }
}

struct TraceB {
    log: Log,
}

impl Interceptor for TraceB {
    fn around(&self, _call: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        self.log.lock().push("B-before".to_string());
        let result = proceed.invoke();
        match &result {
            Ok(_) => self.log.lock().push("B-after".to_string()),
            Err(e) => self.log.lock().push(format!("B-error:{}", error_kind(e))),
        }
        result
    }
}

fn error_kind(err: &CallError) -> String {
    match err {
        CallError::Raised { kind, .. } => kind.clone(),
        other => other.to_string(),
    }
}

/// Never proceeds; answers with a canned value.
struct ShortCircuit;

impl Interceptor for ShortCircuit {
    fn around(&self, _: &CallDescriptor, _: &mut Proceed<'_>) -> Result<Value, CallError> {
        Ok(Value::Int(-7))
    }
}

/// Doubles the first argument before proceeding.
struct DoubleAmount;

impl Interceptor for DoubleAmount {
    fn around(&self, call: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        let doubled = call.arg(0).and_then(Value::as_int).unwrap_or(0) * 2;
        proceed.invoke_with(vec![Value::Int(doubled)])
    }
}

/// Translates "negative-amount" failures into a different kind.
struct Translate;

impl Interceptor for Translate {
    fn around(&self, _: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        proceed.invoke().map_err(|err| match err {
            CallError::Raised { kind, message } if kind == "negative-amount" => {
                CallError::raised("rejected", message)
            }
            other => other,
        })
    }
}

/// Swallows failures and substitutes a sentinel.
struct Suppress;

impl Interceptor for Suppress {
    fn around(&self, _: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        proceed.invoke().or(Ok(Value::Int(0)))
    }
}

fn setup() -> (Arc<ClassRegistry>, ProxyFactory, ClassId, Log) {
    let registry = Arc::new(ClassRegistry::new());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let base = account_class(&registry, &log);
    let factory = ProxyFactory::new(Arc::clone(&registry));
    (registry, factory, base, log)
}

#[test]
fn chain_runs_in_registration_order_and_unwinds_in_reverse() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new()
        .with(TraceA { log: Arc::clone(&log) })
        .with(TraceB { log: Arc::clone(&log) });
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let result = registry.invoke(&proxy, "deposit", &[Value::Int(5)]).unwrap();
    assert_eq!(result, Value::Int(5));
    assert_eq!(
        log_of(&log),
        vec!["A-before", "B-before", "original", "B-after", "A-after"]
    );
    assert_eq!(proxy.get("balance").unwrap(), Value::Int(5));
}

#[test]
fn empty_chain_delegates_directly() {
    let (registry, factory, base, log) = setup();
    let proxy = factory
        .create_proxy(base, &InterceptorChain::new(), &[Value::Int(10)])
        .unwrap();

    let result = registry.invoke(&proxy, "deposit", &[Value::Int(1)]).unwrap();
    assert_eq!(result, Value::Int(11));
    assert_eq!(log_of(&log), vec!["original"]);
}

#[test]
fn short_circuit_leaves_no_trace_of_original() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new().with(ShortCircuit);
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let result = registry.invoke(&proxy, "deposit", &[Value::Int(5)]).unwrap();
    assert_eq!(result, Value::Int(-7));
    // The original body never ran: no log entry, no state change
    assert!(log_of(&log).is_empty());
    assert_eq!(proxy.get("balance").unwrap(), Value::Int(0));
}

#[test]
fn arguments_substituted_downstream_without_mutating_descriptor() {
    let (registry, factory, base, _log) = setup();
    let chain = InterceptorChain::new().with(DoubleAmount);
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let result = registry.invoke(&proxy, "deposit", &[Value::Int(6)]).unwrap();
    assert_eq!(result, Value::Int(12));
    assert_eq!(proxy.get("balance").unwrap(), Value::Int(12));
}

#[test]
fn failures_unwind_in_reverse_order_and_reach_caller_unchanged() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new()
        .with(TraceA { log: Arc::clone(&log) })
        .with(TraceB { log: Arc::clone(&log) });
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let err = registry
        .invoke(&proxy, "deposit", &[Value::Int(-1)])
        .unwrap_err();
    assert!(matches!(err, CallError::Raised { ref kind, .. } if kind == "negative-amount"));
    assert_eq!(
        log_of(&log),
        vec![
            "A-before",
            "B-before",
            "B-error:negative-amount",
            "A-error:negative-amount"
        ]
    );
}

#[test]
fn inner_interceptor_translates_failure_before_outer_sees_it() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new()
        .with(TraceA { log: Arc::clone(&log) })
        .with(Translate);
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let err = registry
        .invoke(&proxy, "deposit", &[Value::Int(-1)])
        .unwrap_err();
    assert!(matches!(err, CallError::Raised { ref kind, .. } if kind == "rejected"));
    assert_eq!(log_of(&log), vec!["A-before", "A-error:rejected"]);
}

#[test]
fn interceptor_may_suppress_a_failure() {
    let (registry, factory, base, _log) = setup();
    let chain = InterceptorChain::new().with(Suppress);
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(3)]).unwrap();

    let result = registry
        .invoke(&proxy, "deposit", &[Value::Int(-1)])
        .unwrap();
    assert_eq!(result, Value::Int(0));
    assert_eq!(proxy.get("balance").unwrap(), Value::Int(3));
}

#[test]
fn final_methods_pass_through_unintercepted() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new().with(TraceA { log: Arc::clone(&log) });
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    let result = registry.invoke(&proxy, "kind", &[]).unwrap();
    assert_eq!(result, Value::from("account"));
    assert!(log_of(&log).is_empty(), "final method must not be intercepted");
}

#[test]
fn inherited_virtual_methods_are_intercepted_on_subclass_proxies() {
    let (registry, factory, base, log) = setup();
    let child = ClassBuilder::new("SavingsAccount")
        .parent(base)
        .constructor(&[TypeTag::Int], |args| Ok(vec![args[0].clone()]))
        .register(&registry)
        .unwrap();

    let chain = InterceptorChain::new().with(TraceA { log: Arc::clone(&log) });
    let proxy = factory
        .create_proxy(child, &chain, &[Value::Int(0)])
        .unwrap();

    registry.invoke(&proxy, "deposit", &[Value::Int(2)]).unwrap();
    assert_eq!(log_of(&log), vec!["A-before", "original", "A-after"]);
}

/// Descriptor contents observed from inside an interceptor.
struct Inspect {
    base: ClassId,
    log: Log,
}

impl Interceptor for Inspect {
    fn around(&self, call: &CallDescriptor, proceed: &mut Proceed<'_>) -> Result<Value, CallError> {
        assert_eq!(call.method_name(), "deposit");
        assert_eq!(call.declaring_class(), self.base);
        assert_eq!(call.param_types(), &[TypeTag::Int]);
        assert_eq!(call.args(), &[Value::Int(9)]);
        let target: ObjectRef = call.target().expect("target alive during dispatch");
        assert_eq!(target.get("balance").unwrap(), Value::Int(0));
        self.log.lock().push("inspected".to_string());
        proceed.invoke()
    }
}

#[test]
fn descriptor_exposes_method_identity_args_and_target() {
    let (registry, factory, base, log) = setup();
    let chain = InterceptorChain::new().with(Inspect {
        base,
        log: Arc::clone(&log),
    });
    let proxy = factory.create_proxy(base, &chain, &[Value::Int(0)]).unwrap();

    registry.invoke(&proxy, "deposit", &[Value::Int(9)]).unwrap();
    assert_eq!(log_of(&log), vec!["inspected", "original"]);
}

#[test]
fn hand_built_descriptor_is_validated() {
    let (registry, factory, base, _log) = setup();
    let proxy = factory
        .create_proxy(base, &InterceptorChain::new(), &[Value::Int(0)])
        .unwrap();

    // Unknown method
    let err = CallDescriptor::new(&registry, base, &proxy, "withdraw", vec![]).unwrap_err();
    assert!(matches!(err, CallError::InvalidInvocation(_)));

    // Final methods are not overridable
    let err = CallDescriptor::new(&registry, base, &proxy, "kind", vec![]).unwrap_err();
    assert!(matches!(err, CallError::InvalidInvocation(_)));

    // Arity mismatch
    let err = CallDescriptor::new(&registry, base, &proxy, "deposit", vec![]).unwrap_err();
    assert!(matches!(err, CallError::InvalidInvocation(_)));

    // Well-formed descriptor
    let call =
        CallDescriptor::new(&registry, base, &proxy, "deposit", vec![Value::Int(1)]).unwrap();
    assert_eq!(call.method_name(), "deposit");
    assert_eq!(call.declaring_class(), base);
}
