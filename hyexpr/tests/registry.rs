use hyexpr::expr::ExprNode;
use hyexpr::operator::{ExprOperator, Param};
use hyexpr::registry::{OperatorFamily, OperatorRegistry, RegistryEntry};
use hyexpr::{QType, Value};

fn backend(name: &str, inputs: &[QType], output: QType) -> hyexpr::OperatorPtr {
    ExprOperator::backend(name, inputs.iter().cloned(), output, "")
}

#[test]
fn registration_returns_a_registered_reference() {
    let registry = OperatorRegistry::new();
    let op = backend("math.neg", &[QType::Int64], QType::Int64);
    let reference = registry.register_operator("math.neg", op).unwrap();

    assert_eq!(reference.display_name(), "math.neg");
    assert!(reference.as_registered().is_some());
    assert!(registry.contains("math.neg"));
    assert!(registry.implementation("math.neg").is_some());
    assert_eq!(
        registry
            .registered_operator("math.neg")
            .unwrap()
            .fingerprint(),
        reference.fingerprint()
    );
}

#[test]
fn lambda_collision_is_already_exists() {
    let registry = OperatorRegistry::new();
    let body = ExprNode::placeholder("x");
    let identity = ExprOperator::lambda("identity", vec![Param::new("x")], body, "").unwrap();

    registry.register_operator("core.identity", identity.clone()).unwrap();
    let err = registry
        .register_operator("core.identity", identity)
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(err.message(), "operator already exists: core.identity");
}

#[test]
fn lookup_dispatches_on_input_types() {
    let registry = OperatorRegistry::new();
    registry
        .register_operator_family(OperatorFamily::new(
            "math.add",
            vec![
                backend("math.add", &[QType::Int32, QType::Int32], QType::Int32),
                backend("math.add", &[QType::Int64, QType::Int64], QType::Int64),
            ],
        ))
        .unwrap();

    let op = registry
        .lookup_operator("math.add", &[QType::Int64, QType::Int64], None)
        .unwrap();
    assert_eq!(
        op.as_backend().map(|b| b.signature.output.clone()),
        Some(QType::Int64)
    );

    let err = registry
        .lookup_operator("math.add", &[QType::Int64, QType::Float64], None)
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(
        err.message(),
        "no overload of math.add accepts inputs (INT64,FLOAT64); closest candidate is (INT64,INT64)"
    );

    let err = registry
        .lookup_operator("math.add", &[QType::Int32, QType::Int32], Some(&QType::Int64))
        .unwrap_err();
    assert!(err.is_invalid_argument());

    assert!(
        registry
            .lookup_operator("math.sub", &[], None)
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn lambda_arity_accounts_for_defaults() {
    let registry = OperatorRegistry::new();
    let body = ExprNode::call_op(
        ExprOperator::registered("math.add"),
        [ExprNode::placeholder("x"), ExprNode::placeholder("y")],
    );
    let op = ExprOperator::lambda(
        "add_default",
        vec![Param::new("x"), Param::with_default("y", Value::Int64(1))],
        body,
        "x + y",
    )
    .unwrap();
    registry.register_operator("math.add_default", op).unwrap();

    assert!(
        registry
            .lookup_operator("math.add_default", &[QType::Int64], None)
            .is_ok()
    );
    assert!(
        registry
            .lookup_operator(
                "math.add_default",
                &[QType::Int64, QType::Int64, QType::Int64],
                None
            )
            .unwrap_err()
            .is_invalid_argument()
    );
}

#[test]
fn names_are_listed_in_registration_order() {
    let registry = OperatorRegistry::new();
    for name in ["z.last", "a.first", "m.middle"] {
        registry
            .register_operator(name, backend(name, &[], QType::Unit))
            .unwrap();
    }
    assert_eq!(
        registry.list_registered_operators(),
        vec!["z.last", "a.first", "m.middle"]
    );
    assert!(matches!(
        registry.lookup("a.first"),
        Some(RegistryEntry::Operator(_))
    ));
}
