use hyexpr::{
    ExprNode, ExprOperator, OperatorRegistry, Param, QType, Value,
    registry::{OperatorFamily, RegistryEntry},
};
use hyser::{
    codec::CodecRegistry,
    config::SerializationConfig,
    encode::encode,
    package::{
        OperatorPackage, OperatorPackageEntry, dump_operator_package, embed_operator_package,
        load_embedded_operator_package, load_operator_package,
    },
};

const OP1: &str = "package_test.op1";
const OP2: &str = "package_test.op2";

/// `op1(x) = x` and `op2(x) = op1(x)`.
fn registry_with_ops() -> OperatorRegistry {
    let operators = OperatorRegistry::new();
    let op1 = ExprOperator::lambda("op1", vec![Param::new("x")], ExprNode::placeholder("x"), "")
        .unwrap();
    let op1 = operators.register_operator(OP1, op1).unwrap();
    let op2 = ExprOperator::lambda(
        "op2",
        vec![Param::new("x")],
        ExprNode::call_op(op1, [ExprNode::placeholder("x")]),
        "",
    )
    .unwrap();
    operators.register_operator(OP2, op2).unwrap();
    operators
}

fn codecs() -> CodecRegistry {
    CodecRegistry::with_builtin_codecs().unwrap()
}

#[test]
fn dump_ordering() {
    let codecs = codecs();
    let operators = registry_with_ops();

    let package = dump_operator_package(&[OP1, OP2], &codecs, &operators).unwrap();
    assert_eq!(package.version, 1);
    assert!(package.required_registered_operators.is_empty());
    assert_eq!(package.operators.len(), 2);

    let package = dump_operator_package(&[OP1], &codecs, &operators).unwrap();
    assert!(package.required_registered_operators.is_empty());
    assert_eq!(package.operators.len(), 1);

    let package = dump_operator_package(&[OP2], &codecs, &operators).unwrap();
    assert_eq!(package.required_registered_operators, vec![OP1]);
    assert_eq!(package.operators.len(), 1);

    let err = dump_operator_package(&[OP2, OP1], &codecs, &operators).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(
        err.message()
            .contains("expected the operator names to be given in topological order")
    );

    let err = dump_operator_package(&[OP1, OP1], &codecs, &operators).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(err.message().contains("listed multiple times"));

    let package = dump_operator_package(&[], &codecs, &operators).unwrap();
    assert_eq!(package.version, 1);
    assert!(package.operators.is_empty());
}

#[test]
fn dump_rejects_unknown_names_and_families() {
    let codecs = codecs();
    let operators = OperatorRegistry::new();
    operators
        .register_operator_family(OperatorFamily::new(
            "math.add",
            vec![ExprOperator::backend(
                "math.add",
                [QType::Int64, QType::Int64],
                QType::Int64,
                "",
            )],
        ))
        .unwrap();

    let err = dump_operator_package(&["math.sub"], &codecs, &operators).unwrap_err();
    assert!(err.is_not_found());
    let err = dump_operator_package(&["math.add"], &codecs, &operators).unwrap_err();
    assert!(err.is_failed_precondition());
}

#[test]
fn dump_then_load_into_a_fresh_registry() {
    let codecs = codecs();
    let package = dump_operator_package(&[OP1, OP2], &codecs, &registry_with_ops()).unwrap();
    let package = OperatorPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();

    let target = OperatorRegistry::new();
    load_operator_package(&package, &codecs, &target).unwrap();
    assert_eq!(target.list_registered_operators(), vec![OP1, OP2]);

    let Some(RegistryEntry::Operator(op2)) = target.lookup(OP2) else {
        panic!("{} should be a single operator", OP2);
    };
    let body = &op2.as_lambda().unwrap().body;
    assert_eq!(body.to_string(), format!("{}(P.x)", OP1));
    assert!(body.op().unwrap().as_registered().is_some());
}

#[test]
fn double_registration() {
    let codecs = codecs();
    let package = dump_operator_package(&[OP1], &codecs, &registry_with_ops()).unwrap();

    let target = OperatorRegistry::new();
    load_operator_package(&package, &codecs, &target).unwrap();
    let err = load_operator_package(&package, &codecs, &target).unwrap_err();
    assert!(err.is_failed_precondition());
    assert_eq!(
        err.message(),
        format!("already present in the registry: M.{}", OP1)
    );
}

#[test]
fn missing_dependencies_are_aggregated() {
    let package = OperatorPackage {
        version: 1,
        required_registered_operators: vec!["foo.bar".into(), "far.boo".into()],
        operators: vec![],
    };
    let err = load_operator_package(&package, &codecs(), &OperatorRegistry::new()).unwrap_err();
    assert!(err.is_failed_precondition());
    assert_eq!(err.message(), "missing dependencies: M.far.boo, M.foo.bar");
}

#[test]
fn dependencies_are_checked_before_collisions() {
    let codecs = codecs();
    let package = dump_operator_package(&[OP2], &codecs, &registry_with_ops()).unwrap();

    let err = load_operator_package(&package, &codecs, &OperatorRegistry::new()).unwrap_err();
    assert_eq!(err.message(), format!("missing dependencies: M.{}", OP1));

    // op1 present: op2 loads on top of it.
    let target = OperatorRegistry::new();
    target
        .register_operator(
            OP1,
            ExprOperator::lambda("op1", vec![Param::new("x")], ExprNode::placeholder("x"), "")
                .unwrap(),
        )
        .unwrap();
    load_operator_package(&package, &codecs, &target).unwrap();
    assert!(target.contains(OP2));
}

#[test]
fn version_is_checked() {
    let package = OperatorPackage {
        version: 2,
        ..Default::default()
    };
    let err = load_operator_package(&package, &codecs(), &OperatorRegistry::new()).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(err.message(), "expected operator_package.version=1, got 2");
}

#[test]
fn implementation_shape_is_checked() {
    let codecs = codecs();
    let package_with = |implementation| OperatorPackage {
        version: 1,
        required_registered_operators: vec![],
        operators: vec![OperatorPackageEntry {
            registration_name: "foo.bar".into(),
            implementation,
        }],
    };

    let empty = package_with(encode(&[], &[], &codecs).unwrap());
    let err = load_operator_package(&empty, &codecs, &OperatorRegistry::new()).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(
        err.message(),
        "expected to get a value, got 0 values and 0 exprs; operators[0].registration_name=foo.bar"
    );

    let with_expr = package_with(
        encode(
            &[Value::Operator(ExprOperator::backend("b", [], QType::Unit, ""))],
            &[ExprNode::leaf("x")],
            &codecs,
        )
        .unwrap(),
    );
    let err = load_operator_package(&with_expr, &codecs, &OperatorRegistry::new()).unwrap_err();
    assert_eq!(
        err.message(),
        "expected to get a value, got 1 values and 1 exprs; operators[0].registration_name=foo.bar"
    );

    let not_an_operator = package_with(encode(&[Value::Int64(0)], &[], &codecs).unwrap());
    let err =
        load_operator_package(&not_an_operator, &codecs, &OperatorRegistry::new()).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(
        err.message(),
        "expected to get EXPR_OPERATOR, got INT64; operators[0].registration_name=foo.bar"
    );
}

#[test]
fn decoder_errors_name_the_operator() {
    let codecs = codecs();
    let mut package = dump_operator_package(&[OP2], &codecs, &registry_with_ops()).unwrap();
    // Drop the declared dependency so the failure surfaces while decoding.
    package.required_registered_operators.clear();

    let err = load_operator_package(&package, &codecs, &OperatorRegistry::new()).unwrap_err();
    assert!(err.is_not_found());
    assert!(
        err.message()
            .starts_with(&format!("operator not found: {}", OP1))
    );
    assert!(
        err.message()
            .ends_with(&format!("operators[0].registration_name={}", OP2))
    );
}

#[test]
fn earlier_operators_stay_registered_on_failure() {
    let codecs = codecs();
    let mut package = dump_operator_package(&[OP1], &codecs, &registry_with_ops()).unwrap();
    package.operators.push(OperatorPackageEntry {
        registration_name: "package_test.broken".into(),
        implementation: encode(&[Value::Int64(0)], &[], &codecs).unwrap(),
    });

    let target = OperatorRegistry::new();
    let err = load_operator_package(&package, &codecs, &target).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(target.contains(OP1));
    assert!(!target.contains("package_test.broken"));
}

#[test]
fn embedded_packages() {
    let codecs = codecs();
    let config = SerializationConfig::default();
    let package = dump_operator_package(&[OP1, OP2], &codecs, &registry_with_ops()).unwrap();
    let envelope = embed_operator_package(&package, &config).unwrap();

    let target = OperatorRegistry::new();
    load_embedded_operator_package(&envelope, &config, &codecs, &target).unwrap();
    assert_eq!(target.list_registered_operators(), vec![OP1, OP2]);

    let truncated = &envelope[..envelope.len() / 2];
    let err =
        load_embedded_operator_package(truncated, &config, &codecs, &OperatorRegistry::new())
            .unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.message(), "unable to parse an embedded operator package");
}
