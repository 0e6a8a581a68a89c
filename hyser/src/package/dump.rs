use std::collections::{BTreeSet, HashMap, HashSet};

use hyexpr::{
    ExprKind, ExprNodePtr, ExprOperator, OperatorPtr, OperatorRegistry, Value,
    error::{Error, Result, ResultExt},
    expr::post_order,
    fingerprint::Fingerprint,
    registry::RegistryEntry,
};
use log::debug;
use smallvec::SmallVec;

use crate::{
    codec::CodecRegistry,
    encode::encode,
    magic::OPERATOR_PACKAGE_VERSION,
    package::{OperatorPackage, OperatorPackageEntry},
};

/// Build a package from the current implementations of `names`.
///
/// `names` must be distinct and topologically ordered: an operator may only
/// reference exported operators listed before it. Registered operators
/// referenced but not exported become the package's required dependencies.
pub fn dump_operator_package(
    names: &[&str],
    codecs: &CodecRegistry,
    operators: &OperatorRegistry,
) -> Result<OperatorPackage> {
    let mut positions = HashMap::with_capacity(names.len());
    for (i, &name) in names.iter().enumerate() {
        if positions.insert(name, i).is_some() {
            return Err(Error::InvalidArgument(format!(
                "{} listed multiple times",
                name
            )));
        }
    }

    let mut required = BTreeSet::new();
    let mut entries = Vec::with_capacity(names.len());
    for (i, &name) in names.iter().enumerate() {
        let implementation = lookup_implementation(operators, name)?;

        for referenced in registered_references(&implementation) {
            match positions.get(referenced.as_str()) {
                Some(&j) if j >= i => {
                    return Err(Error::InvalidArgument(format!(
                        "expected the operator names to be given in topological order; \
                         {} references {} which is listed after it",
                        name, referenced
                    )));
                }
                Some(_) => {}
                None => {
                    required.insert(referenced);
                }
            }
        }

        let container = encode(&[Value::Operator(implementation)], &[], codecs)
            .with_context(|| format!("while dumping {}", name))?;
        entries.push(OperatorPackageEntry {
            registration_name: name.to_string(),
            implementation: container,
        });
    }

    debug!(
        "Dumped {} operators with {} required dependencies",
        entries.len(),
        required.len()
    );
    Ok(OperatorPackage {
        version: OPERATOR_PACKAGE_VERSION,
        required_registered_operators: required.into_iter().collect(),
        operators: entries,
    })
}

fn lookup_implementation(operators: &OperatorRegistry, name: &str) -> Result<OperatorPtr> {
    match operators.lookup(name) {
        Some(RegistryEntry::Operator(op)) => Ok(op),
        Some(RegistryEntry::Family(_)) => Err(Error::FailedPrecondition(format!(
            "{} is an operator family and has no single implementation to dump",
            name
        ))),
        None => Err(Error::NotFound(format!("operator not found: {}", name))),
    }
}

enum Item {
    Value(Value),
    Operator(OperatorPtr),
    Expr(ExprNodePtr),
}

/// Names of registered operators reachable from `op`. The walk descends into
/// lambda bodies, default values, literals and tuples, and stops at
/// registered references.
fn registered_references(op: &OperatorPtr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut seen: HashSet<Fingerprint> = HashSet::new();
    let mut stack: SmallVec<Item, 8> = SmallVec::new();
    stack.push(Item::Operator(op.clone()));

    while let Some(item) = stack.pop() {
        match item {
            Item::Operator(op) => {
                if !seen.insert(op.fingerprint()) {
                    continue;
                }
                match op.as_ref() {
                    ExprOperator::Registered(registered) => {
                        names.insert(registered.name.clone());
                    }
                    ExprOperator::Lambda(lambda) => {
                        for default in lambda.params.iter().filter_map(|p| p.default.clone()) {
                            stack.push(Item::Value(default));
                        }
                        stack.push(Item::Expr(lambda.body.clone()));
                    }
                    ExprOperator::Backend(_) => {}
                }
            }
            Item::Value(value) => match value {
                Value::Operator(op) => stack.push(Item::Operator(op)),
                Value::Tuple(fields) => {
                    stack.extend(fields.iter().cloned().map(Item::Value));
                }
                _ => {}
            },
            Item::Expr(root) => {
                for node in post_order(&root) {
                    match node.kind() {
                        ExprKind::Operator { op, .. } => stack.push(Item::Operator(op.clone())),
                        ExprKind::Literal(value) => stack.push(Item::Value(value.clone())),
                        ExprKind::Leaf(_) | ExprKind::Placeholder(_) => {}
                    }
                }
            }
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyexpr::{ExprNode, Param, QType};

    #[test]
    fn references_stop_at_registered_operators() {
        let inner = ExprOperator::lambda(
            "inner",
            vec![Param::new("x")],
            ExprNode::call_op(ExprOperator::registered("a.b"), [ExprNode::placeholder("x")]),
            "",
        )
        .unwrap();
        let body = ExprNode::call_op(
            inner,
            [ExprNode::call_op(
                ExprOperator::backend("c.d", [], QType::Int64, ""),
                [],
            )],
        );
        let outer = ExprOperator::lambda(
            "outer",
            vec![Param::with_default(
                "y",
                Value::tuple([Value::Operator(ExprOperator::registered("e.f"))]),
            )],
            ExprNode::call_op(
                ExprOperator::registered("g.h"),
                [body, ExprNode::placeholder("y")],
            ),
            "",
        )
        .unwrap();

        let names: Vec<String> = registered_references(&outer).into_iter().collect();
        assert_eq!(names, vec!["a.b", "e.f", "g.h"]);
    }
}
