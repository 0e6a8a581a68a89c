//! Expression operators.
//!
//! An operator is one of three explicit kinds:
//!
//! - [`RegisteredOperator`]: a by-name reference into an
//!   [`OperatorRegistry`](crate::registry::OperatorRegistry). Serializing it
//!   only ever stores the name.
//! - [`LambdaOperator`]: a named parameter list and a body expression whose
//!   placeholders are the parameters.
//! - [`BackendOperator`]: an opaque implementation identified by name and a
//!   fixed qtype signature.
use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{Error, Result},
    expr::{ExprKind, ExprNodePtr, post_order},
    fingerprint::{Fingerprint, FingerprintHasher},
    qtype::{QType, format_qtypes},
    value::Value,
};

pub const REGISTERED_OPERATOR_SPECIALIZATION_KEY: &str = "::hyexpr::RegisteredOperator";
pub const LAMBDA_OPERATOR_SPECIALIZATION_KEY: &str = "::hyexpr::LambdaOperator";
pub const BACKEND_OPERATOR_SPECIALIZATION_KEY: &str = "::hyexpr::BackendOperator";

pub type OperatorPtr = Arc<ExprOperator>;

/// Check that `name` is a dot separated sequence of identifiers (`math.add`).
pub fn is_valid_operator_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredOperator {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LambdaOperator {
    pub name: String,
    pub params: Vec<Param>,
    pub body: ExprNodePtr,
    pub doc: String,
}

impl LambdaOperator {
    /// Number of parameters without a default value.
    pub fn required_arity(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub inputs: Vec<QType>,
    pub output: QType,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", format_qtypes(&self.inputs), self.output)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendOperator {
    pub name: String,
    pub signature: Signature,
    pub doc: String,
}

#[derive(Debug, Clone)]
pub enum ExprOperator {
    Registered(RegisteredOperator),
    Lambda(LambdaOperator),
    Backend(BackendOperator),
}

impl ExprOperator {
    /// Reference to a registered operator.
    pub fn registered(name: impl Into<String>) -> OperatorPtr {
        Arc::new(ExprOperator::Registered(RegisteredOperator { name: name.into() }))
    }

    /// Backend operator with a fixed signature.
    pub fn backend(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = QType>,
        output: QType,
        doc: impl Into<String>,
    ) -> OperatorPtr {
        Arc::new(ExprOperator::Backend(BackendOperator {
            name: name.into(),
            signature: Signature {
                inputs: inputs.into_iter().collect(),
                output,
            },
            doc: doc.into(),
        }))
    }

    /// Lambda operator; every placeholder in `body` must name a parameter.
    pub fn lambda(
        name: impl Into<String>,
        params: Vec<Param>,
        body: ExprNodePtr,
        doc: impl Into<String>,
    ) -> Result<OperatorPtr> {
        let name = name.into();
        let mut seen = HashSet::new();
        for param in &params {
            if !is_valid_operator_name(&param.name) || param.name.contains('.') {
                return Err(Error::InvalidArgument(format!(
                    "invalid lambda parameter name: {:?}",
                    param.name
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate lambda parameter: {}",
                    param.name
                )));
            }
        }
        if let Some(first_default) = params.iter().position(|p| p.default.is_some()) {
            if params[first_default..].iter().any(|p| p.default.is_none()) {
                return Err(Error::InvalidArgument(format!(
                    "parameters with defaults must come last in lambda {}",
                    name
                )));
            }
        }
        for node in post_order(&body) {
            if let ExprKind::Placeholder(key) = node.kind() {
                if !seen.contains(key.as_str()) {
                    return Err(Error::InvalidArgument(format!(
                        "P.{} is not a parameter of lambda {}",
                        key, name
                    )));
                }
            }
        }
        Ok(Arc::new(ExprOperator::Lambda(LambdaOperator {
            name,
            params,
            body,
            doc: doc.into(),
        })))
    }

    pub fn display_name(&self) -> &str {
        match self {
            ExprOperator::Registered(op) => &op.name,
            ExprOperator::Lambda(op) => &op.name,
            ExprOperator::Backend(op) => &op.name,
        }
    }

    pub fn doc(&self) -> &str {
        match self {
            ExprOperator::Registered(_) => "",
            ExprOperator::Lambda(op) => &op.doc,
            ExprOperator::Backend(op) => &op.doc,
        }
    }

    pub fn specialization_key(&self) -> &'static str {
        match self {
            ExprOperator::Registered(_) => REGISTERED_OPERATOR_SPECIALIZATION_KEY,
            ExprOperator::Lambda(_) => LAMBDA_OPERATOR_SPECIALIZATION_KEY,
            ExprOperator::Backend(_) => BACKEND_OPERATOR_SPECIALIZATION_KEY,
        }
    }

    pub fn as_registered(&self) -> Option<&RegisteredOperator> {
        match self {
            ExprOperator::Registered(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaOperator> {
        match self {
            ExprOperator::Lambda(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_backend(&self) -> Option<&BackendOperator> {
        match self {
            ExprOperator::Backend(op) => Some(op),
            _ => None,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let hasher = FingerprintHasher::new(self.specialization_key());
        match self {
            ExprOperator::Registered(op) => hasher.combine(&op.name).finish(),
            ExprOperator::Lambda(op) => {
                let mut hasher = hasher
                    .combine(&op.name)
                    .combine(&op.doc)
                    .combine(&op.params.len());
                for param in &op.params {
                    hasher = hasher.combine(&param.name);
                    hasher = match &param.default {
                        Some(default) => hasher
                            .combine(&1u8)
                            .combine_fingerprint(default.fingerprint()),
                        None => hasher.combine(&0u8),
                    };
                }
                hasher.combine_fingerprint(op.body.fingerprint()).finish()
            }
            ExprOperator::Backend(op) => hasher.combine(op).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprNode;

    #[test]
    fn operator_names() {
        assert!(is_valid_operator_name("math.add"));
        assert!(is_valid_operator_name("_private.x1"));
        assert!(!is_valid_operator_name(""));
        assert!(!is_valid_operator_name("math..add"));
        assert!(!is_valid_operator_name("1math"));
        assert!(!is_valid_operator_name("math.add!"));
    }

    #[test]
    fn lambda_rejects_unknown_placeholders() {
        let body = ExprNode::call_op(
            ExprOperator::registered("math.add"),
            [ExprNode::placeholder("x"), ExprNode::placeholder("y")],
        );
        let err = ExprOperator::lambda("add_xy", vec![Param::new("x")], body.clone(), "")
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.message(), "P.y is not a parameter of lambda add_xy");

        let op = ExprOperator::lambda("add_xy", vec![Param::new("x"), Param::new("y")], body, "")
            .unwrap();
        assert_eq!(op.specialization_key(), LAMBDA_OPERATOR_SPECIALIZATION_KEY);
        assert_eq!(op.as_lambda().map(LambdaOperator::required_arity), Some(2));
    }

    #[test]
    fn defaults_must_trail() {
        let body = ExprNode::placeholder("x");
        let err = ExprOperator::lambda(
            "f",
            vec![Param::with_default("y", Value::Int32(1)), Param::new("x")],
            body,
            "",
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn fingerprint_tracks_kind_and_content() {
        let a = ExprOperator::registered("math.add");
        let b = ExprOperator::registered("math.add");
        let c = ExprOperator::backend("math.add", [QType::Int32], QType::Int32, "");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
