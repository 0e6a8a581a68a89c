//! Value and expression model used by the `hyser` container format.
//!
//! - [`value::Value`]: immutable runtime-typed data, including qtypes and operators.
//! - [`expr::ExprNode`]: shared expression DAG nodes with cached fingerprints.
//! - [`operator::ExprOperator`]: registered references, lambdas and backend operators.
//! - [`registry::OperatorRegistry`]: name to operator mapping.
//! - [`error::Error`]: status-style errors with positional context.

pub mod error;
pub mod expr;
pub mod fingerprint;
pub mod operator;
pub mod qtype;
pub mod registry;
pub mod value;

pub use error::{Error, ErrorCode, Result, ResultExt};
pub use expr::{ExprKind, ExprNode, ExprNodePtr};
pub use fingerprint::Fingerprint;
pub use operator::{ExprOperator, OperatorPtr, Param};
pub use qtype::QType;
pub use registry::OperatorRegistry;
pub use value::{OpaqueValue, Value};
