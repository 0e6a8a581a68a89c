//! Runtime types of [`Value`](crate::value::Value)s.
use std::sync::Arc;

use strum::EnumIs;

use crate::fingerprint::{Fingerprint, FingerprintHasher};

/// Specialization key reported by every tuple qtype.
pub const TUPLE_QTYPE_SPECIALIZATION_KEY: &str = "::hyexpr::TupleQType";

/// Specialization key reported by every opaque qtype.
pub const OPAQUE_QTYPE_SPECIALIZATION_KEY: &str = "::hyexpr::OpaqueQType";

/// A runtime type.
///
/// Static types are plain unit variants; tuples and opaque types form dynamic
/// families distinguished by their payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum QType {
    Unit,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Bytes,
    /// The type of types.
    QType,
    /// The type of expression operators.
    ExprOperator,
    /// A fixed-size heterogeneous tuple.
    Tuple(Arc<[QType]>),
    /// A type provided by an extension, identified by its name.
    Opaque(Arc<str>),
}

impl QType {
    /// Build a tuple qtype from its field types.
    pub fn tuple(fields: impl IntoIterator<Item = QType>) -> Self {
        QType::Tuple(fields.into_iter().collect())
    }

    /// Build an opaque qtype.
    pub fn opaque(name: &str) -> Self {
        QType::Opaque(Arc::from(name))
    }

    /// Human readable name, e.g. `INT64` or `tuple<INT32,TEXT>`.
    pub fn name(&self) -> String {
        match self {
            QType::Unit => "UNIT".to_string(),
            QType::Boolean => "BOOLEAN".to_string(),
            QType::Int32 => "INT32".to_string(),
            QType::Int64 => "INT64".to_string(),
            QType::Float32 => "FLOAT32".to_string(),
            QType::Float64 => "FLOAT64".to_string(),
            QType::Text => "TEXT".to_string(),
            QType::Bytes => "BYTES".to_string(),
            QType::QType => "QTYPE".to_string(),
            QType::ExprOperator => "EXPR_OPERATOR".to_string(),
            QType::Tuple(fields) => format!(
                "tuple<{}>",
                fields
                    .iter()
                    .map(QType::name)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            QType::Opaque(name) => name.to_string(),
        }
    }

    /// Key shared by every member of a dynamic qtype family; empty for static types.
    pub fn specialization_key(&self) -> &'static str {
        match self {
            QType::Tuple(_) => TUPLE_QTYPE_SPECIALIZATION_KEY,
            QType::Opaque(_) => OPAQUE_QTYPE_SPECIALIZATION_KEY,
            _ => "",
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        FingerprintHasher::new("::hyexpr::QType").combine(self).finish()
    }
}

impl std::fmt::Display for QType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Render a list of qtypes as `(A,B,C)`.
pub fn format_qtypes(qtypes: &[QType]) -> String {
    format!(
        "({})",
        qtypes.iter().map(QType::name).collect::<Vec<_>>().join(",")
    )
}
