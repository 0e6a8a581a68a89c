//! Immutable, runtime-typed values.
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use strum::{EnumIs, EnumTryAs};

use crate::{
    fingerprint::{Fingerprint, FingerprintHasher},
    operator::OperatorPtr,
    qtype::QType,
};

/// Extension point for value kinds the core knows nothing about.
///
/// Implementors provide their own qtype and fingerprint; a codec registered
/// for the qtype (or the specialization key) takes care of the wire payload.
pub trait OpaqueValue: DowncastSync + std::fmt::Debug {
    fn qtype(&self) -> QType;

    fn fingerprint(&self) -> Fingerprint;

    fn specialization_key(&self) -> &str {
        ""
    }

    fn repr(&self) -> String {
        format!("{:?}", self)
    }
}
impl_downcast!(sync OpaqueValue);

/// An immutable datum tagged with its runtime type.
///
/// Cloning is cheap: every heap payload sits behind an [`Arc`]. Equality is
/// fingerprint equality, so `Float64(NAN) == Float64(NAN)` holds and `0.0`
/// differs from `-0.0`.
#[derive(Debug, Clone, EnumIs, EnumTryAs)]
pub enum Value {
    Unit,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
    QType(QType),
    Operator(OperatorPtr),
    Tuple(Arc<[Value]>),
    Opaque(Arc<dyn OpaqueValue>),
}

impl Value {
    pub fn text(text: &str) -> Self {
        Value::Text(Arc::from(text))
    }

    pub fn bytes(bytes: &[u8]) -> Self {
        Value::Bytes(Arc::from(bytes))
    }

    pub fn tuple(fields: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(fields.into_iter().collect())
    }

    pub fn opaque(value: impl OpaqueValue) -> Self {
        Value::Opaque(Arc::new(value))
    }

    /// Runtime type of this value.
    pub fn qtype(&self) -> QType {
        match self {
            Value::Unit => QType::Unit,
            Value::Boolean(_) => QType::Boolean,
            Value::Int32(_) => QType::Int32,
            Value::Int64(_) => QType::Int64,
            Value::Float32(_) => QType::Float32,
            Value::Float64(_) => QType::Float64,
            Value::Text(_) => QType::Text,
            Value::Bytes(_) => QType::Bytes,
            Value::QType(_) => QType::QType,
            Value::Operator(_) => QType::ExprOperator,
            Value::Tuple(fields) => QType::tuple(fields.iter().map(Value::qtype)),
            Value::Opaque(opaque) => opaque.qtype(),
        }
    }

    /// Refinement tag used when dispatching to an encoder. Operators report
    /// their kind, opaque values whatever they declare; everything else is
    /// empty.
    pub fn specialization_key(&self) -> &str {
        match self {
            Value::Operator(op) => op.specialization_key(),
            Value::Opaque(opaque) => opaque.specialization_key(),
            _ => "",
        }
    }

    /// Stable hash over the runtime type and the payload.
    pub fn fingerprint(&self) -> Fingerprint {
        let hasher = FingerprintHasher::new("::hyexpr::Value").combine(&self.qtype());
        match self {
            Value::Unit => hasher.finish(),
            Value::Boolean(v) => hasher.combine(v).finish(),
            Value::Int32(v) => hasher.combine(v).finish(),
            Value::Int64(v) => hasher.combine(v).finish(),
            Value::Float32(v) => hasher.combine(&v.to_bits()).finish(),
            Value::Float64(v) => hasher.combine(&v.to_bits()).finish(),
            Value::Text(v) => hasher.combine(&**v).finish(),
            Value::Bytes(v) => hasher.combine(&**v).finish(),
            Value::QType(v) => hasher.combine(v).finish(),
            Value::Operator(op) => hasher.combine_fingerprint(op.fingerprint()).finish(),
            Value::Tuple(fields) => hasher
                .combine_all(fields.iter().map(Value::fingerprint))
                .finish(),
            Value::Opaque(opaque) => hasher.combine_fingerprint(opaque.fingerprint()).finish(),
        }
    }

    /// Short, human readable representation.
    pub fn repr(&self) -> String {
        match self {
            Value::Unit => "unit".to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::Int32(v) => format!("int32{{{}}}", v),
            Value::Int64(v) => format!("int64{{{}}}", v),
            Value::Float32(v) => format!("float32{{{}}}", v),
            Value::Float64(v) => format!("float64{{{}}}", v),
            Value::Text(v) => format!("{:?}", v),
            Value::Bytes(v) => format!("b{:?}", v),
            Value::QType(v) => v.name(),
            Value::Operator(op) => op.display_name().to_string(),
            Value::Tuple(fields) => format!(
                "({})",
                fields.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
            ),
            Value::Opaque(opaque) => opaque.repr(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Value {}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl From<QType> for Value {
    fn from(value: QType) -> Self {
        Value::QType(value)
    }
}

impl From<OperatorPtr> for Value {
    fn from(value: OperatorPtr) -> Self {
        Value::Operator(value)
    }
}
