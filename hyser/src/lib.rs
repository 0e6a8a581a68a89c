//! Serialization container format for DAGs of values and expressions, and
//! the operator packages built on top of it.
//!
//! A [`Container`](container::Container) is a linear program of decoding
//! steps. [`encode`](encode::encode) produces one from values and
//! expressions, emitting every shared sub-graph once;
//! [`decode`](decode::decode) replays it. Value payloads are produced and
//! consumed by named codecs looked up in a [`CodecRegistry`](codec::CodecRegistry).
//!
//! ```rust
//! use hyexpr::{ExprNode, ExprOperator, OperatorRegistry, QType, Value};
//! use hyser::{codec::CodecRegistry, decode::decode, encode::encode};
//!
//! let codecs = CodecRegistry::with_builtin_codecs().unwrap();
//! let operators = OperatorRegistry::new();
//!
//! let add = ExprOperator::backend("math.add", [QType::Int64, QType::Int64], QType::Int64, "");
//! let x = ExprNode::leaf("x");
//! let expr = ExprNode::call_op(add, [x.clone(), x]);
//!
//! let container = encode(&[Value::Int64(7)], &[expr.clone()], &codecs).unwrap();
//! let result = decode(&container, &codecs, &operators).unwrap();
//! assert_eq!(result.values, vec![Value::Int64(7)]);
//! assert_eq!(result.exprs[0].fingerprint(), expr.fingerprint());
//! ```

pub extern crate inventory;

pub mod codec;
pub mod codecs;
pub mod config;
pub mod container;
pub mod decode;
pub mod encode;
pub mod magic;
pub mod package;
