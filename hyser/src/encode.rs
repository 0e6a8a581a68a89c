//! Container encoding.
//!
//! The encoder walks values and expressions depth first and emits each
//! distinct entity (by fingerprint) exactly once, so shared sub-graphs stay
//! shared on the wire. Codecs are declared the first time they are needed.
use std::collections::HashMap;

use hyexpr::{
    ExprKind, ExprNodePtr, Value,
    error::{Error, Result},
    expr::post_order,
    fingerprint::Fingerprint,
};
use log::{debug, trace};

use crate::{
    codec::CodecRegistry,
    container::{Container, ContainerBuilder, DecodingStep},
};

pub struct Encoder<'a> {
    codecs: &'a CodecRegistry,
    builder: ContainerBuilder,
    codec_indices: HashMap<String, u64>,
    value_indices: HashMap<Fingerprint, u64>,
    expr_indices: HashMap<Fingerprint, u64>,
    nvalues: u64,
    nexprs: u64,
}

impl<'a> Encoder<'a> {
    pub fn new(codecs: &'a CodecRegistry) -> Self {
        Self {
            codecs,
            builder: ContainerBuilder::new(),
            codec_indices: HashMap::new(),
            value_indices: HashMap::new(),
            expr_indices: HashMap::new(),
            nvalues: 0,
            nexprs: 0,
        }
    }

    /// Index of codec `name` in the codec table, declaring it on first use.
    pub fn encode_codec(&mut self, name: &str) -> u64 {
        if let Some(&index) = self.codec_indices.get(name) {
            return index;
        }
        let index = self.builder.add(DecodingStep::Codec {
            name: name.to_string(),
        });
        trace!("Declared codec {} at index {}", name, index);
        self.codec_indices.insert(name.to_string(), index);
        index
    }

    /// Emit `value` (and whatever it is built from) unless an equal value
    /// was already emitted; returns its index in the value sequence.
    pub fn encode_value(&mut self, value: &Value) -> Result<u64> {
        let fingerprint = value.fingerprint();
        if let Some(&index) = self.value_indices.get(&fingerprint) {
            return Ok(index);
        }
        let encoder = self.codecs.find_value_encoder(value)?;
        let proto = encoder(value, self)?;
        self.builder.add(DecodingStep::Value(proto));
        Ok(self.push_value(fingerprint))
    }

    /// Emit `root` and every node it depends on; returns the index of
    /// `root` in the expression sequence.
    pub fn encode_expr(&mut self, root: &ExprNodePtr) -> Result<u64> {
        if let Some(&index) = self.expr_indices.get(&root.fingerprint()) {
            return Ok(index);
        }
        for node in post_order(root) {
            if self.expr_indices.contains_key(&node.fingerprint()) {
                continue;
            }
            let step = match node.kind() {
                ExprKind::Literal(value) => DecodingStep::LiteralNode {
                    literal_value_index: self.encode_value(value)?,
                },
                ExprKind::Leaf(key) => DecodingStep::LeafNode {
                    leaf_key: key.clone(),
                },
                ExprKind::Placeholder(key) => DecodingStep::PlaceholderNode {
                    placeholder_key: key.clone(),
                },
                ExprKind::Operator { op, deps } => {
                    let operator_value_index = self.encode_value(&Value::Operator(op.clone()))?;
                    let input_expr_indices = deps
                        .iter()
                        .map(|dep| self.emitted_expr_index(dep))
                        .collect::<Result<Vec<_>>>()?;
                    DecodingStep::OperatorNode {
                        operator_value_index,
                        input_expr_indices,
                    }
                }
            };
            self.builder.add(step);
            self.push_expr(node.fingerprint());
        }
        self.emitted_expr_index(root)
    }

    /// Publish an already emitted value.
    pub fn publish_value(&mut self, index: u64) {
        self.builder.add(DecodingStep::OutputValueIndex(index));
    }

    /// Publish an already emitted expression.
    pub fn publish_expr(&mut self, index: u64) {
        self.builder.add(DecodingStep::OutputExprIndex(index));
    }

    pub fn finish(self) -> Container {
        debug!(
            "Encoded {} values and {} exprs using {} codecs",
            self.nvalues,
            self.nexprs,
            self.codec_indices.len()
        );
        self.builder.finish()
    }

    fn push_value(&mut self, fingerprint: Fingerprint) -> u64 {
        let index = self.nvalues;
        self.nvalues += 1;
        self.value_indices.insert(fingerprint, index);
        index
    }

    fn push_expr(&mut self, fingerprint: Fingerprint) -> u64 {
        let index = self.nexprs;
        self.nexprs += 1;
        self.expr_indices.insert(fingerprint, index);
        index
    }

    fn emitted_expr_index(&self, node: &ExprNodePtr) -> Result<u64> {
        self.expr_indices
            .get(&node.fingerprint())
            .copied()
            .ok_or_else(|| Error::Internal(format!("expression {} was not emitted", node)))
    }
}

/// A root to encode, see [`encode_roots`].
#[derive(Debug, Clone)]
pub enum Root {
    Value(Value),
    Expr(ExprNodePtr),
}

impl From<Value> for Root {
    fn from(value: Value) -> Self {
        Root::Value(value)
    }
}

impl From<ExprNodePtr> for Root {
    fn from(expr: ExprNodePtr) -> Self {
        Root::Expr(expr)
    }
}

/// Encode `roots`, publishing each one once all of them are emitted. The
/// same root listed twice is published twice.
pub fn encode_roots(roots: &[Root], codecs: &CodecRegistry) -> Result<Container> {
    let mut encoder = Encoder::new(codecs);
    let mut outputs = Vec::with_capacity(roots.len());
    for root in roots {
        outputs.push(match root {
            Root::Value(value) => DecodingStep::OutputValueIndex(encoder.encode_value(value)?),
            Root::Expr(expr) => DecodingStep::OutputExprIndex(encoder.encode_expr(expr)?),
        });
    }
    for output in outputs {
        encoder.builder.add(output);
    }
    Ok(encoder.finish())
}

/// Encode `values` then `exprs`, publishing them in the given order.
pub fn encode(
    values: &[Value],
    exprs: &[ExprNodePtr],
    codecs: &CodecRegistry,
) -> Result<Container> {
    let roots: Vec<Root> = values
        .iter()
        .cloned()
        .map(Root::Value)
        .chain(exprs.iter().cloned().map(Root::Expr))
        .collect();
    encode_roots(&roots, codecs)
}
