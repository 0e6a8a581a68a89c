//! Container decoding.
//!
//! The decoder is a single pass over the container. It keeps two
//! append-only arenas, one for values and one for expressions, and every
//! reference in a step is an index into one of them. A step may only refer
//! to entries produced by earlier steps.
use hyexpr::{
    ExprNode, ExprNodePtr, OperatorRegistry, Value,
    error::{Error, Result, ResultExt},
};
use log::{debug, trace};

use crate::{
    codec::{CodecRegistry, ValueDecoderFn, ValueDecoderInput},
    container::{Container, ContainerProcessor, DecodingStep, ValueProto, process_container},
    magic::CONTAINER_VERSION,
};

/// Published outputs of a container, in publication order.
#[derive(Debug, Clone, Default)]
pub struct DecodeResult {
    pub values: Vec<Value>,
    pub exprs: Vec<ExprNodePtr>,
}

struct CodecEntry {
    name: String,
    decoder: ValueDecoderFn,
}

/// Step-by-step decoder; most callers want [`decode`].
pub struct Decoder<'a> {
    codecs: &'a CodecRegistry,
    operators: &'a OperatorRegistry,
    codec_table: Vec<CodecEntry>,
    decoded_values: Vec<Value>,
    decoded_exprs: Vec<ExprNodePtr>,
    result: DecodeResult,
}

impl<'a> Decoder<'a> {
    pub fn new(codecs: &'a CodecRegistry, operators: &'a OperatorRegistry) -> Self {
        Self {
            codecs,
            operators,
            codec_table: Vec::new(),
            decoded_values: Vec::new(),
            decoded_exprs: Vec::new(),
            result: DecodeResult::default(),
        }
    }

    pub fn finish(self) -> DecodeResult {
        self.result
    }

    fn value_at(&self, index: u64) -> Result<&Value> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.decoded_values.get(i))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("value index is out of range: {}", index))
            })
    }

    fn expr_at(&self, index: u64) -> Result<&ExprNodePtr> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.decoded_exprs.get(i))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("expr index is out of range: {}", index))
            })
    }

    fn codec_at(&self, index: u64) -> Result<&CodecEntry> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.codec_table.get(i))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("codec index is out of range: {}", index))
            })
    }

    fn declare_codec(&mut self, name: &str) -> Result<()> {
        let decoder = self.codecs.find_value_decoder(name)?;
        trace!("codecs[{}] = {}", self.codec_table.len(), name);
        self.codec_table.push(CodecEntry {
            name: name.to_string(),
            decoder,
        });
        Ok(())
    }

    fn decode_value(&self, proto: &ValueProto) -> Result<Value> {
        let codec = self.codec_at(proto.codec_index)?;
        let input_values = proto
            .input_value_indices
            .iter()
            .map(|&i| self.value_at(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        let input_exprs = proto
            .input_expr_indices
            .iter()
            .map(|&i| self.expr_at(i).cloned())
            .collect::<Result<Vec<_>>>()?;

        (codec.decoder)(ValueDecoderInput {
            payload: &proto.payload,
            input_values: &input_values,
            input_exprs: &input_exprs,
            operators: self.operators,
        })
        .with_context(|| format!("codecs[{}]={}", proto.codec_index, codec.name))
    }

    fn decode_operator_node(
        &self,
        operator_value_index: u64,
        input_expr_indices: &[u64],
    ) -> Result<ExprNodePtr> {
        let op = match self.value_at(operator_value_index)? {
            Value::Operator(op) => op.clone(),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "expected a value of EXPR_OPERATOR type in decoded_values[{}], got {}",
                    operator_value_index,
                    other.qtype()
                )));
            }
        };
        let deps = input_expr_indices
            .iter()
            .map(|&i| self.expr_at(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(ExprNode::call_op(op, deps))
    }
}

/// Log form of a step. Payloads are summarized by their size.
struct StepSummary<'a>(&'a DecodingStep);

impl std::fmt::Display for StepSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            DecodingStep::Value(proto) => write!(
                f,
                "value: codecs[{}], {} payload bytes, input values {:?}, input exprs {:?}",
                proto.codec_index,
                proto.payload.len(),
                proto.input_value_indices,
                proto.input_expr_indices
            ),
            other => write!(f, "{:?}", other),
        }
    }
}

impl ContainerProcessor for Decoder<'_> {
    fn process(&mut self, step: &DecodingStep) -> Result<()> {
        trace!("Decoding {}", StepSummary(step));
        match step {
            DecodingStep::Codec { name } => self.declare_codec(name)?,
            DecodingStep::LeafNode { leaf_key } => {
                self.decoded_exprs.push(ExprNode::leaf(leaf_key.as_str()));
            }
            DecodingStep::PlaceholderNode { placeholder_key } => {
                self.decoded_exprs
                    .push(ExprNode::placeholder(placeholder_key.as_str()));
            }
            DecodingStep::LiteralNode {
                literal_value_index,
            } => {
                let value = self.value_at(*literal_value_index)?.clone();
                self.decoded_exprs.push(ExprNode::literal(value));
            }
            DecodingStep::OperatorNode {
                operator_value_index,
                input_expr_indices,
            } => {
                let node = self.decode_operator_node(*operator_value_index, input_expr_indices)?;
                self.decoded_exprs.push(node);
            }
            DecodingStep::Value(proto) => {
                let value = self.decode_value(proto)?;
                self.decoded_values.push(value);
            }
            DecodingStep::OutputValueIndex(index) => {
                let value = self.value_at(*index)?.clone();
                self.result.values.push(value);
            }
            DecodingStep::OutputExprIndex(index) => {
                let expr = self.expr_at(*index)?.clone();
                self.result.exprs.push(expr);
            }
        }
        Ok(())
    }
}

/// Decode `container`, resolving codecs in `codecs` and registered operator
/// references in `operators`.
pub fn decode(
    container: &Container,
    codecs: &CodecRegistry,
    operators: &OperatorRegistry,
) -> Result<DecodeResult> {
    if container.version != CONTAINER_VERSION {
        return Err(Error::InvalidArgument(format!(
            "expected container.version to be {}, got {}",
            CONTAINER_VERSION, container.version
        )));
    }
    let mut decoder = Decoder::new(codecs, operators);
    process_container(container, &mut decoder)?;
    let result = decoder.finish();
    debug!(
        "Decoded container with {} steps into {} values and {} exprs",
        container.decoding_steps.len(),
        result.values.len(),
        result.exprs.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerBuilder;

    fn registries() -> (CodecRegistry, OperatorRegistry) {
        (
            CodecRegistry::with_builtin_codecs().unwrap(),
            OperatorRegistry::new(),
        )
    }

    #[test]
    fn version_gate() {
        let (codecs, operators) = registries();
        let container = Container {
            version: 2,
            ..Default::default()
        };
        let err = decode(&container, &codecs, &operators).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.message(), "expected container.version to be 1, got 2");
    }

    #[test]
    fn unknown_codec_fails_at_declaration() {
        let (codecs, operators) = registries();
        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::Codec { name: "foo".into() });
        let err = decode(&builder.finish(), &codecs, &operators).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), "unknown codec: \"foo\"; while handling codecs[0]");
    }

    #[test]
    fn references_must_point_backwards() {
        let (codecs, operators) = registries();

        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::Value(ValueProto {
            codec_index: 0,
            ..Default::default()
        }));
        let err = decode(&builder.finish(), &codecs, &operators).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(
            err.message(),
            "codec index is out of range: 0; while handling decoding_steps[0]"
        );

        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::LiteralNode {
            literal_value_index: 0,
        });
        let err = decode(&builder.finish(), &codecs, &operators).unwrap_err();
        assert_eq!(
            err.message(),
            "value index is out of range: 0; while handling decoding_steps[1]"
        );

        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::OutputExprIndex(0));
        builder.add(DecodingStep::OutputExprIndex(1));
        let err = decode(&builder.finish(), &codecs, &operators).unwrap_err();
        assert_eq!(
            err.message(),
            "expr index is out of range: 1; while handling output_expr_indices[1]"
        );
    }

    #[test]
    fn value_and_expr_indices_are_independent() {
        let (codecs, operators) = registries();
        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::OutputValueIndex(0));
        let err = decode(&builder.finish(), &codecs, &operators).unwrap_err();
        assert_eq!(
            err.message(),
            "value index is out of range: 0; while handling output_value_indices[0]"
        );
    }

    #[test]
    fn step_summaries_omit_payloads() {
        let step = DecodingStep::Value(ValueProto {
            codec_index: 3,
            payload: vec![0xab; 4096],
            input_value_indices: vec![0, 1],
            input_expr_indices: vec![2],
        });
        assert_eq!(
            StepSummary(&step).to_string(),
            "value: codecs[3], 4096 payload bytes, input values [0, 1], input exprs [2]"
        );

        let step = DecodingStep::LeafNode { leaf_key: "x".into() };
        assert_eq!(StepSummary(&step).to_string(), format!("{:?}", step));
    }

    #[test]
    fn outputs_may_repeat() {
        let (codecs, operators) = registries();
        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::PlaceholderNode {
            placeholder_key: "p".into(),
        });
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::OutputExprIndex(1));
        builder.add(DecodingStep::OutputExprIndex(0));
        builder.add(DecodingStep::OutputExprIndex(1));
        let result = decode(&builder.finish(), &codecs, &operators).unwrap();

        let rendered: Vec<String> = result.exprs.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["L.x", "P.p", "L.x"]);
        assert!(result.values.is_empty());
    }
}
