//! Container model.
//!
//! A [`Container`] is a flat, linear program. Every [`DecodingStep`] either
//! declares a codec, appends one entry to the value sequence or to the
//! expression sequence, or publishes an already decoded entry as an output.
//! References always point backwards, and values and expressions live in
//! two independent index spaces.
//!
//! The codec table and the output lists are stored apart from the decoding
//! steps. [`process_container`] replays them in a fixed order (codecs,
//! decoding steps, output values, output expressions) so that a consumer
//! can treat a container as a single stream.
use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::error::{Error, Result, ResultExt};
use log::trace;

use crate::magic::CONTAINER_VERSION;

/// Payload of a value step: the codec to use plus its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValueProto {
    /// Index into the codec table.
    pub codec_index: u64,
    /// Opaque bytes interpreted by the codec.
    pub payload: Vec<u8>,
    /// Previously decoded values this value is built from.
    pub input_value_indices: Vec<u64>,
    /// Previously decoded expressions this value is built from.
    pub input_expr_indices: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum DecodingStep {
    /// Declare a codec; appends to the codec table.
    Codec { name: String },
    /// Append `L.<leaf_key>` to the expression sequence.
    LeafNode { leaf_key: String },
    /// Append `P.<placeholder_key>` to the expression sequence.
    PlaceholderNode { placeholder_key: String },
    /// Append a literal expression wrapping an already decoded value.
    LiteralNode { literal_value_index: u64 },
    /// Append an operator application. The operator is an already decoded
    /// `EXPR_OPERATOR` value.
    OperatorNode {
        operator_value_index: u64,
        input_expr_indices: Vec<u64>,
    },
    /// Decode a value through a codec; appends to the value sequence.
    Value(ValueProto),
    /// Publish a decoded value.
    OutputValueIndex(u64),
    /// Publish a decoded expression.
    OutputExprIndex(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Container {
    pub version: u32,
    pub codecs: Vec<String>,
    pub decoding_steps: Vec<DecodingStep>,
    pub output_value_indices: Vec<u64>,
    pub output_expr_indices: Vec<u64>,
}

impl Container {
    /// Serialize to the binary wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| Error::Internal(format!("unable to serialize a container: {}", e)))
    }

    /// Parse the binary wire form. No semantic validation happens here; that
    /// is the decoder's job.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes)
            .map_err(|e| Error::InvalidArgument(format!("unable to parse a container: {}", e)))
    }
}

/// Incremental [`Container`] construction.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `step` and return its index within the list it landed in:
    /// the codec table for codec declarations, the matching output list for
    /// outputs, the decoding steps otherwise.
    pub fn add(&mut self, step: DecodingStep) -> u64 {
        let c = &mut self.container;
        match step {
            DecodingStep::Codec { name } => {
                c.codecs.push(name);
                c.codecs.len() as u64 - 1
            }
            DecodingStep::OutputValueIndex(index) => {
                c.output_value_indices.push(index);
                c.output_value_indices.len() as u64 - 1
            }
            DecodingStep::OutputExprIndex(index) => {
                c.output_expr_indices.push(index);
                c.output_expr_indices.len() as u64 - 1
            }
            step => {
                c.decoding_steps.push(step);
                c.decoding_steps.len() as u64 - 1
            }
        }
    }

    pub fn finish(mut self) -> Container {
        self.container.version = CONTAINER_VERSION;
        self.container
    }
}

/// Consumer of a replayed container.
pub trait ContainerProcessor {
    fn process(&mut self, step: &DecodingStep) -> Result<()>;
}

/// Replay `container` into `processor`, annotating every failure with the
/// position of the step that caused it.
pub fn process_container<P: ContainerProcessor + ?Sized>(
    container: &Container,
    processor: &mut P,
) -> Result<()> {
    trace!(
        "Replaying container: {} codecs, {} steps, {} value outputs, {} expr outputs",
        container.codecs.len(),
        container.decoding_steps.len(),
        container.output_value_indices.len(),
        container.output_expr_indices.len()
    );

    for (i, name) in container.codecs.iter().enumerate() {
        processor
            .process(&DecodingStep::Codec { name: name.clone() })
            .with_context(|| format!("while handling codecs[{}]", i))?;
    }
    for (i, step) in container.decoding_steps.iter().enumerate() {
        processor
            .process(step)
            .with_context(|| format!("while handling decoding_steps[{}]", i))?;
    }
    for (i, &index) in container.output_value_indices.iter().enumerate() {
        processor
            .process(&DecodingStep::OutputValueIndex(index))
            .with_context(|| format!("while handling output_value_indices[{}]", i))?;
    }
    for (i, &index) in container.output_expr_indices.iter().enumerate() {
        processor
            .process(&DecodingStep::OutputExprIndex(index))
            .with_context(|| format!("while handling output_expr_indices[{}]", i))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<DecodingStep>);

    impl ContainerProcessor for Recorder {
        fn process(&mut self, step: &DecodingStep) -> Result<()> {
            if let DecodingStep::LeafNode { leaf_key } = step {
                if leaf_key == "bad" {
                    return Err(Error::InvalidArgument("bad leaf".into()));
                }
            }
            self.0.push(step.clone());
            Ok(())
        }
    }

    #[test]
    fn builder_routes_steps() {
        let mut builder = ContainerBuilder::new();
        assert_eq!(builder.add(DecodingStep::Codec { name: "a".into() }), 0);
        assert_eq!(builder.add(DecodingStep::LeafNode { leaf_key: "x".into() }), 0);
        assert_eq!(builder.add(DecodingStep::Codec { name: "b".into() }), 1);
        assert_eq!(builder.add(DecodingStep::OutputExprIndex(0)), 0);
        assert_eq!(builder.add(DecodingStep::OutputExprIndex(0)), 1);
        let container = builder.finish();

        assert_eq!(container.version, 1);
        assert_eq!(container.codecs, vec!["a", "b"]);
        assert_eq!(container.decoding_steps.len(), 1);
        assert_eq!(container.output_expr_indices, vec![0, 0]);
        assert!(container.output_value_indices.is_empty());
    }

    #[test]
    fn replay_order_and_context() {
        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::OutputExprIndex(0));
        builder.add(DecodingStep::Codec { name: "c".into() });
        let container = builder.finish();

        let mut recorder = Recorder::default();
        process_container(&container, &mut recorder).unwrap();
        assert_eq!(
            recorder.0,
            vec![
                DecodingStep::Codec { name: "c".into() },
                DecodingStep::LeafNode { leaf_key: "x".into() },
                DecodingStep::OutputExprIndex(0),
            ]
        );

        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::LeafNode { leaf_key: "x".into() });
        builder.add(DecodingStep::LeafNode { leaf_key: "bad".into() });
        let err = process_container(&builder.finish(), &mut Recorder::default()).unwrap_err();
        assert_eq!(err.message(), "bad leaf; while handling decoding_steps[1]");
    }

    #[test]
    fn wire_bytes_are_checked() {
        let mut builder = ContainerBuilder::new();
        builder.add(DecodingStep::PlaceholderNode {
            placeholder_key: "p".into(),
        });
        let container = builder.finish();
        let bytes = container.to_bytes().unwrap();
        assert_eq!(Container::from_bytes(&bytes).unwrap(), container);

        let err = Container::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
