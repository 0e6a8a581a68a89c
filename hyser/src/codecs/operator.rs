//! Codec for `EXPR_OPERATOR` values.
//!
//! Registered operators are stored by name only and resolved against the
//! operator registry when decoded. Lambdas carry their body as the single
//! input expression and their default values as input values. Backend
//! operators carry their signature as input values, inputs first and the
//! output last.
use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::{
    ExprOperator, QType, Value,
    error::{Error, Result},
    operator::{
        BACKEND_OPERATOR_SPECIALIZATION_KEY, LAMBDA_OPERATOR_SPECIALIZATION_KEY, Param,
        REGISTERED_OPERATOR_SPECIALIZATION_KEY,
    },
};

use crate::{
    codec::{CodecRegistry, ValueDecoderInput},
    codecs::{decode_payload, encode_payload, expect_inputs, qtype},
    container::ValueProto,
    encode::Encoder,
    magic::OPERATOR_CODEC,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum OperatorProto {
    Registered {
        name: String,
    },
    Lambda {
        name: String,
        param_names: Vec<String>,
        has_default: Vec<bool>,
        doc: String,
    },
    Backend {
        name: String,
        doc: String,
    },
}

pub fn encode_operator(value: &Value, encoder: &mut Encoder<'_>) -> Result<ValueProto> {
    let op = match value {
        Value::Operator(op) => op,
        Value::QType(_) => return qtype::encode_qtype_or_tuple(value, encoder),
        other => {
            return Err(Error::Unimplemented(format!(
                "{} does not support {}",
                OPERATOR_CODEC,
                other.qtype()
            )));
        }
    };

    let mut input_value_indices = Vec::new();
    let mut input_expr_indices = Vec::new();
    let proto = match op.as_ref() {
        ExprOperator::Registered(registered) => OperatorProto::Registered {
            name: registered.name.clone(),
        },
        ExprOperator::Lambda(lambda) => {
            for default in lambda.params.iter().filter_map(|p| p.default.as_ref()) {
                input_value_indices.push(encoder.encode_value(default)?);
            }
            input_expr_indices.push(encoder.encode_expr(&lambda.body)?);
            OperatorProto::Lambda {
                name: lambda.name.clone(),
                param_names: lambda.params.iter().map(|p| p.name.clone()).collect(),
                has_default: lambda.params.iter().map(|p| p.default.is_some()).collect(),
                doc: lambda.doc.clone(),
            }
        }
        ExprOperator::Backend(backend) => {
            let signature = &backend.signature;
            for qtype in signature.inputs.iter().chain([&signature.output]) {
                input_value_indices.push(encoder.encode_value(&Value::QType(qtype.clone()))?);
            }
            OperatorProto::Backend {
                name: backend.name.clone(),
                doc: backend.doc.clone(),
            }
        }
    };

    Ok(ValueProto {
        codec_index: encoder.encode_codec(OPERATOR_CODEC),
        payload: encode_payload(OPERATOR_CODEC, &proto)?,
        input_value_indices,
        input_expr_indices,
    })
}

pub fn decode_operator(input: ValueDecoderInput<'_>) -> Result<Value> {
    let op = match decode_payload::<OperatorProto>(OPERATOR_CODEC, input.payload)? {
        OperatorProto::Registered { name } => {
            expect_inputs(&input, 0, 0)?;
            input.operators.registered_operator(&name)?
        }
        OperatorProto::Lambda {
            name,
            param_names,
            has_default,
            doc,
        } => {
            if param_names.len() != has_default.len() {
                return Err(Error::InvalidArgument(format!(
                    "lambda {} has {} parameter names but {} default flags",
                    name,
                    param_names.len(),
                    has_default.len()
                )));
            }
            let ndefaults = has_default.iter().filter(|&&d| d).count();
            expect_inputs(&input, ndefaults, 1)?;

            let mut defaults = input.input_values.iter().cloned();
            let params = param_names
                .into_iter()
                .zip(has_default)
                .map(|(name, has_default)| Param {
                    name,
                    default: if has_default { defaults.next() } else { None },
                })
                .collect();
            ExprOperator::lambda(name, params, input.input_exprs[0].clone(), doc)?
        }
        OperatorProto::Backend { name, doc } => {
            let qtypes = input
                .input_values
                .iter()
                .enumerate()
                .map(|(i, value)| match value {
                    Value::QType(qtype) => Ok(qtype.clone()),
                    other => Err(Error::InvalidArgument(format!(
                        "expected a QTYPE in input_values[{}], got {}",
                        i,
                        other.qtype()
                    ))),
                })
                .collect::<Result<Vec<QType>>>()?;
            let Some((output, inputs)) = qtypes.split_last() else {
                return Err(Error::InvalidArgument(format!(
                    "backend operator {} is missing its output qtype",
                    name
                )));
            };
            expect_inputs(&input, qtypes.len(), 0)?;
            ExprOperator::backend(name, inputs.iter().cloned(), output.clone(), doc)
        }
    };
    Ok(Value::Operator(op))
}

pub fn register(registry: &CodecRegistry) -> Result<()> {
    registry.register_value_decoder(OPERATOR_CODEC, Arc::new(decode_operator))?;
    registry.register_value_encoder_by_qtype(QType::ExprOperator, Arc::new(encode_operator))?;
    for key in [
        REGISTERED_OPERATOR_SPECIALIZATION_KEY,
        LAMBDA_OPERATOR_SPECIALIZATION_KEY,
        BACKEND_OPERATOR_SPECIALIZATION_KEY,
    ] {
        registry.register_value_encoder_by_key(key, Arc::new(encode_operator))?;
    }
    Ok(())
}

crate::register_codec!(OPERATOR_CODEC, register);
