use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::{
    QType, Value,
    error::{Error, Result},
    qtype::{OPAQUE_QTYPE_SPECIALIZATION_KEY, TUPLE_QTYPE_SPECIALIZATION_KEY},
};

use crate::{
    codec::{CodecRegistry, ValueDecoderInput},
    codecs::{decode_payload, encode_payload, expect_inputs},
    container::ValueProto,
    encode::Encoder,
    magic::QTYPE_CODEC,
};

/// Tuple qtypes and tuple values carry their fields as input values.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum QTypeProto {
    Unit,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Bytes,
    QType,
    ExprOperator,
    TupleQType,
    OpaqueQType(String),
    TupleValue,
}

/// Encode a `QTYPE` value or a tuple value.
pub fn encode_qtype_or_tuple(value: &Value, encoder: &mut Encoder<'_>) -> Result<ValueProto> {
    let mut input_value_indices = Vec::new();
    let proto = match value {
        Value::QType(qtype) => match qtype {
            QType::Unit => QTypeProto::Unit,
            QType::Boolean => QTypeProto::Boolean,
            QType::Int32 => QTypeProto::Int32,
            QType::Int64 => QTypeProto::Int64,
            QType::Float32 => QTypeProto::Float32,
            QType::Float64 => QTypeProto::Float64,
            QType::Text => QTypeProto::Text,
            QType::Bytes => QTypeProto::Bytes,
            QType::QType => QTypeProto::QType,
            QType::ExprOperator => QTypeProto::ExprOperator,
            QType::Tuple(fields) => {
                for field in fields.iter() {
                    input_value_indices.push(encoder.encode_value(&Value::QType(field.clone()))?);
                }
                QTypeProto::TupleQType
            }
            QType::Opaque(name) => QTypeProto::OpaqueQType(name.to_string()),
        },
        Value::Tuple(fields) => {
            for field in fields.iter() {
                input_value_indices.push(encoder.encode_value(field)?);
            }
            QTypeProto::TupleValue
        }
        other => {
            return Err(Error::Unimplemented(format!(
                "cannot serialize value: specialization_key='{}', qtype={}: {}",
                other.specialization_key(),
                other.qtype(),
                other.repr()
            )));
        }
    };
    Ok(ValueProto {
        codec_index: encoder.encode_codec(QTYPE_CODEC),
        payload: encode_payload(QTYPE_CODEC, &proto)?,
        input_value_indices,
        input_expr_indices: Vec::new(),
    })
}

pub fn decode_qtype_or_tuple(input: ValueDecoderInput<'_>) -> Result<Value> {
    let proto: QTypeProto = decode_payload(QTYPE_CODEC, input.payload)?;
    let fixed = |qtype: QType| -> Result<Value> {
        expect_inputs(&input, 0, 0)?;
        Ok(Value::QType(qtype))
    };
    match proto {
        QTypeProto::Unit => fixed(QType::Unit),
        QTypeProto::Boolean => fixed(QType::Boolean),
        QTypeProto::Int32 => fixed(QType::Int32),
        QTypeProto::Int64 => fixed(QType::Int64),
        QTypeProto::Float32 => fixed(QType::Float32),
        QTypeProto::Float64 => fixed(QType::Float64),
        QTypeProto::Text => fixed(QType::Text),
        QTypeProto::Bytes => fixed(QType::Bytes),
        QTypeProto::QType => fixed(QType::QType),
        QTypeProto::ExprOperator => fixed(QType::ExprOperator),
        QTypeProto::OpaqueQType(name) => fixed(QType::opaque(&name)),
        QTypeProto::TupleQType => {
            expect_inputs(&input, input.input_values.len(), 0)?;
            let fields = input
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
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::QType(QType::tuple(fields)))
        }
        QTypeProto::TupleValue => {
            expect_inputs(&input, input.input_values.len(), 0)?;
            Ok(Value::tuple(input.input_values.iter().cloned()))
        }
    }
}

pub fn register(registry: &CodecRegistry) -> Result<()> {
    registry.register_value_decoder(QTYPE_CODEC, Arc::new(decode_qtype_or_tuple))?;
    registry.register_value_encoder_by_qtype(QType::QType, Arc::new(encode_qtype_or_tuple))?;
    registry.register_value_encoder_by_key(
        TUPLE_QTYPE_SPECIALIZATION_KEY,
        Arc::new(encode_qtype_or_tuple),
    )?;
    registry.register_value_encoder_by_key(
        OPAQUE_QTYPE_SPECIALIZATION_KEY,
        Arc::new(encode_qtype_or_tuple),
    )?;
    Ok(())
}

crate::register_codec!(QTYPE_CODEC, register);
