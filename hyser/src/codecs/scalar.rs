use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::{
    QType, Value,
    error::{Error, Result},
};

use crate::{
    codec::{CodecRegistry, ValueDecoderInput},
    codecs::{decode_payload, encode_payload, expect_inputs, qtype},
    container::ValueProto,
    encode::Encoder,
    magic::SCALAR_CODEC,
};

/// Floats travel as raw bits so that NaN payloads and signed zeros survive.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ScalarProto {
    Unit,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(u32),
    Float64(u64),
    Text(String),
    Bytes(Vec<u8>),
}

const SCALAR_QTYPES: [QType; 8] = [
    QType::Unit,
    QType::Boolean,
    QType::Int32,
    QType::Int64,
    QType::Float32,
    QType::Float64,
    QType::Text,
    QType::Bytes,
];

pub fn encode_scalar(value: &Value, encoder: &mut Encoder<'_>) -> Result<ValueProto> {
    let proto = match value {
        Value::QType(_) => return qtype::encode_qtype_or_tuple(value, encoder),
        Value::Unit => ScalarProto::Unit,
        Value::Boolean(v) => ScalarProto::Boolean(*v),
        Value::Int32(v) => ScalarProto::Int32(*v),
        Value::Int64(v) => ScalarProto::Int64(*v),
        Value::Float32(v) => ScalarProto::Float32(v.to_bits()),
        Value::Float64(v) => ScalarProto::Float64(v.to_bits()),
        Value::Text(v) => ScalarProto::Text(v.to_string()),
        Value::Bytes(v) => ScalarProto::Bytes(v.to_vec()),
        other => {
            return Err(Error::Unimplemented(format!(
                "{} does not support {}",
                SCALAR_CODEC,
                other.qtype()
            )));
        }
    };
    Ok(ValueProto {
        codec_index: encoder.encode_codec(SCALAR_CODEC),
        payload: encode_payload(SCALAR_CODEC, &proto)?,
        ..Default::default()
    })
}

pub fn decode_scalar(input: ValueDecoderInput<'_>) -> Result<Value> {
    expect_inputs(&input, 0, 0)?;
    Ok(match decode_payload::<ScalarProto>(SCALAR_CODEC, input.payload)? {
        ScalarProto::Unit => Value::Unit,
        ScalarProto::Boolean(v) => Value::Boolean(v),
        ScalarProto::Int32(v) => Value::Int32(v),
        ScalarProto::Int64(v) => Value::Int64(v),
        ScalarProto::Float32(bits) => Value::Float32(f32::from_bits(bits)),
        ScalarProto::Float64(bits) => Value::Float64(f64::from_bits(bits)),
        ScalarProto::Text(v) => Value::text(&v),
        ScalarProto::Bytes(v) => Value::bytes(&v),
    })
}

pub fn register(registry: &CodecRegistry) -> Result<()> {
    registry.register_value_decoder(SCALAR_CODEC, Arc::new(decode_scalar))?;
    for qtype in SCALAR_QTYPES {
        registry.register_value_encoder_by_qtype(qtype, Arc::new(encode_scalar))?;
    }
    Ok(())
}

crate::register_codec!(SCALAR_CODEC, register);
