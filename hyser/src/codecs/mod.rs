//! Built-in codecs.
//!
//! | codec | values |
//! |---|---|
//! | `hyser.codecs.scalar.v1` | `UNIT`, `BOOLEAN`, integers, floats, `TEXT`, `BYTES` |
//! | `hyser.codecs.qtype.v1` | `QTYPE` values and tuples |
//! | `hyser.codecs.operator.v1` | `EXPR_OPERATOR` values |
//!
//! Encoders registered for a static qtype are also consulted for the qtype
//! value itself (`Value::QType(INT64)` dispatches on `INT64`), so every
//! encoder below forwards qtype values to the qtype codec.
use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::error::{Error, Result};

use crate::codec::{CodecRegistry, ValueDecoderInput};

pub mod operator;
pub mod qtype;
pub mod scalar;

/// Register the scalar, qtype and operator codecs into `registry`.
pub fn register_builtin_codecs(registry: &CodecRegistry) -> Result<()> {
    scalar::register(registry)?;
    qtype::register(registry)?;
    operator::register(registry)?;
    Ok(())
}

pub(crate) fn encode_payload<T: BorshSerialize>(codec: &str, payload: &T) -> Result<Vec<u8>> {
    borsh::to_vec(payload)
        .map_err(|e| Error::Internal(format!("unable to serialize a {} payload: {}", codec, e)))
}

pub(crate) fn decode_payload<T: BorshDeserialize>(codec: &str, bytes: &[u8]) -> Result<T> {
    borsh::from_slice(bytes)
        .map_err(|e| Error::InvalidArgument(format!("unable to parse a {} payload: {}", codec, e)))
}

/// Fail unless the decoder got exactly the expected number of inputs.
pub(crate) fn expect_inputs(
    input: &ValueDecoderInput<'_>,
    nvalues: usize,
    nexprs: usize,
) -> Result<()> {
    if input.input_values.len() != nvalues || input.input_exprs.len() != nexprs {
        return Err(Error::InvalidArgument(format!(
            "expected {} input values and {} input exprs, got {} and {}",
            nvalues,
            nexprs,
            input.input_values.len(),
            input.input_exprs.len()
        )));
    }
    Ok(())
}
