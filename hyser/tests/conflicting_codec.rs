//! An announced codec that clashes with a builtin one.
//!
//! Lives in its own test binary: every test linked next to this announcement
//! would otherwise see a broken inventory.
use std::sync::Arc;

use hyexpr::{QType, Value, error::Result};
use hyser::{
    codec::{CodecRegistry, ValueDecoderInput},
    container::ValueProto,
    encode::Encoder,
};

const SHADOW_CODEC: &str = "tests.codecs.shadow_int64.v1";

fn decode_shadow(_: ValueDecoderInput<'_>) -> Result<Value> {
    Ok(Value::Int64(0))
}

fn encode_shadow(_: &Value, encoder: &mut Encoder<'_>) -> Result<ValueProto> {
    Ok(ValueProto {
        codec_index: encoder.encode_codec(SHADOW_CODEC),
        ..Default::default()
    })
}

fn register(registry: &CodecRegistry) -> Result<()> {
    registry.register_value_decoder(SHADOW_CODEC, Arc::new(decode_shadow))?;
    // INT64 already belongs to the builtin scalar codec.
    registry.register_value_encoder_by_qtype(QType::Int64, Arc::new(encode_shadow))
}

hyser::register_codec!(SHADOW_CODEC, register);

const EXPECTED: &str = "value encoder for qtype=INT64 has already been registered; \
                        while registering codec tests.codecs.shadow_int64.v1";

#[test]
fn conflicting_registration_fails_the_inventory() {
    let err = match CodecRegistry::from_inventory() {
        Ok(_) => panic!("expected the duplicate INT64 encoder to be rejected"),
        Err(err) => err,
    };
    assert!(err.is_invalid_argument());
    assert_eq!(err.message(), EXPECTED);
}

#[test]
fn global_registry_reports_the_failure_on_every_call() {
    for _ in 0..2 {
        let err = match CodecRegistry::global() {
            Ok(_) => panic!("expected the global registry to be unavailable"),
            Err(err) => err,
        };
        assert!(err.is_invalid_argument());
        assert_eq!(err.message(), EXPECTED);
    }
}

#[test]
fn explicit_registries_are_unaffected() {
    let codecs = CodecRegistry::with_builtin_codecs().unwrap();
    assert!(!codecs.has_value_decoder(SHADOW_CODEC));
    assert!(codecs.find_value_encoder(&Value::Int64(1)).is_ok());
}
