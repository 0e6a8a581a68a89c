//! Codec registry.
//!
//! A codec is a named pair of functions: a decoder turning a
//! [`ValueProto`](crate::container::ValueProto) payload back into a
//! [`Value`], and one or more encoders producing such payloads. Decoders are
//! keyed by codec name, encoders by qtype or by specialization key.
//!
//! Codec modules announce themselves statically with [`register_codec!`];
//! [`CodecRegistry::from_inventory`] collects every announcement linked into
//! the binary.
use std::{collections::HashMap, sync::Arc};

use hyexpr::{
    ExprNodePtr, OperatorRegistry, QType, Value,
    error::{Error, Result, ResultExt},
};
use log::{debug, error};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{container::ValueProto, encode::Encoder};

/// Everything a value decoder gets to see.
pub struct ValueDecoderInput<'a> {
    pub payload: &'a [u8],
    pub input_values: &'a [Value],
    pub input_exprs: &'a [ExprNodePtr],
    /// Registry registered operator references are resolved against.
    pub operators: &'a OperatorRegistry,
}

pub type ValueDecoderFn = Arc<dyn Fn(ValueDecoderInput<'_>) -> Result<Value> + Send + Sync>;

/// Encoders receive the encoder itself so they can declare their codec and
/// emit sub-values or sub-expressions before returning their own payload.
pub type ValueEncoderFn =
    Arc<dyn Fn(&Value, &mut Encoder<'_>) -> Result<ValueProto> + Send + Sync>;

/// Static codec announcement, see [`register_codec!`].
pub struct CodecRegistration {
    pub name: &'static str,
    pub register: fn(&CodecRegistry) -> Result<()>,
}
inventory::collect!(CodecRegistration);

/// Announce a codec to [`CodecRegistry::from_inventory`].
///
/// ```rust,ignore
/// fn register(registry: &CodecRegistry) -> Result<()> { ... }
/// hyser::register_codec!("my.codec.v1", register);
/// ```
#[macro_export]
macro_rules! register_codec {
    ($name:expr, $register:path) => {
        $crate::inventory::submit! {
            $crate::codec::CodecRegistration {
                name: $name,
                register: $register,
            }
        }
    };
}

#[derive(Default)]
pub struct CodecRegistry {
    decoders: RwLock<HashMap<String, ValueDecoderFn>>,
    qtype_encoders: RwLock<HashMap<QType, ValueEncoderFn>>,
    key_encoders: RwLock<HashMap<String, ValueEncoderFn>>,
}

static GLOBAL_CODECS: Lazy<Result<CodecRegistry>> = Lazy::new(CodecRegistry::from_inventory);

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the scalar, qtype and operator codecs.
    pub fn with_builtin_codecs() -> Result<Self> {
        let registry = Self::new();
        crate::codecs::register_builtin_codecs(&registry)?;
        Ok(registry)
    }

    /// A registry populated from every [`CodecRegistration`] in the binary.
    pub fn from_inventory() -> Result<Self> {
        Self::from_registrations(inventory::iter::<CodecRegistration>)
    }

    /// A registry populated from `registrations`, applied in name order.
    ///
    /// The first failing registration aborts the construction.
    pub fn from_registrations<'r>(
        registrations: impl IntoIterator<Item = &'r CodecRegistration>,
    ) -> Result<Self> {
        let registry = Self::new();
        let mut registrations: Vec<&CodecRegistration> = registrations.into_iter().collect();
        registrations.sort_by_key(|r| r.name);
        for registration in registrations {
            (registration.register)(&registry)
                .map_err(|err| {
                    error!("Unable to register codec {}: {}", registration.name, err);
                    err
                })
                .with_context(|| format!("while registering codec {}", registration.name))?;
        }
        Ok(registry)
    }

    /// Process-wide registry built from the inventory on first use. A failed
    /// construction is reported on every call.
    pub fn global() -> Result<&'static CodecRegistry> {
        GLOBAL_CODECS.as_ref().map_err(Clone::clone)
    }

    /// Register the decoder of codec `name`, replacing any previous one.
    pub fn register_value_decoder(&self, name: &str, decoder: ValueDecoderFn) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("codec name is empty".into()));
        }
        if self
            .decoders
            .write()
            .insert(name.to_string(), decoder)
            .is_some()
        {
            debug!("Replaced value decoder for codec {}", name);
        } else {
            debug!("Registered value decoder for codec {}", name);
        }
        Ok(())
    }

    /// Register an encoder for values of `qtype` (and, for `QTYPE` values,
    /// for the qtype value itself).
    pub fn register_value_encoder_by_qtype(
        &self,
        qtype: QType,
        encoder: ValueEncoderFn,
    ) -> Result<()> {
        let mut encoders = self.qtype_encoders.write();
        if encoders.contains_key(&qtype) {
            return Err(Error::InvalidArgument(format!(
                "value encoder for qtype={} has already been registered",
                qtype
            )));
        }
        debug!("Registered value encoder for qtype {}", qtype);
        encoders.insert(qtype, encoder);
        Ok(())
    }

    /// Register an encoder for a specialization key.
    pub fn register_value_encoder_by_key(&self, key: &str, encoder: ValueEncoderFn) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "specialization key is empty".into(),
            ));
        }
        let mut encoders = self.key_encoders.write();
        if encoders.contains_key(key) {
            return Err(Error::InvalidArgument(format!(
                "value encoder for specialization_key='{}' has already been registered",
                key
            )));
        }
        debug!("Registered value encoder for specialization key {}", key);
        encoders.insert(key.to_string(), encoder);
        Ok(())
    }

    pub fn has_value_decoder(&self, name: &str) -> bool {
        self.decoders.read().contains_key(name)
    }

    /// Decoder of codec `name`; `NotFound` if no such codec is registered.
    pub fn find_value_decoder(&self, name: &str) -> Result<ValueDecoderFn> {
        self.decoders
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("unknown codec: {:?}", name)))
    }

    /// Encoder responsible for `value`.
    ///
    /// `QTYPE` values are looked up by the qtype they hold, then by its
    /// specialization key. Other values are looked up by their own
    /// specialization key, then by their qtype, then by the qtype's
    /// specialization key.
    pub fn find_value_encoder(&self, value: &Value) -> Result<ValueEncoderFn> {
        if let Value::QType(qtype) = value {
            return self
                .lookup_qtype_or_key(qtype, "", qtype.specialization_key())
                .ok_or_else(|| {
                    Error::Unimplemented(format!(
                        "cannot serialize qtype={}, specialization_key='{}'; \
                         no value encoder is registered for this qtype",
                        qtype,
                        qtype.specialization_key()
                    ))
                });
        }
        let qtype = value.qtype();
        self.lookup_qtype_or_key(&qtype, value.specialization_key(), qtype.specialization_key())
            .ok_or_else(|| {
                Error::Unimplemented(format!(
                    "cannot serialize value: specialization_key='{}', qtype={}, \
                     qtype_specialization_key='{}': {}",
                    value.specialization_key(),
                    qtype,
                    qtype.specialization_key(),
                    value.repr()
                ))
            })
    }

    fn lookup_qtype_or_key(
        &self,
        qtype: &QType,
        value_key: &str,
        qtype_key: &str,
    ) -> Option<ValueEncoderFn> {
        let keys = self.key_encoders.read();
        if !value_key.is_empty() {
            if let Some(encoder) = keys.get(value_key) {
                return Some(encoder.clone());
            }
        }
        if let Some(encoder) = self.qtype_encoders.read().get(qtype) {
            return Some(encoder.clone());
        }
        if !qtype_key.is_empty() {
            return keys.get(qtype_key).cloned();
        }
        None
    }
}
