//! Compressed transport envelope for operator packages.
//!
//! Layout: [`EMBEDDED_PACKAGE_MAGIC`] followed by the zstd-compressed borsh
//! encoding of the package. Any failure to unwrap an envelope is reported
//! as `Internal`: a damaged envelope means corrupted transport, not a
//! malformed request.
use std::io::Read;

use hyexpr::{
    OperatorRegistry,
    error::{Error, Result},
};
use log::{debug, warn};

use crate::{
    codec::CodecRegistry,
    config::SerializationConfig,
    magic::EMBEDDED_PACKAGE_MAGIC,
    package::{OperatorPackage, load_operator_package},
};

const PARSE_ERROR: &str = "unable to parse an embedded operator package";

/// Serialize and compress `package`.
pub fn embed_operator_package(
    package: &OperatorPackage,
    config: &SerializationConfig,
) -> Result<Vec<u8>> {
    let bytes = package.to_bytes()?;
    let compressed = zstd::encode_all(bytes.as_slice(), config.compression_level)
        .map_err(|e| Error::Internal(format!("unable to compress an operator package: {}", e)))?;

    let mut envelope = Vec::with_capacity(EMBEDDED_PACKAGE_MAGIC.len() + compressed.len());
    envelope.extend_from_slice(&EMBEDDED_PACKAGE_MAGIC);
    envelope.extend_from_slice(&compressed);
    debug!(
        "Embedded operator package: {} bytes, {} compressed",
        bytes.len(),
        envelope.len()
    );
    Ok(envelope)
}

/// Decompress and parse an envelope built by [`embed_operator_package`].
pub fn parse_embedded_operator_package(
    envelope: &[u8],
    config: &SerializationConfig,
) -> Result<OperatorPackage> {
    let Some(compressed) = envelope.strip_prefix(EMBEDDED_PACKAGE_MAGIC.as_slice()) else {
        warn!("Embedded operator package has no magic bytes");
        return Err(Error::Internal(PARSE_ERROR.to_string()));
    };

    let decoder = zstd::stream::read::Decoder::new(compressed).map_err(|e| {
        warn!("Unable to open embedded operator package: {}", e);
        Error::Internal(PARSE_ERROR.to_string())
    })?;
    // One byte past the limit tells an oversized package from one that fits exactly.
    let limit = config.max_embedded_package_size as u64;
    let mut bytes = Vec::new();
    decoder
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| {
            warn!("Unable to decompress embedded operator package: {}", e);
            Error::Internal(PARSE_ERROR.to_string())
        })?;
    if bytes.len() as u64 > limit {
        warn!(
            "Embedded operator package exceeds {} bytes once decompressed",
            limit
        );
        return Err(Error::Internal(PARSE_ERROR.to_string()));
    }

    OperatorPackage::from_bytes(&bytes).map_err(|e| {
        warn!("Unable to parse embedded operator package: {}", e);
        Error::Internal(PARSE_ERROR.to_string())
    })
}

/// [`parse_embedded_operator_package`] followed by [`load_operator_package`].
pub fn load_embedded_operator_package(
    envelope: &[u8],
    config: &SerializationConfig,
    codecs: &CodecRegistry,
    operators: &OperatorRegistry,
) -> Result<()> {
    let package = parse_embedded_operator_package(envelope, config)?;
    load_operator_package(&package, codecs, operators)
}
