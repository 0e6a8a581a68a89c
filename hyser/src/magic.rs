//! Wire constants.

/// The only container version this crate reads and writes.
pub const CONTAINER_VERSION: u32 = 1;

/// The only operator package version this crate reads and writes.
pub const OPERATOR_PACKAGE_VERSION: u32 = 1;

/// Prefix used when listing operator names in dependency and collision errors.
pub const OPERATOR_NAME_PREFIX: &str = "M.";

/// Codec for scalar values (`UNIT`, `BOOLEAN`, integers, floats, `TEXT`, `BYTES`).
pub const SCALAR_CODEC: &str = "hyser.codecs.scalar.v1";

/// Codec for `QTYPE` values and tuples.
pub const QTYPE_CODEC: &str = "hyser.codecs.qtype.v1";

/// Codec for `EXPR_OPERATOR` values.
pub const OPERATOR_CODEC: &str = "hyser.codecs.operator.v1";

/// Magic bytes prefixing a compressed operator package envelope.
pub const EMBEDDED_PACKAGE_MAGIC: [u8; 8] = *b"\0HYSPKG\0";

/// Name of the environment variable containing the path to the configuration file.
/// If not set, defaults to `$XDG_CONFIG_HOME/hyser/config.toml` or
/// `$HOME/.config/hyser/config.toml`.
pub const ENV_CONFIG_PATH: &str = "HYSER_CONFIG_PATH";
