use std::path::{Path, PathBuf};

use hyexpr::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::magic::ENV_CONFIG_PATH;

/// Tunables of the operator package envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// zstd level used by [`embed_operator_package`](crate::package::embed_operator_package).
    pub compression_level: i32,
    /// Upper bound on the decompressed size of an embedded package, in bytes.
    pub max_embedded_package_size: usize,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            max_embedded_package_size: 64 << 20,
        }
    }
}

impl SerializationConfig {
    /// Get the default path to the configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push("hyser");
        path.push("config.toml");
        path
    }

    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| {
            Error::Internal(format!("unable to read `{}`: {}", path.display(), e))
        })?;

        toml::from_str(&toml_str).map_err(|e| {
            Error::InvalidArgument(format!("unable to parse `{}`: {}", path.display(), e))
        })
    }

    pub fn save_to_toml(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            Error::Internal(format!(
                "unable to serialize TOML for `{}`: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Internal(format!("unable to create `{}`: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, toml_str)
            .map_err(|e| Error::Internal(format!("unable to write `{}`: {}", path.display(), e)))
    }

    /// Load from [`default_path`](Self::default_path), falling back to the
    /// defaults when the file does not exist.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_toml(&path)
    }
}
