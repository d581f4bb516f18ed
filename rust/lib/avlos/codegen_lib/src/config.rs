//! Generator run configuration.
//!
//! ```yaml
//! generators:
//!   generator_c:
//!     enabled: true
//!     hash_string: "0xTINYMOVR"
//!     paths:
//!       output_enums: out/tm_enums.h
//!       output_header: out/fw_endpoints.h
//!       output_impl: out/fw_endpoints.c
//!     header_includes: [src/common.h]
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("generator '{generator}': missing required path '{key}'")]
    MissingPath { generator: String, key: String },

    #[error("generator '{generator}': path '{key}' cannot be resolved: {reason}")]
    UnresolvablePath {
        generator: String,
        key: String,
        reason: String,
    },

    #[error("malformed config: {0}")]
    Syntax(String),

    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },
}

impl ConfigError {
    /// The generator the error belongs to, if any.
    pub fn generator(&self) -> Option<&str> {
        match self {
            ConfigError::MissingPath { generator, .. }
            | ConfigError::UnresolvablePath { generator, .. } => Some(generator),
            ConfigError::Syntax(_) | ConfigError::Io { .. } => None,
        }
    }
}

/// Settings for one generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Output path per key (e.g. `output_header`).
    #[serde(default)]
    pub paths: BTreeMap<String, PathBuf>,

    /// Extra includes for generated headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_includes: Vec<String>,

    /// Extra includes for generated implementation files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impl_includes: Vec<String>,

    /// Salt mixed into the protocol hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_string: Option<String>,
}

impl GeneratorConfig {
    /// An enabled config with the given paths.
    pub fn with_paths<I, K, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            enabled: true,
            paths: paths
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        self.paths.get(key).map(PathBuf::as_path)
    }

    /// Look up a path the generator declared as required.
    pub fn require(&self, key: &str) -> anyhow::Result<&Path> {
        self.path(key)
            .ok_or_else(|| anyhow::anyhow!("path '{}' missing after validation", key))
    }

    /// Join relative paths onto `base`. Empty paths are left empty; the
    /// dispatcher rejects them for enabled generators only.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in self.paths.values_mut() {
            if !path.as_os_str().is_empty() {
                *path = resolve(base, path);
            }
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    std::path::absolute(&joined).unwrap_or(joined)
}

/// Top-level config: one entry per generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorConfig>,
}

impl RunConfig {
    /// Parse YAML text and resolve relative paths against `base`.
    pub fn from_str(yaml: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: RunConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        for generator in config.generators.values_mut() {
            generator.resolve_paths(base);
        }
        Ok(config)
    }

    /// Load a config file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::from_str(&text, base)?;
        debug!(
            "loaded config {} ({} generators)",
            path.display(),
            config.generators.len()
        );
        Ok(config)
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorConfig> {
        self.generators.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, config: GeneratorConfig) {
        self.generators.insert(name.into(), config);
    }
}
