//! Run configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Size of the read buffer used when hashing file contents.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Digest used for content hashes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HashAlgorithm {
    /// SHA-256, the format written by earlier database versions.
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

/// Configuration passed explicitly into every batch operation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WardenConfig {
    /// Path whose subtree is scanned.
    pub root: PathBuf,

    /// Number of threads for walking and hashing (0 = auto-detect, 1 = serial).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Digest used when computing content hashes.
    #[builder(default)]
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Whether untracked paths make `verify` fail.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub untracked_is_drift: bool,

    /// Read buffer size for hashing.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl WardenConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if self.buffer_size == Some(0) {
            return Err("Buffer size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl WardenConfig {
    /// Create a new config builder.
    pub fn builder() -> WardenConfigBuilder {
        WardenConfigBuilder::default()
    }

    /// Create a default config for a root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            threads: 0,
            algorithm: HashAlgorithm::default(),
            untracked_is_drift: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WardenConfig::builder()
            .root("/srv")
            .threads(4usize)
            .algorithm(HashAlgorithm::Blake3)
            .untracked_is_drift(false)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/srv"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert!(!config.untracked_is_drift);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_config_requires_root() {
        assert!(WardenConfig::builder().build().is_err());
        assert!(WardenConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_config_rejects_zero_buffer() {
        assert!(
            WardenConfig::builder()
                .root("/srv")
                .buffer_size(0usize)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_config_simple() {
        let config = WardenConfig::new("/srv");
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        assert!(config.untracked_is_drift);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("BLAKE3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
