//! Configuration for UDF execution
//!
//! `UdfConfig` holds the knobs the dispatcher needs at runtime. It can be
//! built in code or read from YAML/JSON; every field has a default.

mod bucketfs;
mod device;

pub use bucketfs::BucketFsConfig;
pub use device::Device;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UdfError};

/// UDF runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdfConfig {
    /// Maximum number of rows pulled from the engine per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Mask placeholder accepted in fill-mask input text. It is rewritten to
    /// the tokenizer's own mask token before inference.
    #[serde(default = "default_mask_placeholder")]
    pub mask_placeholder: String,

    /// Blob store settings
    #[serde(default)]
    pub bucketfs: BucketFsConfig,
}

fn default_batch_size() -> usize {
    100
}

fn default_mask_placeholder() -> String {
    "<mask>".to_string()
}

impl Default for UdfConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            mask_placeholder: default_mask_placeholder(),
            bucketfs: BucketFsConfig::default(),
        }
    }
}

impl UdfConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read(path.as_ref())?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| UdfError::Config(e.to_string()))?;
        config.validated()
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read(path.as_ref())?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| UdfError::Config(e.to_string()))?;
        config.validated()
    }

    /// Override the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check invariants that serde cannot express
    pub fn validated(self) -> Result<Self> {
        if self.batch_size == 0 {
            return Err(UdfError::Config("batch_size must be at least 1".to_string()));
        }
        if self.mask_placeholder.is_empty() {
            return Err(UdfError::Config(
                "mask_placeholder must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| UdfError::Config(format!("cannot read {}: {}", path.display(), e)))
}
