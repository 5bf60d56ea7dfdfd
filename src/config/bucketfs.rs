//! Blob store settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where remote buckets are mounted inside the UDF sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketFsConfig {
    /// Root directory under which buckets appear as `<service>/<bucket>`
    #[serde(default = "default_mount_root")]
    pub mount_root: PathBuf,
}

fn default_mount_root() -> PathBuf {
    PathBuf::from("/buckets")
}

impl Default for BucketFsConfig {
    fn default() -> Self {
        Self {
            mount_root: default_mount_root(),
        }
    }
}
