//! Blob store locations and their local cache paths

use std::path::{Component, Path, PathBuf};

use crate::config::BucketFsConfig;
use crate::error::{Result, UdfError};

use super::ConnectionDescriptor;

/// Where a connection's bucket content lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLocation {
    /// Plain local directory used as the bucket root
    Local { root: PathBuf },
    /// Remote bucket, mounted read-only into the UDF sandbox
    Mounted {
        service: String,
        bucket: String,
        /// Base path inside the bucket
        path: PathBuf,
    },
}

/// Maps connections to blob locations and locations to local paths
pub trait BlobStore {
    /// Blob location addressed by a connection
    fn location_for(&self, connection: &ConnectionDescriptor) -> Result<BlobLocation>;

    /// Local directory holding `<sub_dir>/<model_name>` of a location
    fn local_cache_path(
        &self,
        location: &BlobLocation,
        sub_dir: &str,
        model_name: &str,
    ) -> Result<PathBuf>;
}

/// Blob store whose buckets are mounted under a common root
///
/// Address forms:
/// - `file://<dir>`: `<dir>` is the bucket root
/// - `http(s)://host:port/<bucket>[/<path>];<service>` and
///   `bucketfs://host:port/<bucket>[/<path>];<service>`: mounted at
///   `<mount_root>/<service>/<bucket>/<path>`
#[derive(Debug, Clone)]
pub struct MountedBucketFs {
    mount_root: PathBuf,
}

const DEFAULT_SERVICE: &str = "bfsdefault";

impl MountedBucketFs {
    pub fn new(config: &BucketFsConfig) -> Self {
        Self {
            mount_root: config.mount_root.clone(),
        }
    }

    /// Local directory a location's content is visible under
    pub fn bucket_root(&self, location: &BlobLocation) -> PathBuf {
        match location {
            BlobLocation::Local { root } => root.clone(),
            BlobLocation::Mounted {
                service,
                bucket,
                path,
            } => self.mount_root.join(service).join(bucket).join(path),
        }
    }

    fn parse_remote(address: &str, rest: &str) -> Result<BlobLocation> {
        let (locator, service) = match rest.split_once(';') {
            Some((locator, service)) if !service.is_empty() => (locator, service),
            Some((locator, _)) => (locator, DEFAULT_SERVICE),
            None => (rest, DEFAULT_SERVICE),
        };

        // Drop "host:port", keep the path
        let path = locator.split_once('/').map(|(_, p)| p).unwrap_or("");
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let bucket = segments.next().ok_or_else(|| UdfError::ConnectionResolution {
            name: address.to_string(),
            reason: "address does not name a bucket".to_string(),
        })?;

        Ok(BlobLocation::Mounted {
            service: service.to_string(),
            bucket: bucket.to_string(),
            path: segments.collect(),
        })
    }
}

impl Default for MountedBucketFs {
    fn default() -> Self {
        Self::new(&BucketFsConfig::default())
    }
}

impl BlobStore for MountedBucketFs {
    fn location_for(&self, connection: &ConnectionDescriptor) -> Result<BlobLocation> {
        let address = connection.address.trim();

        if let Some(dir) = address.strip_prefix("file://") {
            if dir.is_empty() {
                return Err(UdfError::ConnectionResolution {
                    name: address.to_string(),
                    reason: "file address without a directory".to_string(),
                });
            }
            return Ok(BlobLocation::Local {
                root: PathBuf::from(dir),
            });
        }

        for scheme in ["https://", "http://", "bucketfs://"] {
            if let Some(rest) = address.strip_prefix(scheme) {
                return Self::parse_remote(address, rest);
            }
        }

        Err(UdfError::ConnectionResolution {
            name: address.to_string(),
            reason: "unsupported address scheme".to_string(),
        })
    }

    fn local_cache_path(
        &self,
        location: &BlobLocation,
        sub_dir: &str,
        model_name: &str,
    ) -> Result<PathBuf> {
        let root = self.bucket_root(location);
        let model_path = model_path(sub_dir, model_name);
        if escapes_root(&model_path) {
            return Err(UdfError::ModelLoad {
                model: model_name.to_string(),
                path: model_path,
                reason: "model path must stay inside the bucket".to_string(),
            });
        }

        Ok(root.join(model_path))
    }
}

/// Relative model path `<sub_dir>/<model_name>` inside a bucket
pub fn model_path(sub_dir: &str, model_name: &str) -> PathBuf {
    Path::new(sub_dir.trim_start_matches('/')).join(model_name.trim_start_matches('/'))
}

fn escapes_root(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}
