//! Blob store access for cached models
//!
//! Models are stored in a blob store bucket under `<sub_dir>/<model_name>`
//! and read from the bucket's local mount. Resolution runs in three steps:
//! - connection name → connection descriptor (`ConnectionResolver`)
//! - descriptor → blob location (`BlobStore::location_for`)
//! - location + model path → local cache directory (`BlobStore::local_cache_path`)

mod connection;
mod location;

pub use connection::{ConnectionDescriptor, ConnectionResolver, StaticConnections};
pub use location::{model_path, BlobLocation, BlobStore, MountedBucketFs};

use std::path::PathBuf;

use crate::error::{Result, UdfError};
use crate::udf::CacheKey;

/// Where a model's artifacts can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLocation {
    /// Local directory holding the cached model
    pub cache_dir: PathBuf,
    /// Hub access token from the row's token connection, if any
    pub token: Option<String>,
}

/// Resolves cache keys to model locations
pub struct ModelLocator {
    connections: Box<dyn ConnectionResolver>,
    store: Box<dyn BlobStore>,
}

impl ModelLocator {
    pub fn new<C, S>(connections: C, store: S) -> Self
    where
        C: ConnectionResolver + 'static,
        S: BlobStore + 'static,
    {
        Self {
            connections: Box::new(connections),
            store: Box::new(store),
        }
    }

    /// Resolve the local cache directory and credentials for a key
    pub fn locate(&self, key: &CacheKey) -> Result<ModelLocation> {
        let connection = self.connections.resolve(&key.bucketfs_conn)?;
        let location = self.store.location_for(&connection)?;
        let cache_dir = self
            .store
            .local_cache_path(&location, &key.sub_dir, &key.model_name)?;

        let token = match &key.token_conn {
            Some(name) => Some(self.token(name)?),
            None => None,
        };

        tracing::debug!(
            model = %key.model_name,
            connection = %key.bucketfs_conn,
            path = %cache_dir.display(),
            "Resolved model location"
        );

        Ok(ModelLocation { cache_dir, token })
    }

    fn token(&self, name: &str) -> Result<String> {
        self.connections
            .resolve(name)?
            .password
            .filter(|token| !token.is_empty())
            .ok_or_else(|| UdfError::ConnectionResolution {
                name: name.to_string(),
                reason: "token connection has no password".to_string(),
            })
    }
}
