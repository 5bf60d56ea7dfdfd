//! Named connections
//!
//! The engine stores connection objects (address + credentials) by name.
//! UDF rows only carry the name; the resolver turns it into a descriptor.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UdfError};

/// A connection object as stored by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Address, e.g. `file:///data/models` or `https://host:2581/default;bfsdefault`
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionDescriptor {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// A credential-only connection, as used for hub access tokens
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            password: Some(token.into()),
            ..Default::default()
        }
    }
}

/// Look up connection objects by name
pub trait ConnectionResolver {
    /// Resolve a connection name; unknown names are an error
    fn resolve(&self, name: &str) -> Result<ConnectionDescriptor>;
}

/// Connections held in a map
///
/// Serves as the resolver for local tooling, where connections come from a
/// YAML file of the form:
///
/// ```yaml
/// connections:
///   bfs_conn:
///     address: file:///data/models
///   hf_token:
///     password: hf_xxx
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConnections {
    #[serde(default)]
    connections: HashMap<String, ConnectionDescriptor>,
}

impl StaticConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a connection
    pub fn with(mut self, name: impl Into<String>, descriptor: ConnectionDescriptor) -> Self {
        self.connections.insert(name.into(), descriptor);
        self
    }

    /// Load connections from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| UdfError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content).map_err(|e| UdfError::Config(e.to_string()))
    }

    /// Connection names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ConnectionResolver for StaticConnections {
    fn resolve(&self, name: &str) -> Result<ConnectionDescriptor> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| UdfError::unknown_connection(name))
    }
}
