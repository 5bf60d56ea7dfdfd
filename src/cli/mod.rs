//! CLI commands
//!
//! Operator tooling for the model cache that the UDFs read from. Commands
//! resolve a named connection from a YAML file the same way the UDFs
//! resolve the connection column.

mod info;
mod list;
mod pull;

pub use info::info;
pub use list::list;
pub use pull::pull;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::bucketfs::{BlobLocation, BlobStore, ConnectionResolver, MountedBucketFs, StaticConnections};
use crate::config::UdfConfig;

/// transformers-udf - model cache tooling for NLP inference UDFs
#[derive(Parser)]
#[command(name = "transformers-udf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List models cached under a bucket directory
    List {
        #[command(flatten)]
        bucket: BucketArgs,

        /// Show detailed information
        #[arg(long, short)]
        verbose: bool,
    },

    /// Show information about a cached model
    Info {
        #[command(flatten)]
        bucket: BucketArgs,

        /// Model name, e.g. "bert-base-uncased"
        model: String,
    },

    /// Download a model from HuggingFace Hub into the bucket cache
    Pull {
        #[command(flatten)]
        bucket: BucketArgs,

        /// Connection holding a hub access token as its password
        #[arg(long)]
        token_connection: Option<String>,

        /// Repository ID (e.g., "distilbert-base-uncased")
        repo: String,
    },
}

/// Arguments selecting a bucket directory
#[derive(Args, Debug, Clone)]
pub struct BucketArgs {
    /// YAML file with named connections
    #[arg(long)]
    pub connections: PathBuf,

    /// Name of the bucket connection
    #[arg(long)]
    pub connection: String,

    /// Directory inside the bucket holding the models
    #[arg(long, default_value = "")]
    pub sub_dir: String,

    /// UDF configuration file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Resolved bucket access for a command
pub(crate) struct Bucket {
    pub connections: StaticConnections,
    pub store: MountedBucketFs,
    pub location: BlobLocation,
    pub root: PathBuf,
    pub sub_dir: String,
}

impl Bucket {
    /// Local cache directory of a model
    pub fn model_dir(&self, model: &str) -> Result<PathBuf> {
        Ok(self
            .store
            .local_cache_path(&self.location, &self.sub_dir, model)?)
    }

    /// Local directory holding all models of the sub-directory
    pub fn models_dir(&self) -> PathBuf {
        self.root.join(self.sub_dir.trim_start_matches('/'))
    }
}

impl BucketArgs {
    pub(crate) fn resolve(&self) -> Result<Bucket> {
        let config = match &self.config {
            Some(path) => UdfConfig::from_yaml(path)?,
            None => UdfConfig::default(),
        };
        let connections = StaticConnections::from_yaml(&self.connections)
            .with_context(|| format!("loading {}", self.connections.display()))?;

        let store = MountedBucketFs::new(&config.bucketfs);
        let descriptor = connections.resolve(&self.connection).with_context(|| {
            format!("known connections: {}", connections.names().join(", "))
        })?;
        let location = store.location_for(&descriptor)?;
        let root = store.bucket_root(&location);

        // Validates the sub-directory against path escapes
        store.local_cache_path(&location, &self.sub_dir, "")?;

        Ok(Bucket {
            connections,
            store,
            location,
            root,
            sub_dir: self.sub_dir.clone(),
        })
    }
}

/// Print the `config.json` fields relevant to the supported tasks
pub(crate) fn print_config_summary(config: &serde_json::Value, indent: &str) {
    if let Some(model_type) = config.get("model_type").and_then(|v| v.as_str()) {
        println!("{}Architecture: {}", indent, model_type);
    }
    if let Some(architectures) = config.get("architectures").and_then(|v| v.as_array()) {
        let names: Vec<&str> = architectures.iter().filter_map(|v| v.as_str()).collect();
        if !names.is_empty() {
            println!("{}Model classes: {}", indent, names.join(", "));
        }
    }
    if let Some(hidden_size) = config.get("hidden_size").and_then(|v| v.as_u64()) {
        println!("{}Hidden size: {}", indent, hidden_size);
    }
    if let Some(num_layers) = config.get("num_hidden_layers").and_then(|v| v.as_u64()) {
        println!("{}Layers: {}", indent, num_layers);
    }
    if let Some(vocab_size) = config.get("vocab_size").and_then(|v| v.as_u64()) {
        println!("{}Vocab size: {}", indent, vocab_size);
    }
    if let Some(labels) = config.get("id2label").and_then(|v| v.as_object()) {
        let mut labels: Vec<(u64, &str)> = labels
            .iter()
            .filter_map(|(id, label)| Some((id.parse().ok()?, label.as_str()?)))
            .collect();
        labels.sort_unstable();
        let names: Vec<&str> = labels.into_iter().map(|(_, label)| label).collect();
        println!("{}Labels: {}", indent, names.join(", "));
    }
}

/// Format a byte count
pub(crate) fn format_size(bytes: u64) -> String {
    let size_mb = bytes as f64 / (1024.0 * 1024.0);
    if size_mb > 1024.0 {
        format!("{:.2} GB", size_mb / 1024.0)
    } else {
        format!("{:.2} MB", size_mb)
    }
}
