//! Pull model from HuggingFace Hub

use anyhow::{anyhow, Result};
use hf_hub::api::sync::ApiBuilder;

use crate::bucketfs::ConnectionResolver;
use crate::loader::detect_model_artifacts;

use super::BucketArgs;

/// Files fetched when the repository listing is unavailable
const STANDARD_FILES: &[&str] = &[
    "config.json",
    "model.safetensors",
    "pytorch_model.bin",
    "tokenizer.json",
    "tokenizer_config.json",
    "special_tokens_map.json",
    "vocab.txt",
];

/// Download a model into the bucket cache
///
/// Files land in the hub cache layout below `<bucket>/<sub_dir>/<repo>`,
/// which is where the UDFs look for them.
pub fn pull(bucket: BucketArgs, token_connection: Option<String>, repo: String) -> Result<()> {
    let bucket = bucket.resolve()?;
    let cache_dir = bucket.model_dir(&repo)?;

    let token = match token_connection {
        Some(name) => {
            let descriptor = bucket.connections.resolve(&name)?;
            let token = descriptor
                .password
                .filter(|t| !t.is_empty())
                .ok_or_else(|| anyhow!("Connection '{}' has no token", name))?;
            Some(token)
        }
        None => None,
    };

    std::fs::create_dir_all(&cache_dir)?;
    println!("Downloading from: {}", repo);
    println!("Downloading to: {}", cache_dir.display());

    let api = ApiBuilder::new()
        .with_cache_dir(cache_dir.clone())
        .with_token(token)
        .build()?;
    let repo_api = api.model(repo.clone());

    let files: Vec<String> = match repo_api.info() {
        Ok(info) => select_files(info.siblings.iter().map(|s| s.rfilename.as_str())),
        Err(e) => {
            tracing::warn!("Cannot list {}: {}; trying standard files", repo, e);
            STANDARD_FILES.iter().map(|f| f.to_string()).collect()
        }
    };

    for file in &files {
        match repo_api.get(file) {
            Ok(_) => println!("  Downloaded: {}", file),
            Err(e) => tracing::debug!("Skipping {}: {}", file, e),
        }
    }

    let artifacts = detect_model_artifacts(&repo, &cache_dir)?;
    println!(
        "\nModel downloaded to: {} ({})",
        artifacts.dir.display(),
        artifacts.format.as_str()
    );

    Ok(())
}

/// Repository files needed to load a model for inference
fn select_files<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.collect();
    let has_safetensors = names
        .iter()
        .any(|n| *n == "model.safetensors" || is_shard(n, "model", ".safetensors"));

    names
        .into_iter()
        .filter(|name| {
            let is_weights = *name == "model.safetensors"
                || is_shard(name, "model", ".safetensors")
                || *name == "model.safetensors.index.json";
            let is_pytorch = *name == "pytorch_model.bin"
                || is_shard(name, "pytorch_model", ".bin")
                || *name == "pytorch_model.bin.index.json";
            let is_support = STANDARD_FILES.contains(name)
                && !name.ends_with(".bin")
                && !name.ends_with(".safetensors");

            is_support || is_weights || (is_pytorch && !has_safetensors)
        })
        .map(str::to_string)
        .collect()
}

/// `<stem>-00001-of-00002<ext>`
fn is_shard(name: &str, stem: &str, ext: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(ext))
        .map(|rest| rest.contains("-of-"))
        .unwrap_or(false)
}
