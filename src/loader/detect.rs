//! Cached model artifact detection

use std::path::{Path, PathBuf};

use crate::error::{Result, UdfError};

/// Weight file format found in a model directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightsFormat {
    /// SafeTensors format (HuggingFace standard)
    SafeTensors,
    /// PyTorch pickle (`pytorch_model.bin`)
    PyTorch,
}

impl WeightsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightsFormat::SafeTensors => "SafeTensors",
            WeightsFormat::PyTorch => "PyTorch",
        }
    }
}

/// Files making up a cached model
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    /// Directory the artifacts were found in
    pub dir: PathBuf,
    /// Path to `config.json`
    pub config_path: PathBuf,
    /// Weight files (several when sharded)
    pub weights: Vec<PathBuf>,
    /// Detected weights format
    pub format: WeightsFormat,
    /// Path to `tokenizer.json`, if present
    pub tokenizer_path: Option<PathBuf>,
}

impl ModelArtifacts {
    /// Total size of all weight files in bytes
    pub fn weights_size(&self) -> u64 {
        self.weights
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}

/// Detect the artifacts of a model cached under `cache_dir`
///
/// The directory can hold the files directly, or in the hub cache layout
/// (`models--<org>--<name>/snapshots/<revision>/`) as written by a hub
/// download into that directory.
pub fn detect_model_artifacts(model_name: &str, cache_dir: &Path) -> Result<ModelArtifacts> {
    let missing = |reason: &str| UdfError::ModelLoad {
        model: model_name.to_string(),
        path: cache_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    if !cache_dir.is_dir() {
        return Err(missing("cache directory does not exist"));
    }

    let dir = find_model_dir(cache_dir).ok_or_else(|| missing("config.json not found"))?;

    let (format, weights) =
        find_weights(&dir).ok_or_else(|| missing("no SafeTensors or PyTorch weights found"))?;

    let tokenizer_path = Some(dir.join("tokenizer.json")).filter(|p| p.exists());

    Ok(ModelArtifacts {
        config_path: dir.join("config.json"),
        dir,
        weights,
        format,
        tokenizer_path,
    })
}

/// Find the directory holding `config.json`, looking into hub snapshots
pub fn find_model_dir(cache_dir: &Path) -> Option<PathBuf> {
    if cache_dir.join("config.json").is_file() {
        return Some(cache_dir.to_path_buf());
    }

    first_match(&cache_dir.join("models--*/snapshots/*/config.json"))
        .and_then(|config| config.parent().map(Path::to_path_buf))
}

fn find_weights(dir: &Path) -> Option<(WeightsFormat, Vec<PathBuf>)> {
    // Look for SafeTensors first (preferred)
    let single = dir.join("model.safetensors");
    if single.exists() {
        return Some((WeightsFormat::SafeTensors, vec![single]));
    }
    let shards = all_matches(&dir.join("model-*-of-*.safetensors"));
    if !shards.is_empty() {
        return Some((WeightsFormat::SafeTensors, shards));
    }

    let single = dir.join("pytorch_model.bin");
    if single.exists() {
        return Some((WeightsFormat::PyTorch, vec![single]));
    }
    let shards = all_matches(&dir.join("pytorch_model-*-of-*.bin"));
    if !shards.is_empty() {
        return Some((WeightsFormat::PyTorch, shards));
    }

    None
}

fn first_match(pattern: &Path) -> Option<PathBuf> {
    glob::glob(pattern.to_str()?)
        .ok()?
        .filter_map(|r| r.ok())
        .next()
}

fn all_matches(pattern: &Path) -> Vec<PathBuf> {
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .map(|paths| paths.filter_map(|r| r.ok()).collect())
        .unwrap_or_default();
    paths.sort();
    paths
}
