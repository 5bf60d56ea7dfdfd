//! List models command

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::loader::{detect_model_artifacts, find_model_dir};

use super::{format_size, print_config_summary, BucketArgs};

/// List models cached under a bucket directory
pub fn list(bucket: BucketArgs, verbose: bool) -> Result<()> {
    let bucket = bucket.resolve()?;
    let models_dir = bucket.models_dir();

    if !models_dir.exists() {
        println!("No model directory found at: {}", models_dir.display());
        println!("\nUse 'transformers-udf pull <repo>' to download a model into it.");
        return Ok(());
    }

    println!("Models in {}:\n", models_dir.display());

    let models = find_models(&models_dir)?;
    if models.is_empty() {
        println!("  No models found.");
        return Ok(());
    }

    for (name, path) in models {
        if verbose {
            print_model_details(&path, &name);
        } else {
            let format = detect_model_artifacts(&name, &path)
                .map(|a| a.format.as_str())
                .unwrap_or("incomplete");
            println!("  {} ({})", name, format);
        }
    }

    Ok(())
}

/// Cached models under `dir`, including `<org>/<name>` models one level down
pub(crate) fn find_models(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut models = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        if find_model_dir(&path).is_some() {
            models.push((name, path));
            continue;
        }

        for nested in std::fs::read_dir(&path)? {
            let nested = nested?.path();
            if nested.is_dir() && find_model_dir(&nested).is_some() {
                let nested_name = nested.file_name().map(|n| n.to_string_lossy().to_string());
                if let Some(nested_name) = nested_name {
                    models.push((format!("{}/{}", name, nested_name), nested));
                }
            }
        }
    }

    models.sort();
    Ok(models)
}

fn print_model_details(path: &Path, name: &str) {
    println!("  {}", name);
    println!("    Path: {}", path.display());

    match detect_model_artifacts(name, path) {
        Ok(artifacts) => {
            println!("    Format: {}", artifacts.format.as_str());
            println!("    Weights: {}", format_size(artifacts.weights_size()));

            let config = std::fs::read_to_string(&artifacts.config_path)
                .ok()
                .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok());
            if let Some(config) = config {
                print_config_summary(&config, "    ");
            }
        }
        Err(e) => println!("    Incomplete: {}", e),
    }

    println!();
}
