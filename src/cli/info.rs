//! Model info command

use anyhow::Result;

use crate::bucketfs::ModelLocation;
use crate::loader::{detect_model_artifacts, TokenizerLoader};
use crate::tokenizer::{HfTokenizerLoader, Tokenizer};

use super::{format_size, print_config_summary, BucketArgs};

/// Show information about a cached model
pub fn info(bucket: BucketArgs, model: String) -> Result<()> {
    let bucket = bucket.resolve()?;
    let cache_dir = bucket.model_dir(&model)?;

    println!("Model: {}\n", model);
    println!("Path: {}", cache_dir.display());

    let artifacts = detect_model_artifacts(&model, &cache_dir)?;
    if artifacts.dir != cache_dir {
        println!("Snapshot: {}", artifacts.dir.display());
    }
    println!("Format: {}", artifacts.format.as_str());
    for weights in &artifacts.weights {
        if let Some(name) = weights.file_name() {
            println!("  {}", name.to_string_lossy());
        }
    }
    println!("Weights size: {}\n", format_size(artifacts.weights_size()));

    let content = std::fs::read_to_string(&artifacts.config_path)?;
    let config: serde_json::Value = serde_json::from_str(&content)?;
    println!("Configuration:");
    print_config_summary(&config, "  ");

    if artifacts.tokenizer_path.is_some() {
        let location = ModelLocation {
            cache_dir,
            token: None,
        };
        let tokenizer = HfTokenizerLoader.load_tokenizer(&model, &location)?;
        println!("\nTokenizer:");
        println!("  Vocab size: {}", tokenizer.vocab_size());
        println!(
            "  Mask token: {}",
            tokenizer.mask_token().unwrap_or("(none)")
        );
    } else {
        println!("\nTokenizer: tokenizer.json not found");
    }

    Ok(())
}
