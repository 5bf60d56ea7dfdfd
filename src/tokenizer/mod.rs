//! Tokenizers used by task pipelines
//!
//! `Tokenizer` is the capability the dispatcher needs from a tokenizer: the
//! mask token for fill-mask preparation plus plain encode/decode for
//! pipeline implementations. `HfTokenizer` implements it on top of a
//! `tokenizer.json` read with the `tokenizers` crate.

use std::path::Path;

use serde_json::Value as Json;

use crate::bucketfs::ModelLocation;
use crate::error::{Result, UdfError};
use crate::loader::{find_model_dir, TokenizerLoader};

/// Tokenizer capability
pub trait Tokenizer: Send + Sync {
    /// The model's mask token, if it has one
    fn mask_token(&self) -> Option<&str>;

    /// Encode text to token IDs
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token IDs to text
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Vocabulary size including added tokens
    fn vocab_size(&self) -> usize;
}

/// Mask tokens tried when no special tokens map names one
const MASK_CANDIDATES: &[&str] = &["<mask>", "[MASK]"];

/// Tokenizer backed by a HuggingFace `tokenizer.json`
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    mask_token: Option<String>,
}

impl HfTokenizer {
    /// Load from a model directory
    ///
    /// `tokenizer.json` is required. The mask token comes from
    /// `special_tokens_map.json` or `tokenizer_config.json` when present,
    /// otherwise from the well-known mask tokens in the vocabulary.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join("tokenizer.json");
        let inner = tokenizers::Tokenizer::from_file(&path).map_err(|e| {
            UdfError::Tokenizer(format!("cannot load {}: {}", path.display(), e))
        })?;

        let declared = ["special_tokens_map.json", "tokenizer_config.json"]
            .iter()
            .find_map(|file| declared_mask_token(&dir.join(file)));

        Ok(Self::new(inner, declared))
    }

    /// Wrap an already loaded tokenizer
    pub fn new(inner: tokenizers::Tokenizer, declared_mask: Option<String>) -> Self {
        let mask_token = declared_mask.or_else(|| {
            MASK_CANDIDATES
                .iter()
                .find(|t| inner.token_to_id(t).is_some())
                .map(|t| t.to_string())
        });
        Self { inner, mask_token }
    }
}

impl Tokenizer for HfTokenizer {
    fn mask_token(&self) -> Option<&str> {
        self.mask_token.as_deref()
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.inner
            .encode(text, true)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| UdfError::Tokenizer(format!("encode error: {}", e)))
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| UdfError::Tokenizer(format!("decode error: {}", e)))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

/// `mask_token` entry of a tokenizer side file, either a plain string or an
/// added-token object with a `content` field
fn declared_mask_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let json: Json = serde_json::from_str(&content).ok()?;
    match json.get("mask_token")? {
        Json::String(token) => Some(token.clone()),
        Json::Object(token) => token.get("content")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Loads `HfTokenizer`s from the model cache
#[derive(Debug, Clone, Copy, Default)]
pub struct HfTokenizerLoader;

impl TokenizerLoader for HfTokenizerLoader {
    type Tokenizer = HfTokenizer;

    fn load_tokenizer(&self, model_name: &str, location: &ModelLocation) -> Result<HfTokenizer> {
        let dir = find_model_dir(&location.cache_dir).ok_or_else(|| UdfError::ModelLoad {
            model: model_name.to_string(),
            path: location.cache_dir.clone(),
            reason: "config.json not found".to_string(),
        })?;

        tracing::debug!(model = %model_name, path = %dir.display(), "Loading tokenizer");
        HfTokenizer::from_dir(&dir)
    }
}
