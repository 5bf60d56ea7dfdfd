//! transformers-udf - pretrained NLP model inference as database UDFs
//!
//! The database engine calls a UDF with batches of rows. Each row names a
//! model by connection, sub-directory and model name, plus task inputs.
//! The UDF groups rows by model, keeps the last loaded model and pipeline
//! cached, runs inference and emits one ranked output row per prediction.
//!
//! # Architecture
//!
//! - **udf**: the four UDFs and their column layouts
//! - **engine**: batch dispatch, model/pipeline caches, output reshaping
//! - **bucketfs**: connection resolution and blob store cache paths
//! - **loader** / **tokenizer** / **pipeline**: capabilities the engine
//!   loads and runs models through
//! - **context**: the engine's row cursor and emit sink
//!
//! # Tasks
//!
//! - Fill-mask
//! - Extractive question answering
//! - Sequence classification of single texts and text pairs
//!
//! # Example
//!
//! ```bash
//! # Download a model into the bucket cache
//! transformers-udf pull --connections conns.yaml --connection bfs --sub-dir models bert-base-uncased
//!
//! # List cached models
//! transformers-udf list --connections conns.yaml --connection bfs --sub-dir models
//! ```

pub mod bucketfs;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod tokenizer;
pub mod udf;

// Re-export key types
pub use config::{Device, UdfConfig};
pub use engine::BatchDispatcher;
pub use error::{Result, UdfError};
pub use udf::{
    CacheKey, FillMaskUdf, QuestionAnsweringUdf, SequenceClassificationSingleTextUdf,
    SequenceClassificationTextPairUdf,
};
