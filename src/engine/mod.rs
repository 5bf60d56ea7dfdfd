//! Core inference engine
//!
//! This module provides the batch inference path shared by all UDFs:
//! - Dispatch: pulls batches, groups rows and drives the caches
//! - Memo: single-slot model and pipeline caches
//! - Predict: runs a pipeline and normalizes its output shape
//! - Reshape: expands predictions into ranked output rows

mod dispatch;
mod memo;
mod predict;
mod reshape;

pub use dispatch::BatchDispatcher;
pub use memo::{LoadedModel, ModelMemo, PipelineMemo, Reload};
pub use predict::{normalize, predict};
pub use reshape::{encode, reshape, OutputRow};
