//! Task pipelines
//!
//! A pipeline binds a loaded model and tokenizer to one task and one set of
//! task parameters. The dispatcher builds pipelines through a
//! `PipelineFactory` and feeds them homogeneous row subsets.

use std::fmt;
use std::sync::Arc;

use crate::config::Device;
use crate::error::Result;
use crate::tokenizer::Tokenizer;
use crate::udf::Task;

/// Inference task a pipeline is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    FillMask,
    QuestionAnswering,
    TextClassification,
}

impl TaskKind {
    /// Task name as used by the model hub
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::FillMask => "fill-mask",
            TaskKind::QuestionAnswering => "question-answering",
            TaskKind::TextClassification => "text-classification",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a pipeline for one input in a batch call
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutput<R> {
    /// A bare record
    One(R),
    /// A ranked list of records
    Many(Vec<R>),
}

/// Raw pipeline output
///
/// Pipelines collapse their result depending on input count and parameters,
/// so the dispatcher accepts every shape and normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput<R> {
    /// A bare record; only valid for a single input
    Single(R),
    /// A flat list: all records of a single input, or one record per input
    Flat(Vec<R>),
    /// One entry per input
    PerInput(Vec<RowOutput<R>>),
}

/// An inference pipeline for task `T`
pub trait Pipeline<T: Task> {
    /// Tokenizer the pipeline encodes with
    fn tokenizer(&self) -> &dyn Tokenizer;

    /// Run inference on a batch of prepared inputs
    fn run(&mut self, inputs: &[T::Input]) -> Result<RawOutput<T::Record>>;
}

/// Builds pipelines for task `T` from a loaded model `M` and tokenizer `K`
pub trait PipelineFactory<T: Task, M, K> {
    fn build(
        &self,
        task: TaskKind,
        model: Arc<M>,
        tokenizer: Arc<K>,
        device: &Device,
        param: &T::Param,
    ) -> Result<Box<dyn Pipeline<T>>>;
}
