//! Batch dispatch loop driving one UDF invocation

use tracing::debug;

use crate::bucketfs::ModelLocator;
use crate::config::{Device, UdfConfig};
use crate::context::{ExecutionContext, RowBatch, RowReader};
use crate::error::Result;
use crate::loader::{ModelLoader, TokenizerLoader};
use crate::pipeline::PipelineFactory;
use crate::udf::{self, partition, partition_by_param, Task};

use super::memo::{ModelMemo, PipelineMemo, Reload};
use super::predict::predict;
use super::reshape::{encode, reshape};

/// Column holding the device hint
const DEVICE_COLUMN: usize = 0;
/// First data column after the device hint
const DATA_START_COLUMN: usize = 1;

enum State {
    AwaitingBatch,
    ProcessingBatch(RowBatch),
    Done,
}

/// Runs task `T` over the rows of an execution context
///
/// Rows are grouped by cache key, then by task parameter. The model and
/// pipeline caches carry over between groups and batches, so a model is
/// only reloaded when the key changes.
pub struct BatchDispatcher<T, ML, TL, PF>
where
    T: Task,
    ML: ModelLoader,
    TL: TokenizerLoader,
    PF: PipelineFactory<T, ML::Model, TL::Tokenizer>,
{
    config: UdfConfig,
    locator: ModelLocator,
    factory: PF,
    // Declared before `models` so pipelines drop before the model they use
    pipelines: PipelineMemo<T>,
    models: ModelMemo<ML, TL>,
}

impl<T, ML, TL, PF> BatchDispatcher<T, ML, TL, PF>
where
    T: Task,
    ML: ModelLoader,
    TL: TokenizerLoader,
    PF: PipelineFactory<T, ML::Model, TL::Tokenizer>,
{
    /// Fails with `UdfError::Config` when `config` does not validate
    pub fn new(
        config: UdfConfig,
        locator: ModelLocator,
        model_loader: ML,
        tokenizer_loader: TL,
        factory: PF,
    ) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
            locator,
            factory,
            pipelines: PipelineMemo::new(),
            models: ModelMemo::new(model_loader, tokenizer_loader, Device::default()),
        })
    }

    /// Run the invocation to completion
    ///
    /// Device memory is released when the input is exhausted and on error.
    pub fn run<C: ExecutionContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        let result = self.run_batches(ctx);
        self.pipelines.invalidate();
        self.models.release();
        result
    }

    fn run_batches<C: ExecutionContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        let device = read_device(ctx)?;
        ctx.reset_cursor()?;
        if device != self.models.device() {
            self.pipelines.invalidate();
            self.models.set_device(device);
        }

        let mut state = State::AwaitingBatch;
        loop {
            state = match state {
                State::AwaitingBatch => {
                    match ctx.get_rows(self.config.batch_size, DATA_START_COLUMN)? {
                        Some(batch) => State::ProcessingBatch(batch),
                        None => State::Done,
                    }
                }
                State::ProcessingBatch(batch) => {
                    let output = self.process_batch(&batch)?;
                    debug!(
                        input_rows = batch.len(),
                        output_rows = output.len(),
                        "Emitting batch"
                    );
                    ctx.emit(output)?;
                    State::AwaitingBatch
                }
                State::Done => return Ok(()),
            };
        }
    }

    /// Predict one batch of rows (device hint already stripped)
    pub fn process_batch(&mut self, batch: &RowBatch) -> Result<RowBatch> {
        let rows = batch
            .iter()
            .map(udf::decode::<T>)
            .collect::<Result<Vec<_>>>()?;

        let mut output = RowBatch::new();
        for (key, key_rows) in partition(&rows) {
            if self.models.current_key() != Some(&key) {
                self.pipelines.invalidate();
            }
            let (model, tokenizer) = {
                let (loaded, reload) = self.models.ensure(&key, &self.locator)?;
                if reload == Reload::Loaded {
                    debug!(key = %key, rows = key_rows.len(), "Model reloaded");
                }
                (loaded.model.clone(), loaded.tokenizer.clone())
            };
            let device = self.models.device();

            for (param, param_rows) in partition_by_param::<T>(&key_rows) {
                let factory = &self.factory;
                let pipeline = self.pipelines.ensure(&param, |param| {
                    factory.build(T::KIND, model.clone(), tokenizer.clone(), &device, param)
                })?;

                let records = predict::<T>(pipeline, &param_rows, &self.config)?;
                let reshaped = reshape(&param_rows, records)?;
                output.extend(reshaped.iter().map(encode::<T>));
            }
        }
        Ok(output)
    }
}

/// Device hint from the first input row; no input means CPU
fn read_device<C: ExecutionContext + ?Sized>(ctx: &mut C) -> Result<Device> {
    let device_id = match ctx.get_rows(1, DEVICE_COLUMN)? {
        Some(batch) => match batch.first() {
            Some(row) => RowReader::new(row).optional_integer("device_id")?,
            None => None,
        },
        None => None,
    };
    Device::from_device_id(device_id)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::*;
    use crate::bucketfs::{ConnectionDescriptor, ModelLocation, MountedBucketFs, StaticConnections};
    use crate::context::{MemoryContext, Row, Value};
    use crate::error::UdfError;
    use crate::pipeline::{Pipeline, RawOutput, TaskKind};
    use crate::tokenizer::Tokenizer;
    use crate::udf::{QuestionAnswering, QuestionInput, Answer};

    struct CountingLoader {
        loads: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
    }

    impl ModelLoader for CountingLoader {
        type Model = ();

        fn load_model(&self, _name: &str, _location: &ModelLocation, _device: &Device) -> Result<()> {
            self.loads.set(self.loads.get() + 1);
            Ok(())
        }

        fn release_device_memory(&self, _device: &Device) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    struct PlainTokenizer;

    impl Tokenizer for PlainTokenizer {
        fn mask_token(&self) -> Option<&str> {
            None
        }
        fn encode(&self, _text: &str) -> Result<Vec<u32>> {
            Ok(Vec::new())
        }
        fn decode(&self, _ids: &[u32]) -> Result<String> {
            Ok(String::new())
        }
        fn vocab_size(&self) -> usize {
            0
        }
    }

    struct PlainTokenizerLoader;

    impl TokenizerLoader for PlainTokenizerLoader {
        type Tokenizer = PlainTokenizer;

        fn load_tokenizer(&self, _name: &str, _location: &ModelLocation) -> Result<PlainTokenizer> {
            Ok(PlainTokenizer)
        }
    }

    /// Answers every question with its context, `top_k` times
    struct EchoPipeline {
        top_k: u32,
    }

    impl Pipeline<QuestionAnswering> for EchoPipeline {
        fn tokenizer(&self) -> &dyn Tokenizer {
            &PlainTokenizer
        }

        fn run(&mut self, inputs: &[QuestionInput]) -> Result<RawOutput<Answer>> {
            let answers: Vec<Answer> = inputs
                .iter()
                .flat_map(|input| {
                    (0..self.top_k).map(move |i| Answer::new(input.context_text.clone(), 1.0 / (i + 1) as f64))
                })
                .collect();
            // A single question collapses to a bare answer for top_k = 1
            Ok(match (inputs.len(), answers.len()) {
                (1, 1) => RawOutput::Single(answers[0].clone()),
                _ if self.top_k == 1 => RawOutput::Flat(answers),
                _ => RawOutput::PerInput(
                    answers
                        .chunks(self.top_k as usize)
                        .map(|chunk| crate::pipeline::RowOutput::Many(chunk.to_vec()))
                        .collect(),
                ),
            })
        }
    }

    struct EchoFactory {
        builds: Rc<Cell<usize>>,
    }

    impl PipelineFactory<QuestionAnswering, (), PlainTokenizer> for EchoFactory {
        fn build(
            &self,
            task: TaskKind,
            _model: Arc<()>,
            _tokenizer: Arc<PlainTokenizer>,
            _device: &Device,
            top_k: &u32,
        ) -> Result<Box<dyn Pipeline<QuestionAnswering>>> {
            assert_eq!(task, TaskKind::QuestionAnswering);
            self.builds.set(self.builds.get() + 1);
            Ok(Box::new(EchoPipeline { top_k: *top_k }))
        }
    }

    struct Counters {
        loads: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
        builds: Rc<Cell<usize>>,
    }

    type EchoDispatcher =
        BatchDispatcher<QuestionAnswering, CountingLoader, PlainTokenizerLoader, EchoFactory>;

    fn dispatcher(batch_size: usize) -> (EchoDispatcher, Counters) {
        try_dispatcher(UdfConfig::default().with_batch_size(batch_size)).unwrap()
    }

    fn try_dispatcher(config: UdfConfig) -> Result<(EchoDispatcher, Counters)> {
        let counters = Counters {
            loads: Rc::default(),
            releases: Rc::default(),
            builds: Rc::default(),
        };
        let connections = StaticConnections::new()
            .with("conn1", ConnectionDescriptor::new("file:///bfs1"))
            .with("conn2", ConnectionDescriptor::new("file:///bfs2"));
        let dispatcher = BatchDispatcher::new(
            config,
            ModelLocator::new(connections, MountedBucketFs::default()),
            CountingLoader {
                loads: counters.loads.clone(),
                releases: counters.releases.clone(),
            },
            PlainTokenizerLoader,
            EchoFactory {
                builds: counters.builds.clone(),
            },
        )?;
        Ok((dispatcher, counters))
    }

    /// Hands out exactly `batch_size` rows per call, so a zero size never
    /// advances the cursor
    struct ExactContext {
        input: Vec<Row>,
        cursor: usize,
        emits: usize,
    }

    impl ExecutionContext for ExactContext {
        fn get_rows(&mut self, batch_size: usize, start_column: usize) -> Result<Option<RowBatch>> {
            if self.cursor >= self.input.len() {
                return Ok(None);
            }
            let end = self.cursor.saturating_add(batch_size).min(self.input.len());
            let batch = self.input[self.cursor..end]
                .iter()
                .map(|row| row[start_column..].to_vec())
                .collect();
            self.cursor = end;
            Ok(Some(batch))
        }

        fn reset_cursor(&mut self) -> Result<()> {
            self.cursor = 0;
            Ok(())
        }

        fn emit(&mut self, _batch: RowBatch) -> Result<()> {
            self.emits += 1;
            Ok(())
        }
    }

    fn row(conn: &str, context: &str, top_k: i64) -> Vec<Value> {
        vec![
            Value::Null,
            Value::from(conn),
            Value::Null,
            Value::from("sub"),
            Value::from("model1"),
            Value::from("question?"),
            Value::from(context),
            Value::from(top_k),
        ]
    }

    #[test]
    fn test_single_question_scalar_result() {
        let (mut udf, counters) = dispatcher(10);
        let mut ctx = MemoryContext::new(vec![row("conn1", "ctx", 1)]);

        udf.run(&mut ctx).unwrap();
        let rows = ctx.emitted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][7], Value::from("ctx"));
        assert_eq!(rows[0][9], Value::Integer(1));
        assert_eq!(counters.loads.get(), 1);
    }

    #[test]
    fn test_batches_share_loaded_model() {
        let (mut udf, counters) = dispatcher(2);
        let input = (0..5).map(|i| row("conn1", &format!("c{}", i), 2)).collect();
        let mut ctx = MemoryContext::new(input);

        udf.run(&mut ctx).unwrap();
        assert_eq!(ctx.emitted_batches().len(), 3);
        assert_eq!(ctx.emitted_rows().len(), 10);
        assert_eq!(counters.loads.get(), 1);
        assert_eq!(counters.builds.get(), 1);
    }

    #[test]
    fn test_pipeline_built_once_per_top_k() {
        let (mut udf, counters) = dispatcher(100);
        let input = vec![
            row("conn1", "a", 2),
            row("conn1", "b", 1),
            row("conn1", "c", 2),
            row("conn1", "d", 1),
        ];
        let mut ctx = MemoryContext::new(input);

        udf.run(&mut ctx).unwrap();
        assert_eq!(counters.builds.get(), 2);
        assert_eq!(ctx.emitted_rows().len(), 6);
    }

    #[test]
    fn test_connection_change_reloads_and_rebuilds() {
        let (mut udf, counters) = dispatcher(100);
        let input = vec![row("conn1", "a", 1), row("conn2", "b", 1)];
        let mut ctx = MemoryContext::new(input);

        udf.run(&mut ctx).unwrap();
        assert_eq!(counters.loads.get(), 2);
        assert_eq!(counters.builds.get(), 2);
        // before each load and once at the end
        assert_eq!(counters.releases.get(), 3);
    }

    #[test]
    fn test_device_hint() {
        let (mut udf, _counters) = dispatcher(100);
        let mut first = row("conn1", "a", 1);
        first[0] = Value::Integer(1);
        let mut ctx = MemoryContext::new(vec![first]);

        udf.run(&mut ctx).unwrap();
        assert_eq!(udf.models.device(), Device::Cuda(1));
    }

    #[test]
    fn test_negative_device_rejected() {
        let (mut udf, counters) = dispatcher(100);
        let mut first = row("conn1", "a", 1);
        first[0] = Value::Integer(-1);
        let mut ctx = MemoryContext::new(vec![first]);

        let err = udf.run(&mut ctx).unwrap_err();
        assert!(matches!(err, UdfError::Column { column: "device_id", .. }));
        assert_eq!(counters.releases.get(), 1);
        assert!(ctx.emitted_rows().is_empty());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = try_dispatcher(UdfConfig::default().with_batch_size(0));
        assert!(matches!(result, Err(UdfError::Config(_))));
    }

    #[test]
    fn test_exact_batches_run_to_completion() {
        let (mut udf, counters) = dispatcher(1);
        let mut ctx = ExactContext {
            input: vec![row("conn1", "a", 1), row("conn1", "b", 1), row("conn1", "c", 1)],
            cursor: 0,
            emits: 0,
        };

        udf.run(&mut ctx).unwrap();
        assert_eq!(ctx.emits, 3);
        assert_eq!(counters.loads.get(), 1);
        assert_eq!(counters.releases.get(), 2);
    }
}
