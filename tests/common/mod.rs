//! Shared mocks for UDF integration tests
//!
//! The mock loader and factory append to an event log so tests can count
//! loads, device memory releases and pipeline builds, and check their order.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use transformers_udf::bucketfs::{
    ConnectionDescriptor, ModelLocation, ModelLocator, MountedBucketFs, StaticConnections,
};
use transformers_udf::config::{Device, UdfConfig};
use transformers_udf::context::{Row, Value};
use transformers_udf::engine::BatchDispatcher;
use transformers_udf::loader::{ModelLoader, TokenizerLoader};
use transformers_udf::pipeline::{Pipeline, PipelineFactory, RawOutput, TaskKind};
use transformers_udf::tokenizer::Tokenizer;
use transformers_udf::udf::Task;
use transformers_udf::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Load {
        path: PathBuf,
        token: Option<String>,
        device: Device,
    },
    Release,
    Build {
        task: TaskKind,
        model: String,
        param: String,
    },
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn count(log: &Log, matches: impl Fn(&Event) -> bool) -> usize {
    log.borrow().iter().filter(|e| matches(e)).count()
}

pub fn loads(log: &Log) -> usize {
    count(log, |e| matches!(e, Event::Load { .. }))
}

pub fn releases(log: &Log) -> usize {
    count(log, |e| matches!(e, Event::Release))
}

pub fn builds(log: &Log) -> usize {
    count(log, |e| matches!(e, Event::Build { .. }))
}

/// Loaded model stand-in: remembers where it was loaded from
#[derive(Debug)]
pub struct MockModel {
    pub name: String,
    pub path: PathBuf,
}

pub struct MockModelLoader {
    log: Log,
}

impl ModelLoader for MockModelLoader {
    type Model = MockModel;

    fn load_model(
        &self,
        model_name: &str,
        location: &ModelLocation,
        device: &Device,
    ) -> Result<MockModel> {
        self.log.borrow_mut().push(Event::Load {
            path: location.cache_dir.clone(),
            token: location.token.clone(),
            device: *device,
        });
        Ok(MockModel {
            name: model_name.to_string(),
            path: location.cache_dir.clone(),
        })
    }

    fn release_device_memory(&self, _device: &Device) {
        self.log.borrow_mut().push(Event::Release);
    }
}

pub struct MockTokenizer {
    mask: Option<String>,
}

impl Tokenizer for MockTokenizer {
    fn mask_token(&self) -> Option<&str> {
        self.mask.as_deref()
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.split_whitespace().map(|w| w.len() as u32).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Ok(format!("{:?}", ids))
    }

    fn vocab_size(&self) -> usize {
        0
    }
}

pub struct MockTokenizerLoader {
    mask: Option<String>,
}

impl TokenizerLoader for MockTokenizerLoader {
    type Tokenizer = MockTokenizer;

    fn load_tokenizer(&self, _model_name: &str, _location: &ModelLocation) -> Result<MockTokenizer> {
        Ok(MockTokenizer {
            mask: self.mask.clone(),
        })
    }
}

type RespondFn<T> = dyn Fn(&MockModel, &<T as Task>::Param, &[<T as Task>::Input]) -> RawOutput<<T as Task>::Record>;

/// Produces a pipeline's raw output from the model, parameter and inputs
pub struct Respond<T: Task>(Rc<RespondFn<T>>);

impl<T: Task> Respond<T> {
    pub fn new(
        respond: impl Fn(&MockModel, &T::Param, &[T::Input]) -> RawOutput<T::Record> + 'static,
    ) -> Self {
        Self(Rc::new(respond))
    }
}

impl<T: Task> Clone for Respond<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

pub struct MockPipeline<T: Task> {
    model: Arc<MockModel>,
    tokenizer: Arc<MockTokenizer>,
    param: T::Param,
    respond: Respond<T>,
}

impl<T: Task> Pipeline<T> for MockPipeline<T> {
    fn tokenizer(&self) -> &dyn Tokenizer {
        &*self.tokenizer
    }

    fn run(&mut self, inputs: &[T::Input]) -> Result<RawOutput<T::Record>> {
        Ok((self.respond.0)(&self.model, &self.param, inputs))
    }
}

pub struct MockFactory<T: Task> {
    log: Log,
    respond: Respond<T>,
}

impl<T: Task> PipelineFactory<T, MockModel, MockTokenizer> for MockFactory<T> {
    fn build(
        &self,
        task: TaskKind,
        model: Arc<MockModel>,
        tokenizer: Arc<MockTokenizer>,
        _device: &Device,
        param: &T::Param,
    ) -> Result<Box<dyn Pipeline<T>>> {
        self.log.borrow_mut().push(Event::Build {
            task,
            model: model.name.clone(),
            param: format!("{:?}", param),
        });
        Ok(Box::new(MockPipeline {
            model,
            tokenizer,
            param: param.clone(),
            respond: self.respond.clone(),
        }))
    }
}

pub type MockUdf<T> = BatchDispatcher<T, MockModelLoader, MockTokenizerLoader, MockFactory<T>>;

pub struct UdfBuilder {
    batch_size: usize,
    mask: Option<String>,
}

impl Default for UdfBuilder {
    fn default() -> Self {
        Self {
            batch_size: 100,
            mask: Some("[MASK]".to_string()),
        }
    }
}

impl UdfBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn mask(mut self, mask: Option<&str>) -> Self {
        self.mask = mask.map(str::to_string);
        self
    }

    pub fn build<T: Task>(self, respond: Respond<T>) -> (MockUdf<T>, Log) {
        let log = Log::default();
        let udf = BatchDispatcher::new(
            UdfConfig::default().with_batch_size(self.batch_size),
            locator(),
            MockModelLoader { log: log.clone() },
            MockTokenizerLoader { mask: self.mask },
            MockFactory {
                log: log.clone(),
                respond,
            },
        )
        .unwrap();
        (udf, log)
    }
}

/// Connections: two buckets under /bfs and two tokens
pub fn locator() -> ModelLocator {
    let connections = StaticConnections::new()
        .with("bfs_conn1", ConnectionDescriptor::new("file:///bfs/bfs_conn1"))
        .with("bfs_conn2", ConnectionDescriptor::new("file:///bfs/bfs_conn2"))
        .with("token_conn1", ConnectionDescriptor::token("token1"))
        .with("token_conn2", ConnectionDescriptor::token("token2"));
    ModelLocator::new(connections, MountedBucketFs::default())
}

/// Input row: device hint, model columns, then task cells
pub fn input_row(
    device_id: Option<i64>,
    bucketfs_conn: &str,
    token_conn: Option<&str>,
    sub_dir: &str,
    model_name: &str,
    task_cells: Vec<Value>,
) -> Row {
    let mut row = vec![
        Value::from(device_id),
        Value::from(bucketfs_conn),
        Value::from(token_conn),
        Value::from(sub_dir),
        Value::from(model_name),
    ];
    row.extend(task_cells);
    row
}

pub fn text(row: &Row, column: usize) -> &str {
    row[column].as_text().unwrap_or_default()
}

pub fn integer(row: &Row, column: usize) -> i64 {
    row[column].as_integer().unwrap_or(-1)
}

/// Rows rendered as strings and sorted, for order-insensitive comparison
pub fn sorted_rows(rows: &[Row]) -> Vec<String> {
    let mut rendered: Vec<String> = rows.iter().map(|r| format!("{:?}", r)).collect();
    rendered.sort();
    rendered
}
