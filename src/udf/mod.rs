//! UDF entry points
//!
//! Each UDF is a `BatchDispatcher` specialised to a `Task`. The task decides
//! how its columns are read and written, which parameter selects the
//! pipeline, and how inputs are prepared for inference. Everything else
//! (grouping, caching, reshaping) is shared.
//!
//! Input rows are laid out as `device_id`, the model columns
//! (`bucketfs_conn`, `token_conn`, `sub_dir`, `model_name`) and then the task
//! columns. Output rows repeat the model and task columns and append the
//! record fields plus `rank`.

mod fill_mask;
mod keys;
mod question_answering;
mod sequence_classification;

pub use fill_mask::{FillMask, FillMaskInput, FilledMask};
pub use keys::{partition, partition_by_param};
pub use question_answering::{Answer, QuestionAnswering, QuestionInput};
pub use sequence_classification::{
    label_scores, softmax, LabelScore, SequenceClassificationSingleText,
    SequenceClassificationTextPair, SingleTextInput, TextPairInput,
};

use std::fmt;

use crate::config::UdfConfig;
use crate::context::{Row, RowReader, Value};
use crate::engine::BatchDispatcher;
use crate::error::{Result, UdfError};
use crate::pipeline::TaskKind;
use crate::tokenizer::Tokenizer;

/// Mask-filling UDF
pub type FillMaskUdf<ML, TL, PF> = BatchDispatcher<FillMask, ML, TL, PF>;

/// Extractive question answering UDF
pub type QuestionAnsweringUdf<ML, TL, PF> = BatchDispatcher<QuestionAnswering, ML, TL, PF>;

/// Single-text sequence classification UDF
pub type SequenceClassificationSingleTextUdf<ML, TL, PF> =
    BatchDispatcher<SequenceClassificationSingleText, ML, TL, PF>;

/// Text-pair sequence classification UDF
pub type SequenceClassificationTextPairUdf<ML, TL, PF> =
    BatchDispatcher<SequenceClassificationTextPair, ML, TL, PF>;

/// Identity of a loaded model instance
///
/// Ordered by model name, then connection, sub-directory and token
/// connection. Rows sharing a key share one loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub model_name: String,
    pub bucketfs_conn: String,
    pub sub_dir: String,
    pub token_conn: Option<String>,
}

impl CacheKey {
    /// Read the model columns
    pub fn read(reader: &mut RowReader<'_>) -> Result<Self> {
        let bucketfs_conn = reader.text("bucketfs_conn")?;
        let token_conn = reader
            .optional_text("token_conn")?
            .filter(|name| !name.is_empty());
        let sub_dir = reader.text("sub_dir")?;
        let model_name = reader.text("model_name")?;

        Ok(Self {
            model_name,
            bucketfs_conn,
            sub_dir,
            token_conn,
        })
    }

    /// Append the model columns in input order
    pub fn write(&self, row: &mut Row) {
        row.push(Value::from(self.bucketfs_conn.as_str()));
        row.push(Value::from(self.token_conn.as_deref()));
        row.push(Value::from(self.sub_dir.as_str()));
        row.push(Value::from(self.model_name.as_str()));
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.bucketfs_conn, self.sub_dir, self.model_name)
    }
}

/// A decoded input row
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow<I> {
    pub key: CacheKey,
    pub input: I,
}

impl<I> InputRow<I> {
    pub fn new(key: CacheKey, input: I) -> Self {
        Self { key, input }
    }
}

/// Decode an engine row (device hint already stripped) for task `T`
pub fn decode<T: Task>(row: &Row) -> Result<InputRow<T::Input>> {
    let mut reader = RowReader::new(row);
    let key = CacheKey::read(&mut reader)?;
    let input = T::read_input(&mut reader)?;
    Ok(InputRow { key, input })
}

/// An inference task exposed as a UDF
pub trait Task: 'static {
    /// Pipeline task the UDF builds
    const KIND: TaskKind;

    /// Task columns of an input row
    type Input: Clone + fmt::Debug;

    /// Parameter a pipeline is configured with; changing it forces a rebuild
    type Param: Clone + Ord + fmt::Debug;

    /// One prediction
    type Record: Clone + fmt::Debug;

    /// Read the task columns
    fn read_input(reader: &mut RowReader<'_>) -> Result<Self::Input>;

    /// Pipeline parameter of an input
    fn param(input: &Self::Input) -> Self::Param;

    /// Append the task columns
    fn write_input(input: &Self::Input, row: &mut Row);

    /// Append the fields of one prediction
    fn write_record(record: &Self::Record, row: &mut Row);

    /// Rewrite inputs for the pipeline's tokenizer before inference
    fn prepare(
        inputs: Vec<Self::Input>,
        _tokenizer: &dyn Tokenizer,
        _config: &UdfConfig,
    ) -> Result<Vec<Self::Input>> {
        Ok(inputs)
    }
}

/// Read a `top_k` column; it must be a positive 32-bit count
pub(crate) fn read_top_k(reader: &mut RowReader<'_>) -> Result<u32> {
    let top_k = reader.integer("top_k")?;
    match u32::try_from(top_k) {
        Ok(k) if k >= 1 => Ok(k),
        _ => Err(UdfError::column(
            "top_k",
            format!("must be between 1 and {}, got {}", u32::MAX, top_k),
        )),
    }
}
