//! Mask filling

use crate::config::UdfConfig;
use crate::context::{Row, RowReader, Value};
use crate::error::{Result, UdfError};
use crate::pipeline::TaskKind;
use crate::tokenizer::Tokenizer;

use super::{read_top_k, Task};

/// Predicts the top-k replacements for the mask token in a text
#[derive(Debug, Clone, Copy, Default)]
pub struct FillMask;

#[derive(Debug, Clone, PartialEq)]
pub struct FillMaskInput {
    /// Text containing the mask placeholder
    pub text_data: String,
    /// Number of candidates to return
    pub top_k: u32,
}

/// A candidate filling
#[derive(Debug, Clone, PartialEq)]
pub struct FilledMask {
    /// Input text with the mask replaced
    pub sequence: String,
    pub score: f64,
}

impl FilledMask {
    pub fn new(sequence: impl Into<String>, score: f64) -> Self {
        Self {
            sequence: sequence.into(),
            score,
        }
    }
}

impl Task for FillMask {
    const KIND: TaskKind = TaskKind::FillMask;

    type Input = FillMaskInput;
    type Param = u32;
    type Record = FilledMask;

    fn read_input(reader: &mut RowReader<'_>) -> Result<FillMaskInput> {
        Ok(FillMaskInput {
            text_data: reader.text("text_data")?,
            top_k: read_top_k(reader)?,
        })
    }

    fn param(input: &FillMaskInput) -> u32 {
        input.top_k
    }

    fn write_input(input: &FillMaskInput, row: &mut Row) {
        row.push(Value::from(input.text_data.as_str()));
        row.push(Value::from(input.top_k));
    }

    fn write_record(record: &FilledMask, row: &mut Row) {
        row.push(Value::from(record.sequence.as_str()));
        row.push(Value::from(record.score));
    }

    /// Replace the configured placeholder with the tokenizer's mask token
    fn prepare(
        inputs: Vec<FillMaskInput>,
        tokenizer: &dyn Tokenizer,
        config: &UdfConfig,
    ) -> Result<Vec<FillMaskInput>> {
        let mask = tokenizer
            .mask_token()
            .ok_or_else(|| UdfError::Tokenizer("tokenizer has no mask token".to_string()))?;

        if mask == config.mask_placeholder {
            return Ok(inputs);
        }

        Ok(inputs
            .into_iter()
            .map(|input| FillMaskInput {
                text_data: input.text_data.replace(&config.mask_placeholder, mask),
                ..input
            })
            .collect())
    }
}
