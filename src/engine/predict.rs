//! Pipeline invocation and output normalization

use crate::config::UdfConfig;
use crate::error::{Result, UdfError};
use crate::pipeline::{Pipeline, RawOutput, RowOutput};
use crate::udf::{InputRow, Task};

/// Run `pipeline` on a homogeneous row subset
///
/// Returns one ordered record list per row, in row order.
pub fn predict<T: Task>(
    pipeline: &mut dyn Pipeline<T>,
    rows: &[&InputRow<T::Input>],
    config: &UdfConfig,
) -> Result<Vec<Vec<T::Record>>> {
    let inputs: Vec<T::Input> = rows.iter().map(|row| row.input.clone()).collect();
    let inputs = T::prepare(inputs, pipeline.tokenizer(), config)?;

    let raw = pipeline.run(&inputs)?;
    normalize(raw, rows.len())
}

/// Normalize a raw pipeline output for `n` inputs
pub fn normalize<R>(raw: RawOutput<R>, n: usize) -> Result<Vec<Vec<R>>> {
    match raw {
        RawOutput::Single(record) if n == 1 => Ok(vec![vec![record]]),
        RawOutput::Single(_) => Err(UdfError::PredictionShape(format!(
            "single record for {} inputs",
            n
        ))),
        RawOutput::Flat(records) if n == 1 => Ok(vec![records]),
        RawOutput::Flat(records) if records.len() == n => {
            Ok(records.into_iter().map(|r| vec![r]).collect())
        }
        RawOutput::Flat(records) => Err(UdfError::PredictionShape(format!(
            "flat list of {} records for {} inputs",
            records.len(),
            n
        ))),
        RawOutput::PerInput(outputs) if outputs.len() == n => Ok(outputs
            .into_iter()
            .map(|output| match output {
                RowOutput::One(record) => vec![record],
                RowOutput::Many(records) => records,
            })
            .collect()),
        RawOutput::PerInput(outputs) => Err(UdfError::PredictionShape(format!(
            "{} outputs for {} inputs",
            outputs.len(),
            n
        ))),
    }
}
