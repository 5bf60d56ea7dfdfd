//! Expansion of predictions into ranked output rows

use crate::context::{Row, Value};
use crate::error::{Result, UdfError};
use crate::udf::{CacheKey, InputRow, Task};

/// One input row paired with one of its predictions
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow<'a, I, R> {
    pub key: &'a CacheKey,
    pub input: &'a I,
    pub record: R,
    /// 1-based position in the pipeline's output for this input
    pub rank: u32,
}

/// Repeat each row once per record, ranking records in pipeline order
pub fn reshape<'a, I, R>(
    rows: &[&'a InputRow<I>],
    records: Vec<Vec<R>>,
) -> Result<Vec<OutputRow<'a, I, R>>> {
    if rows.len() != records.len() {
        return Err(UdfError::PredictionShape(format!(
            "{} record lists for {} rows",
            records.len(),
            rows.len()
        )));
    }

    let mut output = Vec::with_capacity(records.iter().map(Vec::len).sum());
    for (row, row_records) in rows.iter().copied().zip(records) {
        output.extend((1u32..).zip(row_records).map(|(rank, record)| OutputRow {
            key: &row.key,
            input: &row.input,
            record,
            rank,
        }));
    }
    Ok(output)
}

/// Encode an output row in emitted column order
pub fn encode<T: Task>(row: &OutputRow<'_, T::Input, T::Record>) -> Row {
    let mut cells = Vec::new();
    row.key.write(&mut cells);
    T::write_input(row.input, &mut cells);
    T::write_record(&row.record, &mut cells);
    cells.push(Value::from(row.rank));
    cells
}
