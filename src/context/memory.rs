//! In-memory execution context

use super::{ExecutionContext, Row, RowBatch};
use crate::error::Result;

/// Execution context backed by a fixed set of input rows
///
/// Mirrors the engine's cursor: `get_rows` advances through the input,
/// `reset_cursor` rewinds it, and every emitted batch is recorded.
#[derive(Debug, Default)]
pub struct MemoryContext {
    input: Vec<Row>,
    cursor: usize,
    emitted: Vec<RowBatch>,
}

impl MemoryContext {
    pub fn new(input: Vec<Row>) -> Self {
        Self {
            input,
            cursor: 0,
            emitted: Vec::new(),
        }
    }

    /// All emitted rows, flattened in emission order
    pub fn emitted_rows(&self) -> Vec<Row> {
        self.emitted.iter().flatten().cloned().collect()
    }

    /// Emitted batches as they were handed to `emit`
    pub fn emitted_batches(&self) -> &[RowBatch] {
        &self.emitted
    }
}

impl ExecutionContext for MemoryContext {
    fn get_rows(&mut self, batch_size: usize, start_column: usize) -> Result<Option<RowBatch>> {
        if self.cursor >= self.input.len() {
            return Ok(None);
        }

        let end = std::cmp::min(self.cursor.saturating_add(batch_size.max(1)), self.input.len());
        let batch = self.input[self.cursor..end]
            .iter()
            .map(|row| row.iter().skip(start_column).cloned().collect())
            .collect();
        self.cursor = end;
        Ok(Some(batch))
    }

    fn reset_cursor(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn emit(&mut self, batch: RowBatch) -> Result<()> {
        self.emitted.push(batch);
        Ok(())
    }
}
