//! Host execution context
//!
//! The database engine hands rows to a UDF through a cursor and accepts
//! result rows through an emit sink. This module defines that contract plus
//! the untyped cell representation rows travel in.

mod memory;

pub use memory::MemoryContext;

use crate::error::{Result, UdfError};

/// One engine cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Double(_) => "DOUBLE",
            Value::Text(_) => "VARCHAR",
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row in engine column order
pub type Row = Vec<Value>;

/// Rows pulled or emitted in one cursor step
pub type RowBatch = Vec<Row>;

/// The engine side of a UDF invocation
pub trait ExecutionContext {
    /// Pull up to `batch_size` rows, dropping the first `start_column` columns
    ///
    /// Returns `None` once the input is exhausted.
    fn get_rows(&mut self, batch_size: usize, start_column: usize) -> Result<Option<RowBatch>>;

    /// Rewind the cursor to the first input row
    fn reset_cursor(&mut self) -> Result<()>;

    /// Emit result rows
    fn emit(&mut self, batch: RowBatch) -> Result<()>;
}

/// Sequential typed reader over one row's cells
pub struct RowReader<'a> {
    cells: std::slice::Iter<'a, Value>,
}

impl<'a> RowReader<'a> {
    pub fn new(row: &'a Row) -> Self {
        Self { cells: row.iter() }
    }

    fn next(&mut self, column: &'static str) -> Result<&'a Value> {
        self.cells
            .next()
            .ok_or_else(|| UdfError::column(column, "missing cell"))
    }

    /// Read a non-null text cell
    pub fn text(&mut self, column: &'static str) -> Result<String> {
        let value = self.next(column)?;
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| UdfError::column(column, format!("expected VARCHAR, got {}", value.type_name())))
    }

    /// Read a text cell that may be NULL
    pub fn optional_text(&mut self, column: &'static str) -> Result<Option<String>> {
        match self.next(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(UdfError::column(
                column,
                format!("expected VARCHAR, got {}", other.type_name()),
            )),
        }
    }

    /// Read a non-null integer cell
    pub fn integer(&mut self, column: &'static str) -> Result<i64> {
        let value = self.next(column)?;
        value
            .as_integer()
            .ok_or_else(|| UdfError::column(column, format!("expected INTEGER, got {}", value.type_name())))
    }

    /// Read an integer cell that may be NULL
    pub fn optional_integer(&mut self, column: &'static str) -> Result<Option<i64>> {
        match self.next(column)? {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v)),
            other => Err(UdfError::column(
                column,
                format!("expected INTEGER, got {}", other.type_name()),
            )),
        }
    }
}
