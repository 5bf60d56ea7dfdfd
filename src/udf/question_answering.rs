//! Extractive question answering

use crate::context::{Row, RowReader, Value};
use crate::error::Result;
use crate::pipeline::TaskKind;

use super::{read_top_k, Task};

/// Extracts the top-k answer spans for a question from a context text
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionAnswering;

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionInput {
    pub question: String,
    pub context_text: String,
    pub top_k: u32,
}

/// An answer span
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub score: f64,
}

impl Answer {
    pub fn new(answer: impl Into<String>, score: f64) -> Self {
        Self {
            answer: answer.into(),
            score,
        }
    }
}

impl Task for QuestionAnswering {
    const KIND: TaskKind = TaskKind::QuestionAnswering;

    type Input = QuestionInput;
    type Param = u32;
    type Record = Answer;

    fn read_input(reader: &mut RowReader<'_>) -> Result<QuestionInput> {
        Ok(QuestionInput {
            question: reader.text("question")?,
            context_text: reader.text("context_text")?,
            top_k: read_top_k(reader)?,
        })
    }

    fn param(input: &QuestionInput) -> u32 {
        input.top_k
    }

    fn write_input(input: &QuestionInput, row: &mut Row) {
        row.push(Value::from(input.question.as_str()));
        row.push(Value::from(input.context_text.as_str()));
        row.push(Value::from(input.top_k));
    }

    fn write_record(record: &Answer, row: &mut Row) {
        row.push(Value::from(record.answer.as_str()));
        row.push(Value::from(record.score));
    }
}
