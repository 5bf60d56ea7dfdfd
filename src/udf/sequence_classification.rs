//! Sequence classification of single texts and text pairs
//!
//! Both UDFs emit one row per label. The pipeline parameter is `()`, so a
//! pipeline is built once per loaded model.

use crate::context::{Row, RowReader, Value};
use crate::error::{Result, UdfError};
use crate::pipeline::TaskKind;

use super::Task;

/// Classifies a single text
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceClassificationSingleText;

/// Classifies a pair of texts, e.g. for entailment
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceClassificationTextPair;

#[derive(Debug, Clone, PartialEq)]
pub struct SingleTextInput {
    pub text_data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPairInput {
    pub first_text: String,
    pub second_text: String,
}

/// Probability of one label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

fn write_label_score(record: &LabelScore, row: &mut Row) {
    row.push(Value::from(record.label.as_str()));
    row.push(Value::from(record.score));
}

impl Task for SequenceClassificationSingleText {
    const KIND: TaskKind = TaskKind::TextClassification;

    type Input = SingleTextInput;
    type Param = ();
    type Record = LabelScore;

    fn read_input(reader: &mut RowReader<'_>) -> Result<SingleTextInput> {
        Ok(SingleTextInput {
            text_data: reader.text("text_data")?,
        })
    }

    fn param(_input: &SingleTextInput) {}

    fn write_input(input: &SingleTextInput, row: &mut Row) {
        row.push(Value::from(input.text_data.as_str()));
    }

    fn write_record(record: &LabelScore, row: &mut Row) {
        write_label_score(record, row);
    }
}

impl Task for SequenceClassificationTextPair {
    const KIND: TaskKind = TaskKind::TextClassification;

    type Input = TextPairInput;
    type Param = ();
    type Record = LabelScore;

    fn read_input(reader: &mut RowReader<'_>) -> Result<TextPairInput> {
        Ok(TextPairInput {
            first_text: reader.text("first_text")?,
            second_text: reader.text("second_text")?,
        })
    }

    fn param(_input: &TextPairInput) {}

    fn write_input(input: &TextPairInput, row: &mut Row) {
        row.push(Value::from(input.first_text.as_str()));
        row.push(Value::from(input.second_text.as_str()));
    }

    fn write_record(record: &LabelScore, row: &mut Row) {
        write_label_score(record, row);
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pair each label with its softmax probability, in label order
///
/// `labels` follows the model config's `id2label` order.
pub fn label_scores(labels: &[String], logits: &[f32]) -> Result<Vec<LabelScore>> {
    if labels.len() != logits.len() {
        return Err(UdfError::PredictionShape(format!(
            "{} labels but {} logits",
            labels.len(),
            logits.len()
        )));
    }

    Ok(labels
        .iter()
        .zip(softmax(logits))
        .map(|(label, score)| LabelScore::new(label.as_str(), score))
        .collect())
}
