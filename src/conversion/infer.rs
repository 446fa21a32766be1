//! Per-column type inference.
//!
//! A column is [`DataType::Int64`] if every non-missing cell parses as a 64-bit integer,
//! [`DataType::Float64`] if every non-missing cell parses as a finite number, and
//! [`DataType::Utf8`] otherwise. A column without a single non-missing cell is `Float64`.

use std::path::Path;
use std::sync::Arc;

use crate::error::ConversionResult;
use crate::types::{DataType, Field, Schema};

use super::converter::ConverterOptions;
use super::csv::{is_null, parse_finite, CsvSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Unseen,
    Integer,
    Float,
    Text,
}

impl Inferred {
    fn widen(self, cell: &str) -> Self {
        match self {
            Self::Text => Self::Text,
            Self::Unseen | Self::Integer if cell.parse::<i64>().is_ok() => Self::Integer,
            Self::Unseen | Self::Integer | Self::Float if parse_finite(cell).is_some() => Self::Float,
            _ => Self::Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::Unseen | Self::Float => DataType::Float64,
            Self::Text => DataType::Utf8,
        }
    }
}

/// Incremental schema inference over raw rows.
///
/// Feed rows with [`SchemaInference::observe`], then call [`SchemaInference::finish`].
#[derive(Debug, Clone)]
pub struct SchemaInference {
    columns: Arc<[String]>,
    states: Vec<Inferred>,
    rows: usize,
}

impl SchemaInference {
    /// Start inference for the given header.
    pub fn new(columns: Arc<[String]>) -> Self {
        let states = vec![Inferred::Unseen; columns.len()];
        Self {
            columns,
            states,
            rows: 0,
        }
    }

    /// Observe one raw row. Cells past the header width are ignored.
    pub fn observe<'a>(&mut self, cells: impl IntoIterator<Item = &'a str>, null_values: &[String]) {
        for (state, cell) in self.states.iter_mut().zip(cells) {
            if !is_null(cell, null_values) {
                *state = state.widen(cell.trim());
            }
        }
        self.rows += 1;
    }

    /// Number of rows observed so far.
    pub fn rows_observed(&self) -> usize {
        self.rows
    }

    /// Produce the inferred schema.
    pub fn finish(self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .zip(self.states)
                .map(|(name, state)| Field::new(name.clone(), state.data_type()))
                .collect(),
        )
    }
}

/// Result of an inference pass over a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchema {
    /// Inferred schema.
    pub schema: Schema,
    /// Number of data rows observed.
    pub row_count: usize,
}

/// Infer a schema by streaming `path` without retaining rows.
///
/// If `limit` is set, only the first `limit` data rows are observed.
pub fn infer_schema_from_path(
    path: impl AsRef<Path>,
    options: &ConverterOptions,
    limit: Option<usize>,
) -> ConversionResult<InferredSchema> {
    let mut source = CsvSource::open(path.as_ref(), options)?;
    let mut inference = SchemaInference::new(source.columns().clone());
    while limit.is_none_or(|max| inference.rows_observed() < max) && source.advance()? {
        inference.observe(source.current().iter(), &options.null_values);
    }
    let row_count = inference.rows_observed();
    Ok(InferredSchema {
        schema: inference.finish(),
        row_count,
    })
}
