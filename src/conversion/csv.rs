//! Delimited-text source reading shared by every conversion mode.
//!
//! Reading is split in two: [`super::infer`] decides a [`Schema`] from raw cells, and
//! [`materialize_row`] applies that schema to one raw row.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::StringRecord;

use crate::error::{ConversionError, ConversionResult, SourceError};
use crate::types::{DataType, Schema, Value};

use super::converter::ConverterOptions;

/// Cell texts treated as missing in addition to the empty string.
///
/// These follow the defaults of common dataframe readers.
pub const DEFAULT_NULL_VALUES: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

/// Open `path` for reading, mapping a missing file to [`ConversionError::NotFound`].
pub(crate) fn open_input(path: &Path) -> ConversionResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConversionError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConversionError::processing(path, e),
    })
}

/// An open delimited source positioned after its header row.
pub(crate) struct CsvSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: Arc<[String]>,
    record: StringRecord,
}

impl CsvSource {
    /// Open `path` and read its header.
    ///
    /// A source without a header row is [`ConversionError::EmptyInput`].
    pub(crate) fn open(path: &Path, options: &ConverterOptions) -> ConversionResult<Self> {
        let file = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(options.delimiter)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| ConversionError::processing(path, e))?;
        if headers.is_empty() {
            return Err(ConversionError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        let columns = dedupe_headers(headers.iter());

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
            record: StringRecord::new(),
        })
    }

    /// Column names in header order, duplicates disambiguated.
    pub(crate) fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    /// Advance to the next data row. Returns `Ok(false)` at end of input.
    pub(crate) fn advance(&mut self) -> ConversionResult<bool> {
        self.reader
            .read_record(&mut self.record)
            .map_err(|e| ConversionError::processing(&self.path, e))
    }

    /// The row read by the last successful [`Self::advance`].
    pub(crate) fn current(&self) -> &StringRecord {
        &self.record
    }

    /// 1-based source line of the current row, for error messages.
    pub(crate) fn current_line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }

    /// Materialize the current row against `schema`.
    pub(crate) fn materialize_current(
        &self,
        schema: &Schema,
        null_values: &[String],
    ) -> ConversionResult<Vec<Value>> {
        materialize_row(schema, &self.record, self.current_line(), null_values)
            .map_err(|e| ConversionError::processing(&self.path, e))
    }
}

/// Rename repeated header names `X`, `X` to `X`, `X.1` (then `X.2`, ...).
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Arc<[String]> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in raw {
        let mut candidate = name.to_owned();
        let mut suffix = 0;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{name}.{suffix}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out.into()
}

/// Returns `true` if `raw` is an empty cell or one of the configured null tokens.
pub(crate) fn is_null(raw: &str, null_values: &[String]) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || null_values.iter().any(|n| n == trimmed)
}

/// Parse a finite float. `inf` and `NaN` spellings are rejected so they stay text.
pub(crate) fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert one raw row into typed values in schema order.
///
/// Missing cells (short rows, empty cells, null tokens) become [`Value::Null`].
pub(crate) fn materialize_row(
    schema: &Schema,
    record: &StringRecord,
    line: u64,
    null_values: &[String],
) -> Result<Vec<Value>, SourceError> {
    schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let raw = record.get(idx).unwrap_or("");
            parse_typed_value(line, &field.name, field.data_type, raw, null_values)
        })
        .collect()
}

fn parse_typed_value(
    row: u64,
    column: &str,
    data_type: DataType,
    raw: &str,
    null_values: &[String],
) -> Result<Value, SourceError> {
    if is_null(raw, null_values) {
        return Ok(Value::Null);
    }

    let trimmed = raw.trim();
    let parse_error = |message: String| SourceError::Parse {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => parse_finite(trimmed)
            .map(Value::Float64)
            .ok_or_else(|| parse_error("expected finite number".to_string())),
        other => Err(parse_error(format!(
            "{other:?} is a narrowed type and cannot be read from text"
        ))),
    }
}
