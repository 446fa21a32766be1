//! Whole-file and single-row conversion.
//!
//! Most callers should use [`convert_all`], [`convert_row`] and [`save_as_json`], or a
//! [`Converter`] when the defaults in [`ConverterOptions`] need changing.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConversionError, ConversionResult};
use crate::types::{Record, Table};

use super::csv::{materialize_row, CsvSource, DEFAULT_NULL_VALUES};
use super::infer::{infer_schema_from_path, SchemaInference};
use super::json::{write_json, JsonLayout};
use super::observability::{report, ConversionContext, ConversionObserver, ConversionOperation, ConversionSeverity};

/// Options controlling how sources are read and JSON is written.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ConverterOptions {
    /// Field delimiter byte (default `b','`).
    pub delimiter: u8,
    /// Cell texts treated as missing. Empty cells are always missing.
    pub null_values: Vec<String>,
    /// JSON layout for written artifacts.
    pub json_layout: JsonLayout,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ConversionSeverity,
}

impl fmt::Debug for ConverterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterOptions")
            .field("delimiter", &char::from(self.delimiter))
            .field("null_values", &self.null_values)
            .field("json_layout", &self.json_layout)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_values: DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect(),
            json_layout: JsonLayout::default(),
            observer: None,
            alert_at_or_above: ConversionSeverity::Critical,
        }
    }
}

impl ConverterOptions {
    pub(crate) fn report<T>(
        &self,
        path: &Path,
        operation: ConversionOperation,
        result: &ConversionResult<T>,
        rows: impl FnOnce(&T) -> usize,
    ) {
        let ctx = ConversionContext {
            path: path.to_path_buf(),
            operation,
        };
        report(self.observer.as_ref(), self.alert_at_or_above, ctx, result, rows);
    }
}

/// Converts a delimited file into JSON-ready records.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    /// Create a converter with the given options.
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Options this converter was built with.
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Read the whole file at `path` into a [`Table`].
    ///
    /// Column types are inferred from every row, then each row is materialized with missing
    /// cells as [`crate::types::Value::Null`].
    ///
    /// # Errors
    ///
    /// - [`ConversionError::NotFound`] if `path` does not exist
    /// - [`ConversionError::EmptyInput`] if there is no header or no data row
    /// - [`ConversionError::Processing`] for any other read or parse failure
    pub fn convert_all(&self, path: impl AsRef<Path>) -> ConversionResult<Table> {
        let path = path.as_ref();
        let result = self.convert_all_impl(path);
        self.options
            .report(path, ConversionOperation::ConvertAll, &result, Table::row_count);
        result
    }

    fn convert_all_impl(&self, path: &Path) -> ConversionResult<Table> {
        let mut source = CsvSource::open(path, &self.options)?;
        let mut inference = SchemaInference::new(source.columns().clone());

        let mut raw = Vec::new();
        while source.advance()? {
            inference.observe(source.current().iter(), &self.options.null_values);
            raw.push((source.current_line(), source.current().clone()));
        }
        if raw.is_empty() {
            return Err(ConversionError::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        let schema = inference.finish();
        let columns = source.columns().clone();
        let records = raw
            .into_iter()
            .map(|(line, record)| {
                materialize_row(&schema, &record, line, &self.options.null_values)
                    .map(|values| Record::new(columns.clone(), values))
                    .map_err(|e| ConversionError::processing(path, e))
            })
            .collect::<ConversionResult<Vec<_>>>()?;

        debug!(path = %path.display(), rows = records.len(), columns = schema.len(), "converted csv");
        Ok(Table::new(schema, records))
    }

    /// Convert only the row at zero-based `index`.
    ///
    /// Types are still inferred over the whole file (so the result equals
    /// `convert_all(path)[index]`), but only the requested row is materialized.
    ///
    /// # Errors
    ///
    /// [`ConversionError::IndexOutOfRange`] when `index < 0` or `index >= row_count`, plus the
    /// errors of [`Self::convert_all`].
    pub fn convert_row(&self, path: impl AsRef<Path>, index: isize) -> ConversionResult<Record> {
        let path = path.as_ref();
        let result = self.convert_row_impl(path, index);
        self.options
            .report(path, ConversionOperation::ConvertRow, &result, |_| 1);
        result
    }

    fn convert_row_impl(&self, path: &Path, index: isize) -> ConversionResult<Record> {
        let inferred = infer_schema_from_path(path, &self.options, None)?;
        let row_count = inferred.row_count;
        if row_count == 0 {
            return Err(ConversionError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        let out_of_range = || ConversionError::IndexOutOfRange { index, row_count };
        let target = usize::try_from(index)
            .ok()
            .filter(|&i| i < row_count)
            .ok_or_else(out_of_range)?;

        let mut source = CsvSource::open(path, &self.options)?;
        for _ in 0..=target {
            if !source.advance()? {
                // The file shrank between passes.
                return Err(out_of_range());
            }
        }
        let values = source.materialize_current(&inferred.schema, &self.options.null_values)?;
        Ok(Record::new(inferred.schema.column_names(), values))
    }

    /// Write `table` to `out_path` as a JSON array of objects.
    ///
    /// Keys keep header order and missing values are written as explicit `null`.
    ///
    /// # Errors
    ///
    /// [`ConversionError::Write`] on any I/O failure.
    pub fn save_as_json(&self, table: &Table, out_path: impl AsRef<Path>) -> ConversionResult<()> {
        let out_path = out_path.as_ref();
        let result = write_json(table, out_path, self.options.json_layout);
        self.options
            .report(out_path, ConversionOperation::SaveJson, &result, |_| table.row_count());
        if result.is_ok() {
            debug!(path = %out_path.display(), rows = table.row_count(), "saved json");
        }
        result
    }
}

/// Read the whole file at `path` with default options. See [`Converter::convert_all`].
///
/// # Examples
///
/// ```no_run
/// use csv_json_convert::conversion::{convert_all, save_as_json};
///
/// # fn main() -> Result<(), csv_json_convert::ConversionError> {
/// let table = convert_all("train.csv")?;
/// println!("rows={}", table.row_count());
/// save_as_json(&table, "train.json")?;
/// # Ok(())
/// # }
/// ```
pub fn convert_all(path: impl AsRef<Path>) -> ConversionResult<Table> {
    Converter::default().convert_all(path)
}

/// Convert the row at `index` with default options. See [`Converter::convert_row`].
pub fn convert_row(path: impl AsRef<Path>, index: isize) -> ConversionResult<Record> {
    Converter::default().convert_row(path, index)
}

/// Save `table` with default options. See [`Converter::save_as_json`].
pub fn save_as_json(table: &Table, out_path: impl AsRef<Path>) -> ConversionResult<()> {
    Converter::default().save_as_json(table, out_path)
}
