//! JSON output (and reading it back).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{ConversionError, ConversionResult};
use crate::types::Record;

use super::csv::open_input;

/// How JSON artifacts are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonLayout {
    /// Two-space indented output (default).
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
}

/// Serialize `value` to a new file at `path`.
///
/// Text is written as UTF-8 without escaping non-ASCII characters.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    value: &T,
    path: &Path,
    layout: JsonLayout,
) -> ConversionResult<()> {
    let file = File::create(path).map_err(|e| ConversionError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    let written = match layout {
        JsonLayout::Pretty => serde_json::to_writer_pretty(&mut writer, value),
        JsonLayout::Compact => serde_json::to_writer(&mut writer, value),
    };
    written.map_err(|e| ConversionError::write(path, e.into()))?;
    writer.flush().map_err(|e| ConversionError::write(path, e))
}

/// Read a JSON array of objects (as written by this crate) back into records.
///
/// Key order of every object is preserved.
pub fn read_json_records(path: impl AsRef<Path>) -> ConversionResult<Vec<Record>> {
    let path = path.as_ref();
    let file = open_input(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ConversionError::processing(path, e))
}
