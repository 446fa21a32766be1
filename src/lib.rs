//! `csv-json-convert` turns delimited text tables (for example a passenger manifest) into JSON
//! records.
//!
//! The primary entrypoints are [`conversion::convert_all`] (whole file into a [`types::Table`]),
//! [`conversion::convert_row`] (one row) and [`conversion::save_as_json`]. Larger files go
//! through [`conversion::ChunkedConverter`].
//!
//! ## Data model
//!
//! Every converted row is a [`types::Record`]: an ordered column-name to [`types::Value`]
//! mapping whose keys follow the source header. Column types are inferred per column:
//!
//! - [`types::DataType::Int64`] if every non-missing cell is an integer
//! - [`types::DataType::Float64`] if every non-missing cell is a finite number
//! - [`types::DataType::Utf8`] otherwise
//!
//! Empty cells (and tokens such as `NA` or `NaN`) become [`types::Value::Null`] and are written
//! as JSON `null`, never as `""` or `NaN`.
//!
//! ## Quick example: whole file
//!
//! ```no_run
//! use csv_json_convert::conversion::{convert_all, convert_row, save_as_json};
//! use csv_json_convert::types::Value;
//!
//! # fn main() -> Result<(), csv_json_convert::ConversionError> {
//! let table = convert_all("train.csv")?;
//! println!("rows={}", table.row_count());
//!
//! let last = convert_row("train.csv", table.row_count() as isize - 1)?;
//! assert_eq!(Some(&last), table.records.last());
//! if last.get("Cabin") == Some(&Value::Null) {
//!     println!("no cabin recorded");
//! }
//!
//! save_as_json(&table, "train.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Chunked conversion
//!
//! Each chunk narrows its numeric columns to the smallest width holding its values
//! (`UInt8`, `UInt16`, `Int8`, `Int16`, `Float32`). Integer narrowing is exact; **float narrowing
//! is lossy** (`f64` to `f32`, about 7 significant digits).
//!
//! ```no_run
//! use csv_json_convert::conversion::{ChunkedConverter, ChunkedOptions};
//!
//! # fn main() -> Result<(), csv_json_convert::ConversionError> {
//! let converter = ChunkedConverter::new(ChunkedOptions {
//!     chunk_rows: 100,
//!     ..Default::default()
//! });
//!
//! let info = converter.inspect("train.csv")?;
//! println!("~{} rows, suggested chunk size {}", info.estimated_rows, info.recommended_chunk_size);
//!
//! // chunk_0001.json, chunk_0002.json, ...
//! let stats = converter.convert_large("train.csv", "json_output", true)?;
//! println!("{} rows in {} files", stats.total_rows, stats.files_written);
//!
//! // Stop after ten records without reading the rest into memory.
//! for record in converter.stream_rows("train.csv")?.take(10) {
//!     println!("{:?}", record?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`conversion`]: converters, inference, narrowing, JSON output and observers
//! - [`types`]: schema, value, record and table types
//! - [`error`]: error types shared by every operation

pub mod conversion;
pub mod error;
pub mod types;

pub use error::{ConversionError, ConversionResult, SourceError};
