//! Conversion entrypoints and implementations.
//!
//! Most callers should use the free functions [`convert_all`], [`convert_row`] and
//! [`save_as_json`], which read a delimited file with default [`ConverterOptions`]:
//!
//! - the header row names the columns (duplicates become `X`, `X.1`, ...)
//! - a type is inferred per column ([`infer`]), then every row is materialized
//! - empty cells and null tokens become [`crate::types::Value::Null`]
//!
//! Larger inputs go through [`ChunkedConverter`], which reads bounded windows, narrows numeric
//! columns per window ([`narrow`]) and writes one JSON artifact per chunk or one combined file.
//! [`ChunkedConverter::stream_rows`] yields records lazily instead.
//!
//! Outcomes can be reported to a [`ConversionObserver`].

mod csv;

pub mod chunked;
pub mod converter;
pub mod infer;
pub mod json;
pub mod narrow;
pub mod observability;

pub use chunked::{
    chunk_file_name, estimate_total_rows, recommend_chunk_size, Chunk, ChunkReader, ChunkedConverter, ChunkedOptions,
    ChunkedStats, FileInfo, RecordStream, COMPLETE_FILE_NAME,
};
pub use converter::{convert_all, convert_row, save_as_json, Converter, ConverterOptions};
pub use self::csv::DEFAULT_NULL_VALUES;
pub use infer::{infer_schema_from_path, InferredSchema, SchemaInference};
pub use json::{read_json_records, JsonLayout};
pub use observability::{
    severity_for_error, CompositeObserver, ConversionContext, ConversionObserver, ConversionOperation,
    ConversionSeverity, ConversionStats, FileObserver, TracingObserver,
};
