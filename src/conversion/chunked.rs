//! Chunked conversion for larger inputs.
//!
//! The source is read in windows of [`ChunkedOptions::chunk_rows`] rows. Column types are
//! inferred once over the whole file (a streaming pass that keeps no rows), so every chunk agrees
//! with whole-file conversion; each chunk is then narrowed on its own (see [`super::narrow`]).

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

use crate::error::{ConversionError, ConversionResult};
use crate::types::{Record, Schema};

use super::converter::ConverterOptions;
use super::csv::{open_input, CsvSource};
use super::infer::infer_schema_from_path;
use super::json::write_json;
use super::narrow::{bytes_saved_per_row, narrow_chunk};
use super::observability::ConversionOperation;

/// File name used when all chunks are accumulated into one artifact.
pub const COMPLETE_FILE_NAME: &str = "complete_data.json";

/// Number of leading lines sampled by [`estimate_total_rows`].
pub const ESTIMATE_SAMPLE_LINES: u64 = 1_000;

/// Number of data rows used by [`ChunkedConverter::inspect`] to report column types.
pub const INSPECT_SAMPLE_ROWS: usize = 5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Configuration for the [`ChunkedConverter`].
#[derive(Debug, Clone)]
pub struct ChunkedOptions {
    /// Rows read per chunk.
    pub chunk_rows: usize,
    /// Memory budget in MB. Advisory only; it does not change behavior.
    pub max_memory_mb: usize,
    /// Source/JSON options shared with [`super::Converter`].
    pub conversion: ConverterOptions,
}

impl Default for ChunkedOptions {
    fn default() -> Self {
        Self {
            chunk_rows: 10_000,
            max_memory_mb: 500,
            conversion: ConverterOptions::default(),
        }
    }
}

/// Outcome of [`ChunkedConverter::convert_large`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedStats {
    /// Total data rows processed.
    pub total_rows: usize,
    /// Number of chunks read.
    pub chunk_count: usize,
    /// Number of JSON artifacts written.
    pub files_written: usize,
    /// Paths of the written artifacts, in order.
    pub output_paths: Vec<PathBuf>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

/// A contiguous, narrowed window of source rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 1-based chunk number.
    pub index: usize,
    /// Schema after narrowing this chunk.
    pub schema: Schema,
    /// Records in source order.
    pub records: Vec<Record>,
}

/// Summary returned by [`ChunkedConverter::inspect`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// Inspected path.
    pub path: PathBuf,
    /// File size in bytes.
    pub file_size_bytes: u64,
    /// Approximate number of lines (see [`estimate_total_rows`]).
    pub estimated_rows: u64,
    /// Column names and types inferred from the first [`INSPECT_SAMPLE_ROWS`] rows.
    pub schema: Schema,
    /// Suggested [`ChunkedOptions::chunk_rows`] for this file size.
    pub recommended_chunk_size: usize,
}

impl FileInfo {
    /// File size in MB.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / BYTES_PER_MB
    }

    /// Column names in header order.
    pub fn columns(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }
}

/// Iterator over the narrowed chunks of a source file.
///
/// Stops after yielding the first error.
pub struct ChunkReader {
    source: CsvSource,
    schema: Schema,
    columns: Arc<[String]>,
    null_values: Vec<String>,
    chunk_rows: usize,
    chunks_read: usize,
    finished: bool,
}

impl ChunkReader {
    fn new(source: CsvSource, schema: Schema, options: &ChunkedOptions) -> Self {
        let columns = schema.column_names();
        Self {
            source,
            schema,
            columns,
            null_values: options.conversion.null_values.clone(),
            chunk_rows: options.chunk_rows,
            chunks_read: 0,
            finished: false,
        }
    }

    /// Whole-file schema, before per-chunk narrowing.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read_chunk(&mut self) -> ConversionResult<Option<Chunk>> {
        let mut rows = Vec::with_capacity(self.chunk_rows.min(4_096));
        while rows.len() < self.chunk_rows {
            if !self.source.advance()? {
                self.finished = true;
                break;
            }
            rows.push(self.source.materialize_current(&self.schema, &self.null_values)?);
        }
        if rows.is_empty() {
            return Ok(None);
        }

        self.chunks_read += 1;
        let schema = narrow_chunk(&self.schema, &mut rows);
        let records = rows
            .into_iter()
            .map(|values| Record::new(self.columns.clone(), values))
            .collect();
        Ok(Some(Chunk {
            index: self.chunks_read,
            schema,
            records,
        }))
    }
}

impl Iterator for ChunkReader {
    type Item = ConversionResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazy record-at-a-time view over a source file, returned by [`ChunkedConverter::stream_rows`].
///
/// Records are produced across chunk boundaries; at most one chunk is held in memory. Dropping
/// the stream early stops reading. Stops after yielding the first error.
pub struct RecordStream {
    chunks: ChunkReader,
    buffer: std::vec::IntoIter<Record>,
}

impl RecordStream {
    /// Whole-file schema, before per-chunk narrowing.
    pub fn schema(&self) -> &Schema {
        self.chunks.schema()
    }
}

impl Iterator for RecordStream {
    type Item = ConversionResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            match self.chunks.next()? {
                Ok(chunk) => self.buffer = chunk.records.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Converts large delimited files chunk by chunk.
#[derive(Debug, Clone)]
pub struct ChunkedConverter {
    options: ChunkedOptions,
}

impl Default for ChunkedConverter {
    fn default() -> Self {
        Self::new(ChunkedOptions::default())
    }
}

impl ChunkedConverter {
    /// Create a chunked converter.
    ///
    /// # Panics
    ///
    /// Panics if `options.chunk_rows == 0`.
    pub fn new(options: ChunkedOptions) -> Self {
        assert!(options.chunk_rows > 0, "chunk_rows must be > 0");
        Self { options }
    }

    /// Options this converter was built with.
    pub fn options(&self) -> &ChunkedOptions {
        &self.options
    }

    /// Iterate the narrowed chunks of `path`.
    ///
    /// Runs the type-inference pass up front, so missing, empty and malformed inputs fail here.
    pub fn chunks(&self, path: impl AsRef<Path>) -> ConversionResult<ChunkReader> {
        let path = path.as_ref();
        let inferred = infer_schema_from_path(path, &self.options.conversion, None)?;
        if inferred.row_count == 0 {
            return Err(ConversionError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        let source = CsvSource::open(path, &self.options.conversion)?;
        Ok(ChunkReader::new(source, inferred.schema, &self.options))
    }

    /// Lazily yield records of `path` one at a time.
    ///
    /// Each call starts again from the beginning of the file.
    pub fn stream_rows(&self, path: impl AsRef<Path>) -> ConversionResult<RecordStream> {
        Ok(RecordStream {
            chunks: self.chunks(path)?,
            buffer: Vec::new().into_iter(),
        })
    }

    /// Convert `path` chunk by chunk into JSON artifacts under `out_dir`.
    ///
    /// With `split_files`, chunk `n` is written to `chunk_{n:04}.json`; otherwise all records are
    /// accumulated and written once to [`COMPLETE_FILE_NAME`]. `out_dir` is created if absent.
    ///
    /// # Errors
    ///
    /// Read failures as in [`super::Converter::convert_all`], plus [`ConversionError::Write`]
    /// for the output directory or any artifact. A failure aborts the whole conversion.
    pub fn convert_large(
        &self,
        path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
        split_files: bool,
    ) -> ConversionResult<ChunkedStats> {
        let path = path.as_ref();
        let result = self.convert_large_impl(path, out_dir.as_ref(), split_files);
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "chunked conversion failed");
        }
        self.options.conversion.report(
            path,
            ConversionOperation::ConvertLarge,
            &result,
            |stats| stats.total_rows,
        );
        result
    }

    fn convert_large_impl(&self, path: &Path, out_dir: &Path, split_files: bool) -> ConversionResult<ChunkedStats> {
        let started = Instant::now();
        let file_size_mb = file_size(path)? as f64 / BYTES_PER_MB;
        info!(
            path = %path.display(),
            file_size_mb,
            chunk_rows = self.options.chunk_rows,
            max_memory_mb = self.options.max_memory_mb,
            "chunked conversion started"
        );

        let chunks = self.chunks(path)?;
        let whole_schema = chunks.schema().clone();
        fs::create_dir_all(out_dir).map_err(|e| ConversionError::write(out_dir, e))?;

        let layout = self.options.conversion.json_layout;
        let progress_every = self.options.chunk_rows.saturating_mul(5);
        let mut total_rows = 0;
        let mut chunk_count = 0;
        let mut accumulated: Vec<Record> = Vec::new();
        let mut output_paths = Vec::new();

        for chunk in chunks {
            let chunk = chunk?;
            chunk_count += 1;
            total_rows += chunk.records.len();
            info!(
                chunk = chunk.index,
                rows = chunk.records.len(),
                bytes_saved_per_row = bytes_saved_per_row(&whole_schema, &chunk.schema),
                "processing chunk"
            );

            if split_files {
                let out = out_dir.join(chunk_file_name(chunk.index));
                write_json(&chunk.records, &out, layout)?;
                info!(path = %out.display(), rows = chunk.records.len(), "saved chunk");
                output_paths.push(out);
            } else {
                accumulated.extend(chunk.records);
                if accumulated.len() % progress_every == 0 {
                    info!(rows = accumulated.len(), "accumulated rows so far");
                }
            }
        }

        if !split_files && !accumulated.is_empty() {
            let out = out_dir.join(COMPLETE_FILE_NAME);
            write_json(&accumulated, &out, layout)?;
            info!(path = %out.display(), rows = accumulated.len(), "saved complete data");
            output_paths.push(out);
        }

        Ok(ChunkedStats {
            total_rows,
            chunk_count,
            files_written: output_paths.len(),
            output_paths,
            elapsed: started.elapsed(),
        })
    }

    /// Report size, estimated row count, sampled column types and a recommended chunk size.
    ///
    /// Column types come from the first [`INSPECT_SAMPLE_ROWS`] rows only and may differ from
    /// whole-file inference.
    pub fn inspect(&self, path: impl AsRef<Path>) -> ConversionResult<FileInfo> {
        let path = path.as_ref();
        let result = self.inspect_impl(path);
        self.options.conversion.report(
            path,
            ConversionOperation::Inspect,
            &result,
            |info| usize::try_from(info.estimated_rows).unwrap_or(usize::MAX),
        );
        result
    }

    fn inspect_impl(&self, path: &Path) -> ConversionResult<FileInfo> {
        let file_size_bytes = file_size(path)?;
        let estimated_rows = estimate_total_rows(path)?;
        let sample = infer_schema_from_path(path, &self.options.conversion, Some(INSPECT_SAMPLE_ROWS))?;
        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size_bytes,
            estimated_rows,
            schema: sample.schema,
            recommended_chunk_size: recommend_chunk_size(file_size_bytes),
        })
    }
}

/// Artifact name for 1-based chunk `index`: `chunk_0001.json`, `chunk_0002.json`, ...
pub fn chunk_file_name(index: usize) -> String {
    format!("chunk_{index:04}.json")
}

/// Suggested chunk size by file size: <10 MB → 1000, <100 MB → 5000, <1000 MB → 10 000,
/// otherwise 50 000.
pub fn recommend_chunk_size(file_size_bytes: u64) -> usize {
    let size_mb = file_size_bytes as f64 / BYTES_PER_MB;
    if size_mb < 10.0 {
        1_000
    } else if size_mb < 100.0 {
        5_000
    } else if size_mb < 1_000.0 {
        10_000
    } else {
        50_000
    }
}

/// Approximate the number of lines in `path`.
///
/// The average byte length of the first [`ESTIMATE_SAMPLE_LINES`] lines (header included) is
/// divided into the file size. This is an estimate, not a count.
pub fn estimate_total_rows(path: impl AsRef<Path>) -> ConversionResult<u64> {
    let path = path.as_ref();
    let file = open_input(path)?;
    let file_size = file
        .metadata()
        .map_err(|e| ConversionError::processing(path, e))?
        .len();

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut lines: u64 = 0;
    let mut bytes: u64 = 0;
    while lines < ESTIMATE_SAMPLE_LINES {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| ConversionError::processing(path, e))?;
        if n == 0 {
            break;
        }
        lines += 1;
        bytes += n as u64;
    }
    if bytes == 0 {
        return Err(ConversionError::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    Ok(file_size.saturating_mul(lines) / bytes)
}

fn file_size(path: &Path) -> ConversionResult<u64> {
    let file = open_input(path)?;
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| ConversionError::processing(path, e))
}
