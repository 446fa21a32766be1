use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use csv_json_convert::conversion::{
    chunk_file_name, convert_all, read_json_records, ChunkedConverter, ChunkedOptions, COMPLETE_FILE_NAME,
};
use csv_json_convert::types::{DataType, Record, Value};
use csv_json_convert::ConversionError;

const SAMPLE: &str = "tests/fixtures/titanic_sample.csv";

fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("csv-json-convert-{name}-{nanos}"))
}

fn converter(chunk_rows: usize) -> ChunkedConverter {
    ChunkedConverter::new(ChunkedOptions {
        chunk_rows,
        ..Default::default()
    })
}

/// Whole-file value vs chunked (narrowed) value: integers exactly, floats at `f32` precision.
fn same_value(whole: &Value, narrowed: &Value) -> bool {
    match whole {
        Value::Int64(a) => narrowed.as_i64() == Some(*a),
        Value::Float64(a) => narrowed.as_f64().is_some_and(|b| (*a as f32) == (b as f32)),
        _ => whole == narrowed,
    }
}

fn assert_same_records(whole: &[Record], chunked: &[Record]) {
    assert_eq!(whole.len(), chunked.len());
    for (i, (w, c)) in whole.iter().zip(chunked).enumerate() {
        assert_eq!(w.columns(), c.columns(), "row {i}");
        for ((column, wv), cv) in w.iter().zip(c.values()) {
            assert!(same_value(wv, cv), "row {i} column {column}: {wv:?} vs {cv:?}");
        }
    }
}

fn cleanup(dir: &Path) {
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn split_files_produce_ceil_n_over_r_chunks() {
    let whole = convert_all(SAMPLE).unwrap();

    for chunk_rows in [1, 2, 4, 5, 6, 10] {
        let out_dir = tmp_path(&format!("split-{chunk_rows}"));
        let stats = converter(chunk_rows)
            .convert_large(SAMPLE, &out_dir, true)
            .unwrap();

        let expected_chunks = 6_usize.div_ceil(chunk_rows);
        assert_eq!(stats.total_rows, 6);
        assert_eq!(stats.chunk_count, expected_chunks, "chunk_rows={chunk_rows}");
        assert_eq!(stats.files_written, expected_chunks);
        assert_eq!(stats.output_paths.len(), expected_chunks);

        let mut concatenated = Vec::new();
        for n in 1..=expected_chunks {
            let path = out_dir.join(chunk_file_name(n));
            assert_eq!(stats.output_paths[n - 1], path);
            let records = read_json_records(&path).unwrap();
            assert!(records.len() <= chunk_rows);
            concatenated.extend(records);
        }
        assert!(!out_dir.join(chunk_file_name(expected_chunks + 1)).exists());
        assert_same_records(&whole.records, &concatenated);

        cleanup(&out_dir);
    }
}

#[test]
fn single_file_mode_accumulates_into_complete_data() {
    let whole = convert_all(SAMPLE).unwrap();
    let out_dir = tmp_path("single").join("nested");

    let stats = converter(4).convert_large(SAMPLE, &out_dir, false).unwrap();
    assert_eq!(stats.total_rows, 6);
    assert_eq!(stats.chunk_count, 2);
    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.output_paths, vec![out_dir.join(COMPLETE_FILE_NAME)]);
    assert!(!out_dir.join(chunk_file_name(1)).exists());

    let records = read_json_records(out_dir.join(COMPLETE_FILE_NAME)).unwrap();
    assert_same_records(&whole.records, &records);

    cleanup(out_dir.parent().unwrap());
}

#[test]
fn chunks_narrow_numeric_columns_per_window() {
    let mut chunks = converter(4).chunks(SAMPLE).unwrap();

    let first = chunks.next().unwrap().unwrap();
    assert_eq!(first.index, 1);
    assert_eq!(first.records.len(), 4);
    let types: Vec<DataType> = first.schema.fields.iter().map(|f| f.data_type).collect();
    assert_eq!(
        types,
        vec![
            DataType::UInt8,
            DataType::UInt8,
            DataType::UInt8,
            DataType::Utf8,
            DataType::Utf8,
            DataType::UInt8,
            DataType::UInt8,
            DataType::UInt8,
            DataType::Utf8,
            DataType::Float32,
            DataType::Utf8,
            DataType::Utf8,
        ]
    );
    assert_eq!(first.records[0].get("PassengerId"), Some(&Value::UInt8(1)));
    assert_eq!(first.records[0].get("Fare"), Some(&Value::Float32(7.25)));
    assert_eq!(first.records[0].get("Cabin"), Some(&Value::Null));

    let second = chunks.next().unwrap().unwrap();
    assert_eq!(second.index, 2);
    assert_eq!(second.records.len(), 2);
    assert_eq!(second.records[1].get("Age"), Some(&Value::Null));

    assert!(chunks.next().is_none());
    assert!(chunks.next().is_none());
}

#[test]
fn stream_rows_matches_whole_file_and_restarts() {
    let whole = convert_all(SAMPLE).unwrap();
    let converter = converter(4);

    let streamed: Vec<Record> = converter
        .stream_rows(SAMPLE)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_same_records(&whole.records, &streamed);

    // Stopping early is just not consuming the rest.
    let first_two: Vec<Record> = converter
        .stream_rows(SAMPLE)
        .unwrap()
        .take(2)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first_two.len(), 2);

    // A new stream starts from the top again.
    let again = converter.stream_rows(SAMPLE).unwrap().next().unwrap().unwrap();
    assert_eq!(again.get("PassengerId"), Some(&Value::UInt8(1)));
}

#[test]
fn stream_rows_reports_whole_file_schema() {
    let stream = converter(2).stream_rows(SAMPLE).unwrap();
    let whole = convert_all(SAMPLE).unwrap();
    assert_eq!(stream.schema(), &whole.schema);
}

#[test]
fn float_narrowing_is_lossy_but_value_preserving_at_f32() {
    let dir = tmp_path("lossy");
    std::fs::create_dir_all(&dir).unwrap();
    let csv_path = dir.join("precise.csv");
    std::fs::write(&csv_path, "x\n0.1234567890123\n2.5\n").unwrap();

    let whole = convert_all(&csv_path).unwrap();
    let streamed: Vec<Record> = converter(10)
        .stream_rows(&csv_path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(whole.records[0].get("x"), Some(&Value::Float64(0.1234567890123)));
    assert_eq!(
        streamed[0].get("x"),
        Some(&Value::Float32(0.1234567890123_f64 as f32))
    );
    assert_ne!(streamed[0].get("x").unwrap().as_f64(), Some(0.1234567890123));
    assert_same_records(&whole.records, &streamed);

    cleanup(&dir);
}

#[test]
fn tiny_floats_are_not_flushed_to_zero() {
    let dir = tmp_path("tiny");
    std::fs::create_dir_all(&dir).unwrap();
    let csv_path = dir.join("tiny.csv");
    std::fs::write(&csv_path, "x\n1e-50\n2.5\n").unwrap();

    let whole = convert_all(&csv_path).unwrap();
    let streamed: Vec<Record> = converter(10)
        .stream_rows(&csv_path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(whole.records[0].get("x"), Some(&Value::Float64(1e-50)));
    assert_eq!(streamed[0].get("x"), Some(&Value::Float64(1e-50)));
    assert_eq!(streamed[1].get("x"), Some(&Value::Float64(2.5)));

    cleanup(&dir);
}

#[test]
fn inspect_reports_size_estimate_and_sample_types() {
    let info = converter(100).inspect(SAMPLE).unwrap();
    let size = std::fs::metadata(SAMPLE).unwrap().len();

    assert_eq!(info.file_size_bytes, size);
    assert!(info.file_size_mb() < 1.0);
    // Every line fits in the sample, so the estimate is the exact line count (header included).
    assert_eq!(info.estimated_rows, 7);
    assert_eq!(info.recommended_chunk_size, 1_000);
    assert_eq!(info.columns().len(), 12);
    assert_eq!(info.columns()[0], "PassengerId");
    assert_eq!(
        info.schema.fields[info.schema.index_of("Fare").unwrap()].data_type,
        DataType::Float64
    );
    assert_eq!(
        info.schema.fields[info.schema.index_of("Name").unwrap()].data_type,
        DataType::Utf8
    );
}

#[test]
fn inspect_samples_only_leading_rows() {
    let dir = tmp_path("inspect-sample");
    std::fs::create_dir_all(&dir).unwrap();
    let csv_path = dir.join("late_text.csv");
    std::fs::write(&csv_path, "code\n1\n2\n3\n4\n5\nX7\n").unwrap();

    let info = converter(100).inspect(&csv_path).unwrap();
    assert_eq!(info.schema.fields[0].data_type, DataType::Int64);

    let whole = convert_all(&csv_path).unwrap();
    assert_eq!(whole.schema.fields[0].data_type, DataType::Utf8);

    cleanup(&dir);
}

#[test]
fn missing_input_is_not_found_everywhere() {
    let missing = "tests/fixtures/does_not_exist.csv";
    let converter = converter(10);
    let out_dir = tmp_path("missing");

    assert!(matches!(
        converter.convert_large(missing, &out_dir, true).unwrap_err(),
        ConversionError::NotFound { .. }
    ));
    assert!(matches!(
        converter.inspect(missing).unwrap_err(),
        ConversionError::NotFound { .. }
    ));
    assert!(matches!(
        converter.stream_rows(missing).err().unwrap(),
        ConversionError::NotFound { .. }
    ));
    assert!(!out_dir.exists());
}

#[test]
fn empty_inputs_are_rejected() {
    let converter = converter(10);
    let out_dir = tmp_path("empty");
    assert!(matches!(
        converter
            .convert_large("tests/fixtures/header_only.csv", &out_dir, true)
            .unwrap_err(),
        ConversionError::EmptyInput { .. }
    ));
    assert!(matches!(
        converter.stream_rows("tests/fixtures/empty.csv").err().unwrap(),
        ConversionError::EmptyInput { .. }
    ));
    assert!(matches!(
        converter.inspect("tests/fixtures/empty.csv").unwrap_err(),
        ConversionError::EmptyInput { .. }
    ));
}

#[test]
fn malformed_input_aborts_chunked_conversion() {
    let out_dir = tmp_path("ragged");
    let err = converter(1)
        .convert_large("tests/fixtures/ragged.csv", &out_dir, true)
        .unwrap_err();
    assert!(matches!(err, ConversionError::Processing { .. }));
    assert!(!out_dir.join(chunk_file_name(1)).exists());
}

#[test]
fn output_dir_that_is_a_file_is_write_error() {
    let dir = tmp_path("out-is-file");
    std::fs::create_dir_all(&dir).unwrap();
    let out_file = dir.join("not_a_dir");
    std::fs::write(&out_file, "occupied").unwrap();

    for split_files in [true, false] {
        let err = converter(4)
            .convert_large(SAMPLE, &out_file, split_files)
            .unwrap_err();
        match &err {
            ConversionError::Write { path, .. } => assert_eq!(path, &out_file),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(std::fs::read_to_string(&out_file).unwrap(), "occupied");

    cleanup(&dir);
}
