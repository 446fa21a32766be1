//! Per-chunk numeric narrowing.
//!
//! Each numeric column of a chunk is re-encoded in the smallest width that holds the chunk's
//! values. Integer narrowing is exact. Float narrowing (`Float64` to `Float32`) is **lossy**:
//! values keep only about 7 significant digits.

use crate::types::{DataType, Field, Schema, Value};

/// Pick the integer width for a column whose non-null values span `min..=max`.
///
/// Non-negative columns use `UInt8` below 256 and `UInt16` below 65 536. Columns with negative
/// values use `Int8` inside `(-128, 128)` and `Int16` inside `(-32 768, 32 768)`. Anything else
/// stays `Int64`.
pub fn integer_width(min: i64, max: i64) -> DataType {
    if min >= 0 {
        if max < 256 {
            DataType::UInt8
        } else if max < 65_536 {
            DataType::UInt16
        } else {
            DataType::Int64
        }
    } else if min > -128 && max < 128 {
        DataType::Int8
    } else if min > -32_768 && max < 32_768 {
        DataType::Int16
    } else {
        DataType::Int64
    }
}

/// Narrowed type for a column of `data_type` holding `values`.
///
/// - `Int64` narrows by the non-null min/max; an all-null integer column is unchanged.
/// - `Float64` becomes `Float32` unless a non-zero value is outside the normal `f32` range
///   (too large, or small enough to flush to zero or a subnormal).
/// - Other types are unchanged.
pub fn narrowed_type<'a>(data_type: DataType, mut values: impl Iterator<Item = &'a Value>) -> DataType {
    match data_type {
        DataType::Int64 => {
            let bounds = values
                .filter_map(Value::as_i64)
                .fold(None, |acc: Option<(i64, i64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                });
            match bounds {
                Some((min, max)) => integer_width(min, max),
                None => DataType::Int64,
            }
        }
        DataType::Float64 => {
            let out_of_range = values.any(|v| matches!(v, Value::Float64(f) if !fits_f32(*f)));
            if out_of_range {
                DataType::Float64
            } else {
                DataType::Float32
            }
        }
        other => other,
    }
}

fn fits_f32(v: f64) -> bool {
    let magnitude = v.abs();
    v == 0.0 || (f64::from(f32::MIN_POSITIVE)..=f64::from(f32::MAX)).contains(&magnitude)
}

/// Re-encode `value` as `target`. Values that do not fit are returned unchanged.
fn cast(value: Value, target: DataType) -> Value {
    match (value, target) {
        (Value::Int64(v), DataType::UInt8) => u8::try_from(v).map_or(Value::Int64(v), Value::UInt8),
        (Value::Int64(v), DataType::UInt16) => u16::try_from(v).map_or(Value::Int64(v), Value::UInt16),
        (Value::Int64(v), DataType::Int8) => i8::try_from(v).map_or(Value::Int64(v), Value::Int8),
        (Value::Int64(v), DataType::Int16) => i16::try_from(v).map_or(Value::Int64(v), Value::Int16),
        (Value::Float64(v), DataType::Float32) => Value::Float32(v as f32),
        (value, _) => value,
    }
}

/// Narrow every numeric column of a chunk in place and return the chunk's narrowed schema.
///
/// `rows` must be laid out in `schema` order.
pub fn narrow_chunk(schema: &Schema, rows: &mut [Vec<Value>]) -> Schema {
    let mut fields = Vec::with_capacity(schema.len());
    for (idx, field) in schema.fields.iter().enumerate() {
        if !field.data_type.is_numeric() {
            fields.push(field.clone());
            continue;
        }
        let target = narrowed_type(field.data_type, rows.iter().filter_map(|row| row.get(idx)));
        if target != field.data_type {
            for row in rows.iter_mut() {
                if let Some(slot) = row.get_mut(idx) {
                    let value = std::mem::replace(slot, Value::Null);
                    *slot = cast(value, target);
                }
            }
        }
        fields.push(Field::new(field.name.clone(), target));
    }
    Schema::new(fields)
}

/// Bytes per row saved by narrowing `before` into `after`. Text columns count as zero.
pub fn bytes_saved_per_row(before: &Schema, after: &Schema) -> usize {
    before
        .fields
        .iter()
        .zip(&after.fields)
        .filter_map(|(b, a)| Some(b.data_type.byte_width()?.saturating_sub(a.data_type.byte_width()?)))
        .sum()
}
