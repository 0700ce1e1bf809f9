//! Flattens the upstream response into [`ReadingRecord`]s.
//!
//! Field names come from the declared [`FieldMapping`]; nested objects are
//! flattened with `.` before lookup, so a mapping may name `meta.stationCode`.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::{
    config::FieldMapping,
    error::{PipelineError, Result},
};

use super::record::{coerce_value, ReadingRecord};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATETIME_MARKER: &str = "datetime";

/// Parses a response body into readings, preserving response order.
pub fn normalize(body: &str, fields: &FieldMapping) -> Result<Vec<ReadingRecord>> {
    if body.trim().is_empty() {
        return Err(PipelineError::Parse("response body is empty".to_string()));
    }

    let json: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::Parse(format!("response is not valid JSON: {}", e)))?;

    let records = extract_records(json)?;
    let readings = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| to_reading(index, &flatten(record), fields))
        .collect::<Result<Vec<_>>>()?;

    let empty = readings.iter().filter(|r| r.data_value.is_none()).count();
    info!(
        readings = readings.len(),
        empty_values = empty,
        "Normalised response"
    );

    Ok(readings)
}

/// Accepts a bare array, an envelope with a single array field, or one object.
fn extract_records(json: Value) -> Result<Vec<Map<String, Value>>> {
    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            let array_keys: Vec<String> = object
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k.clone())
                .collect();
            match array_keys.as_slice() {
                [key] => match object.remove(key) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                _ => vec![Value::Object(object)],
            }
        }
        other => {
            return Err(PipelineError::Parse(format!(
                "expected an array or object of readings, found {}",
                kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(PipelineError::Parse(format!(
                "record {} is {}, not an object",
                index,
                kind(&other)
            ))),
        })
        .collect()
}

/// Flattens nested objects into dot-joined keys. Arrays are kept as values.
pub fn flatten(record: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, record);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, record: Map<String, Value>) {
    for (key, value) in record {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(flat, Some(&name), inner),
            other => {
                flat.insert(name, other);
            }
        }
    }
}

fn to_reading(
    index: usize,
    record: &Map<String, Value>,
    fields: &FieldMapping,
) -> Result<ReadingRecord> {
    let required = |name: &str| {
        text_field(record, name).ok_or_else(|| {
            PipelineError::Parse(format!("record {} has no '{}' field", index, name))
        })
    };

    let station_code = required(&fields.station_code)?;
    let data_type_code = required(&fields.data_type_code)?;
    let raw_timestamp = timestamp_field(index, record, &fields.timestamp)?;
    let timestamp = parse_timestamp(&raw_timestamp).ok_or_else(|| {
        PipelineError::Parse(format!(
            "record {} has an unreadable timestamp '{}'",
            index, raw_timestamp
        ))
    })?;

    let raw_value = record.get(&fields.data_value);
    let data_value = coerce_value(raw_value);
    if data_value.is_none() {
        debug!(
            station = %station_code,
            code = %data_type_code,
            raw = ?raw_value,
            "Value coerced to empty"
        );
    }

    Ok(ReadingRecord {
        station_code,
        data_type_code,
        data_value,
        date: timestamp.date(),
        time: timestamp.time(),
        agency_name: text_field(record, &fields.agency_name).unwrap_or_default(),
        project_name: text_field(record, &fields.project_name).unwrap_or_default(),
    })
}

/// The declared timestamp field, or else the single field whose name
/// contains `datetime` in any case.
fn timestamp_field(index: usize, record: &Map<String, Value>, declared: &str) -> Result<String> {
    if let Some(raw) = text_field(record, declared) {
        return Ok(raw);
    }

    let candidates: Vec<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|k| k.to_lowercase().contains(DATETIME_MARKER))
        .collect();

    match candidates.as_slice() {
        [name] => {
            debug!(record = index, field = %name, "Using fallback timestamp field");
            text_field(record, name).ok_or_else(|| {
                PipelineError::Parse(format!("record {} has an empty '{}' field", index, name))
            })
        }
        [] => Err(PipelineError::Parse(format!(
            "record {} has no '{}' field and no field named like '{}'",
            index, declared, DATETIME_MARKER
        ))),
        several => Err(PipelineError::Parse(format!(
            "record {} has no '{}' field and several candidates: {}",
            index,
            declared,
            several.join(", ")
        ))),
    }
}

fn text_field(record: &Map<String, Value>, name: &str) -> Option<String> {
    match record.get(name)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

/// Integral floats render without a fractional part, so `1204.0` matches a
/// registry code of `1204`.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Parses the combined date-and-time value, keeping local wall time for
/// offset-qualified timestamps.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// -- Tests -------------------------------------------------------------------
