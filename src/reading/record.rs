//! A single normalised reading.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
    pub station_code: String,
    pub data_type_code: String,
    /// `None` is the empty marker: absent or non-numeric upstream value.
    pub data_value: Option<f64>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub agency_name: String,
    pub project_name: String,
}

impl ReadingRecord {
    /// Date in report form, `DD-MM-YYYY`.
    pub fn date_label(&self) -> String {
        self.date.format("%d-%m-%Y").to_string()
    }

    pub fn time_label(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }
}

/// Coerces an upstream value to a number, or the empty marker.
///
/// Numbers pass through, numeric strings are parsed, and everything else
/// (null, `"N/A"`, booleans, non-finite values) becomes `None`. Never zero.
pub fn coerce_value(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number.filter(|v| v.is_finite())
}

// -- Tests -------------------------------------------------------------------
