//! Column-value filters over an existing report.

use crate::pivot::{ReportRow, ReportTable};

/// Keeps rows whose district and station type are in the given lists.
/// An empty list does not filter on that column.
pub fn filter_report(
    table: &ReportTable,
    districts: &[String],
    station_types: &[String],
) -> ReportTable {
    ReportTable {
        codes: table.codes.clone(),
        rows: table
            .rows
            .iter()
            .filter(|row| {
                accepts(districts, &row.district) && accepts(station_types, &row.station_type)
            })
            .cloned()
            .collect(),
    }
}

fn accepts(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == value)
}

/// Distinct non-empty values of a column, sorted, for listing filter options.
pub fn distinct<'a>(
    table: &'a ReportTable,
    column: impl Fn(&'a ReportRow) -> &'a str,
) -> Vec<&'a str> {
    let mut values: Vec<&str> = table
        .rows
        .iter()
        .map(column)
        .filter(|v| !v.is_empty())
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}

// -- Tests -------------------------------------------------------------------
