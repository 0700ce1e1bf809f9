//! Reshapes merged rows into one row per station, one column per code.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::{
    config::{OrphanPolicy, RunClock},
    merge::{placeholder, MergedRecord, MergedTable},
    registry::Registry,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    pub station_code: String,
    pub station_name: String,
    pub district: String,
    pub taluka: String,
    pub date: String,
    pub time: String,
    pub report_label: String,
    pub project_name: String,
    pub agency_name: String,
    pub station_type: String,
    pub rtdas_type: String,
    /// One slot per measurement code, aligned with [`ReportTable::codes`].
    pub values: Vec<Option<f64>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub codes: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// A station's row under construction; `seen` marks codes already filled.
struct Group {
    row: ReportRow,
    seen: Vec<bool>,
}

/// Pivots `merged` into wide format.
///
/// Identity columns come from the station's first row in input order, and
/// each code takes the first value encountered for it. Rows follow registry
/// order, then kept orphans in first-seen order. A registered station with
/// no merged rows gets the same identity a merge placeholder would carry.
pub fn pivot(
    merged: &MergedTable,
    registry: &Registry,
    codes: &[String],
    orphans: OrphanPolicy,
    clock: &RunClock,
) -> ReportTable {
    let slots: HashMap<&str, usize> = codes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let mut groups: Vec<Group> = Vec::new();
    let mut by_station: HashMap<&str, usize> = HashMap::new();

    for record in &merged.records {
        let index = *by_station
            .entry(record.station_code.as_str())
            .or_insert_with(|| {
                groups.push(Group {
                    row: identity_row(record, codes.len()),
                    seen: vec![false; codes.len()],
                });
                groups.len() - 1
            });

        let Some(measurement) = &record.measurement else {
            continue;
        };
        let Some(&slot) = slots.get(measurement.code.as_str()) else {
            debug!(
                station = %record.station_code,
                code = %measurement.code,
                "Ignoring unrequested code"
            );
            continue;
        };

        let group = &mut groups[index];
        if !group.seen[slot] {
            group.seen[slot] = true;
            group.row.values[slot] = measurement.value;
        }
    }

    let mut placed = vec![false; groups.len()];
    let mut rows = Vec::with_capacity(registry.len());

    for station in registry.stations() {
        let row = match by_station.get(station.code.as_str()) {
            Some(&index) => {
                placed[index] = true;
                groups[index].row.clone()
            }
            None => {
                debug!(station = %station.code, "No merged rows; filling from registry");
                identity_row(&placeholder(station, clock), codes.len())
            }
        };
        rows.push(attach_coordinates(row, registry));
    }

    let orphan_rows: Vec<ReportRow> = groups
        .iter()
        .zip(&placed)
        .filter(|(_, is_placed)| !**is_placed)
        .map(|(group, _)| group.row.clone())
        .collect();

    if !orphan_rows.is_empty() {
        match orphans {
            OrphanPolicy::Keep => rows.extend(orphan_rows),
            OrphanPolicy::Drop => {
                let dropped: Vec<&str> = orphan_rows
                    .iter()
                    .map(|r| r.station_code.as_str())
                    .collect();
                warn!(stations = ?dropped, "Dropping readings for unregistered stations");
            }
        }
    }

    info!(rows = rows.len(), codes = codes.len(), "Pivoted report");

    ReportTable {
        codes: codes.to_vec(),
        rows,
    }
}

fn identity_row(record: &MergedRecord, width: usize) -> ReportRow {
    let station = record.station.clone().unwrap_or_default();

    ReportRow {
        station_code: record.station_code.clone(),
        station_name: station.name,
        district: station.district,
        taluka: station.taluka,
        date: record.date.clone(),
        time: record.time.clone(),
        report_label: record.report_label.clone(),
        project_name: record.project_name.clone(),
        agency_name: record.agency_name.clone(),
        station_type: station.station_type,
        rtdas_type: station.rtdas_type,
        values: vec![None; width],
        latitude: None,
        longitude: None,
    }
}

/// Coordinates are joined back on station code after grouping.
fn attach_coordinates(mut row: ReportRow, registry: &Registry) -> ReportRow {
    if let Some(station) = registry.get(&row.station_code) {
        row.latitude = station.latitude;
        row.longitude = station.longitude;
    }
    row
}

// -- Tests -------------------------------------------------------------------
