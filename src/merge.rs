//! Left-joins readings onto the registry and fills in silent stations.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::{
    config::RunClock,
    reading::ReadingRecord,
    registry::{Registry, Station},
};

/// One measurement of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub code: String,
    pub value: Option<f64>,
}

/// A reading joined with its station, or a placeholder for a silent station.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub station_code: String,
    /// `None` for orphan readings whose station is not registered.
    pub station: Option<Station>,
    /// `None` for placeholder rows.
    pub measurement: Option<Measurement>,
    pub date: String,
    pub time: String,
    pub report_label: String,
    pub agency_name: String,
    pub project_name: String,
}

/// Joined rows in response order, followed by placeholders in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub records: Vec<MergedRecord>,
}

pub fn merge(readings: Vec<ReadingRecord>, registry: &Registry, clock: &RunClock) -> MergedTable {
    let report_label = clock.report_label();

    let reported: HashSet<String> = readings.iter().map(|r| r.station_code.clone()).collect();
    let mut orphans = HashSet::new();

    let mut records: Vec<MergedRecord> = readings
        .into_iter()
        .map(|reading| {
            let station = registry.get(&reading.station_code).cloned();
            if station.is_none() && orphans.insert(reading.station_code.clone()) {
                warn!(station = %reading.station_code, "Reading for unregistered station");
            }
            MergedRecord {
                date: reading.date_label(),
                time: reading.time_label(),
                report_label: report_label.clone(),
                measurement: Some(Measurement {
                    code: reading.data_type_code,
                    value: reading.data_value,
                }),
                station,
                station_code: reading.station_code,
                agency_name: reading.agency_name,
                project_name: reading.project_name,
            }
        })
        .collect();
    let joined = records.len();

    let missing: Vec<MergedRecord> = registry
        .stations()
        .iter()
        .filter(|s| !reported.contains(&s.code))
        .map(|s| placeholder(s, clock))
        .collect();
    let silent = missing.len();
    records.extend(missing);

    info!(
        joined,
        silent_stations = silent,
        orphan_stations = orphans.len(),
        "Merged readings with registry"
    );

    MergedTable { records }
}

/// Row for a registered station that sent nothing today.
pub(crate) fn placeholder(station: &Station, clock: &RunClock) -> MergedRecord {
    MergedRecord {
        station_code: station.code.clone(),
        station: Some(station.clone()),
        measurement: None,
        date: clock.date_label(),
        time: String::new(),
        report_label: clock.report_label(),
        agency_name: String::new(),
        project_name: String::new(),
    }
}

// -- Tests -------------------------------------------------------------------
