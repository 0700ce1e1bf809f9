//! Static station registry, loaded fresh on every run.

use std::{collections::HashMap, fs::File, io::Read, path::Path};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};

pub const STATION_CODE: &str = "Station Code";
pub const STATION_NAME: &str = "Station Name";
pub const DISTRICT: &str = "District";
pub const TALUKA: &str = "Taluka";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const STATION_TYPE: &str = "Station Type";
pub const RTDAS_TYPE: &str = "RTDAS Type";

const REQUIRED_COLUMNS: [&str; 8] = [
    STATION_CODE,
    STATION_NAME,
    DISTRICT,
    TALUKA,
    LATITUDE,
    LONGITUDE,
    STATION_TYPE,
    RTDAS_TYPE,
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Station {
    pub code: String,
    pub name: String,
    pub district: String,
    pub taluka: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub station_type: String,
    pub rtdas_type: String,
}

/// Registry stations in file order, keyed by station code.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    stations: Vec<Station>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Builds a registry, rejecting duplicate station codes.
    pub fn from_stations(stations: Vec<Station>, source: &Path) -> Result<Self> {
        let mut index = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            if index.insert(station.code.clone(), i).is_some() {
                return Err(PipelineError::DuplicateStation {
                    path: source.to_path_buf(),
                    code: station.code.clone(),
                });
            }
        }

        Ok(Registry { stations, index })
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, code: &str) -> Option<&Station> {
        self.index.get(code).map(|&i| &self.stations[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }
}

/// Loads the registry CSV at `path`.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let file = File::open(path).map_err(|e| PipelineError::schema(path, e.to_string()))?;
    let registry = read_registry(file, path)?;
    info!(path = %path.display(), stations = registry.len(), "Loaded station registry");

    Ok(registry)
}

/// Reads registry rows from any CSV source; `source` names it in errors.
pub fn read_registry<R: Read>(reader: R, source: &Path) -> Result<Registry> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::schema(source, e.to_string()))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers, source)?;

    let mut stations = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PipelineError::schema(source, e.to_string()))?;
        let station = columns.station(&record, source);
        if station.code.is_empty() {
            warn!(
                row = row + 2,
                "Skipping registry row without a station code"
            );
            continue;
        }
        stations.push(station);
    }

    Registry::from_stations(stations, source)
}

/// Positions of the required columns within a registry file.
struct ColumnIndex([usize; 8]);

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, source: &Path) -> Result<Self> {
        let mut positions = [0usize; 8];
        let mut missing = Vec::new();

        for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| h == *column) {
                Some(p) => positions[slot] = p,
                None => missing.push(*column),
            }
        }

        if !missing.is_empty() {
            return Err(PipelineError::schema(
                source,
                format!("missing required column(s): {}", missing.join(", ")),
            ));
        }

        Ok(ColumnIndex(positions))
    }

    fn station(&self, record: &csv::StringRecord, source: &Path) -> Station {
        let field = |slot: usize| record.get(self.0[slot]).unwrap_or("").trim().to_string();
        let code = field(0);
        let coordinate = |slot: usize| {
            let raw = field(slot);
            let parsed = parse_coordinate(&raw);
            if parsed.is_none() && !raw.is_empty() {
                warn!(
                    source = %source.display(),
                    station = %code,
                    column = REQUIRED_COLUMNS[slot],
                    value = %raw,
                    "Ignoring non-numeric coordinate"
                );
            }
            parsed
        };

        Station {
            name: field(1),
            district: field(2),
            taluka: field(3),
            latitude: coordinate(4),
            longitude: coordinate(5),
            station_type: field(6),
            rtdas_type: field(7),
            code,
        }
    }
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// -- Tests -------------------------------------------------------------------
