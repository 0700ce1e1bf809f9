//! Run configuration and the fixed upstream vocabulary.

use std::{collections::HashSet, path::PathBuf, time::Duration};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;

use crate::error::{PipelineError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://india-water.gov.in/web-api/getDateWiseDataforAgency";
pub const DEFAULT_PROJECT: &str = "NHP";
pub const DEFAULT_AGENCY_CODE: &str = "46";
pub const DEFAULT_STATION_SELECTOR: &str = "all";
pub const DEFAULT_CODES: [&str; 4] = ["GPR", "GPC", "GHT", "MS3"];
pub const DEFAULT_REGISTRY: &str = "stations.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TIMESTAMP_FIELD: &str = "dataDateTime";

/// Upstream field names, after nested objects have been flattened with `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub station_code: String,
    pub data_type_code: String,
    pub data_value: String,
    pub timestamp: String,
    pub agency_name: String,
    pub project_name: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        FieldMapping {
            station_code: "stationCode".to_string(),
            data_type_code: "dataTypeCode".to_string(),
            data_value: "dataValue".to_string(),
            timestamp: DEFAULT_TIMESTAMP_FIELD.to_string(),
            agency_name: "agencyName".to_string(),
            project_name: "projectName".to_string(),
        }
    }
}

impl FieldMapping {
    fn names(&self) -> [&str; 6] {
        [
            &self.station_code,
            &self.data_type_code,
            &self.data_value,
            &self.timestamp,
            &self.agency_name,
            &self.project_name,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if name.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "upstream field names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(PipelineError::Configuration(format!(
                    "upstream field '{}' is mapped twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// What the pivot does with readings whose station is not in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrphanPolicy {
    /// Exclude them so the report covers exactly the registry.
    #[default]
    Drop,
    /// Append them after the registry stations with empty metadata.
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Parquet,
}

impl ReportFormat {
    /// Infers the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => ReportFormat::Parquet,
            _ => ReportFormat::Csv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub project: String,
    pub agency_code: String,
    pub station_selector: String,
    pub codes: Vec<String>,
    pub registry_path: PathBuf,
    pub report_path: PathBuf,
    pub report_format: ReportFormat,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub fields: FieldMapping,
    pub orphans: OrphanPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let report_path = default_report_path();
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            agency_code: DEFAULT_AGENCY_CODE.to_string(),
            station_selector: DEFAULT_STATION_SELECTOR.to_string(),
            codes: DEFAULT_CODES.iter().map(|c| c.to_string()).collect(),
            registry_path: PathBuf::from(DEFAULT_REGISTRY),
            report_format: ReportFormat::from_path(&report_path),
            report_path,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
            fields: FieldMapping::default(),
            orphans: OrphanPolicy::default(),
        }
    }
}

impl Config {
    /// Checks the configuration before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        if self.codes.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one measurement-type code is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for code in &self.codes {
            if code.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "measurement-type codes must not be empty".to_string(),
                ));
            }
            if !seen.insert(code.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "measurement-type code '{}' is listed twice",
                    code
                )));
            }
        }
        if self.timeout.is_zero() {
            return Err(PipelineError::Configuration(
                "request timeout must be positive".to_string(),
            ));
        }
        self.fields.validate()
    }
}

/// `~/wims-report.csv`, falling back to the working directory.
pub fn default_report_path() -> PathBuf {
    let file_name = "wims-report.csv";
    dirs::home_dir()
        .map(|home| home.join(file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

/// The instant a run started; every row of a run shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl RunClock {
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        RunClock {
            date: now.date(),
            time: now.time(),
        }
    }

    pub fn start_of_day(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN)
    }

    pub fn instant(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Calendar date in report form, `DD-MM-YYYY`.
    pub fn date_label(&self) -> String {
        self.date.format("%d-%m-%Y").to_string()
    }

    /// Human-readable timestamp shared by every row, e.g. `21-03-2024 at 10:05:00`.
    pub fn report_label(&self) -> String {
        let time = self.time.format("%H:%M:%S");
        format!("{} at {}", self.date_label(), time)
    }
}

// -- Tests -------------------------------------------------------------------
