//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::config::{
    default_report_path, Config, FieldMapping, OrphanPolicy, ReportFormat, DEFAULT_AGENCY_CODE,
    DEFAULT_ENDPOINT, DEFAULT_PROJECT, DEFAULT_REGISTRY, DEFAULT_STATION_SELECTOR,
    DEFAULT_TIMEOUT_SECS, DEFAULT_TIMESTAMP_FIELD,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info", env = "WIMS_LOG_LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch today's readings and rewrite the station report
    Fetch(FetchArgs),
    /// Filter an existing report by district and station type
    Filter(FilterArgs),
    /// Summarise the station registry
    Stations(StationsArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Upstream endpoint
    #[arg(long, env = "WIMS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, env = "WIMS_PROJECT", default_value = DEFAULT_PROJECT)]
    pub project: String,

    #[arg(long, env = "WIMS_AGENCY_CODE", default_value = DEFAULT_AGENCY_CODE)]
    pub agency_code: String,

    /// Station selector sent upstream
    #[arg(long, default_value = DEFAULT_STATION_SELECTOR)]
    pub stations: String,

    /// Measurement-type codes, in report column order
    #[arg(long, value_delimiter = ',', default_value = "GPR,GPC,GHT,MS3")]
    pub codes: Vec<String>,

    /// Station registry CSV
    #[arg(short, long, env = "WIMS_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: PathBuf,

    /// Report file; defaults to ~/wims-report.csv
    #[arg(short, long, env = "WIMS_REPORT")]
    pub output: Option<PathBuf>,

    /// Report format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Skip TLS certificate validation for the upstream call
    #[arg(long)]
    pub accept_invalid_certs: bool,

    /// Upstream field holding the combined date and time; when a record
    /// lacks it, the one field whose name contains "datetime" is used
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FIELD)]
    pub timestamp_field: String,

    /// What to do with readings for unregistered stations
    #[arg(long, value_enum, default_value_t = OrphanPolicy::Drop)]
    pub orphans: OrphanPolicy,
}

impl FetchArgs {
    pub fn into_config(self) -> Config {
        let report_path = self.output.unwrap_or_else(default_report_path);
        let report_format = self
            .format
            .unwrap_or_else(|| ReportFormat::from_path(&report_path));

        Config {
            endpoint: self.endpoint,
            project: self.project,
            agency_code: self.agency_code,
            station_selector: self.stations,
            codes: self
                .codes
                .into_iter()
                .map(|c| c.trim().to_string())
                .collect(),
            registry_path: self.registry,
            report_path,
            report_format,
            timeout: Duration::from_secs(self.timeout),
            accept_invalid_certs: self.accept_invalid_certs,
            fields: FieldMapping {
                timestamp: self.timestamp_field,
                ..FieldMapping::default()
            },
            orphans: self.orphans,
        }
    }
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Report to read; defaults to ~/wims-report.csv
    #[arg(short, long, env = "WIMS_REPORT")]
    pub input: Option<PathBuf>,

    /// Where to write the filtered rows
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep only these districts (repeatable)
    #[arg(long = "district")]
    pub districts: Vec<String>,

    /// Keep only these station types (repeatable)
    #[arg(long = "station-type")]
    pub station_types: Vec<String>,

    /// Print the available districts and station types instead
    #[arg(long)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct StationsArgs {
    /// Station registry CSV
    #[arg(short, long, env = "WIMS_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: PathBuf,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
