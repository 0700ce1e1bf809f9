//! Fetch today's readings and rewrite the station report.

use std::{collections::HashSet, path::PathBuf};

use anyhow::{Context, Result};

use crate::{
    cli::create_spinner,
    config::{Config, RunClock},
    coverage::{check_merged, check_report},
    fetch::fetch_readings,
    merge::merge,
    pivot::pivot,
    reading::normalize,
    registry::load_registry,
    report::write_report,
};

#[derive(Debug)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub readings: usize,
    pub stations: usize,
    pub reporting_stations: usize,
}

pub async fn fetch(config: &Config) -> Result<RunSummary> {
    run(config, RunClock::now()).await
}

/// One sequential run. Any failure before the write leaves the report untouched.
pub async fn run(config: &Config, clock: RunClock) -> Result<RunSummary> {
    config.validate()?;

    let bar = create_spinner("Fetching readings...".to_string());
    let body = fetch_readings(config, &clock)
        .await
        .context("Fetch failed")?;
    bar.finish_with_message("Readings fetched");

    let readings = normalize(&body, &config.fields).context("Could not parse response")?;

    let registry = load_registry(&config.registry_path).context("Could not load station registry")?;

    let reading_count = readings.len();
    let reporting_stations = readings
        .iter()
        .map(|r| r.station_code.as_str())
        .filter(|code| registry.contains(code))
        .collect::<HashSet<_>>()
        .len();

    let merged = merge(readings, &registry, &clock);
    check_merged(&merged, &registry)?;

    let report = pivot(&merged, &registry, &config.codes, config.orphans, &clock);
    check_report(&report, &registry, config.orphans)?;

    let bar = create_spinner("Writing report...".to_string());
    write_report(&report, &config.report_path, config.report_format)
        .context("Could not write report")?;
    bar.finish_with_message("Report written");

    Ok(RunSummary {
        report_path: config.report_path.clone(),
        readings: reading_count,
        stations: registry.len(),
        reporting_stations,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{fs, path::Path, time::Duration};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        config::{OrphanPolicy, ReportFormat},
        error::PipelineError,
        fetch::tests::{clock, closed_endpoint, serve_once},
        registry::tests::REGISTRY_CSV,
        report::read_report,
    };

    fn config(dir: &Path, endpoint: String, report: &str) -> Config {
        let registry_path = dir.join("stations.csv");
        fs::write(&registry_path, REGISTRY_CSV).unwrap();
        let report_path = dir.join(report);

        Config {
            endpoint,
            registry_path,
            report_format: ReportFormat::from_path(&report_path),
            report_path,
            timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    const ONE_READING: &str = r#"[{"stationCode":"A","dataTypeCode":"GPR","dataValue":"12.5",
        "dataDateTime":"2024-03-21T08:15:00","agencyName":"SWDC","projectName":"NHP"}]"#;

    #[tokio::test]
    async fn should_write_report_covering_registry() {
        let dir = TempDir::new().unwrap();
        let endpoint = serve_once("200 OK", ONE_READING).await;
        let config = config(dir.path(), endpoint, "report.csv");

        let summary = run(&config, clock()).await.unwrap();
        assert_eq!(summary.readings, 1);
        assert_eq!(summary.stations, 3);
        assert_eq!(summary.reporting_stations, 1);

        let report = read_report(&config.report_path).unwrap();
        let codes: Vec<_> = report
            .rows
            .iter()
            .map(|r| r.station_code.as_str())
            .collect();
        assert_eq!(codes, vec!["A", "B", "C"]);

        let a = &report.rows[0];
        assert_eq!(report.value(a, "GPR"), Some(12.5));
        assert_eq!(a.date, "21-03-2024");
        assert_eq!(a.time, "08:15:00");
        assert_eq!(a.agency_name, "SWDC");
        for code in ["GPC", "GHT", "MS3"] {
            assert_eq!(report.value(a, code), None);
        }
        for row in &report.rows {
            assert_eq!(row.report_label, "21-03-2024 at 10:05:00");
            assert!(row.latitude.is_some() && row.longitude.is_some());
        }
        for row in &report.rows[1..] {
            assert!(row.values.iter().all(Option::is_none));
        }
    }

    #[tokio::test]
    async fn should_write_parquet_report() {
        let dir = TempDir::new().unwrap();
        let endpoint = serve_once("200 OK", ONE_READING).await;
        let config = config(dir.path(), endpoint, "report.parquet");

        run(&config, clock()).await.unwrap();

        let report = read_report(&config.report_path).unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.value(&report.rows[0], "GPR"), Some(12.5));
    }

    #[tokio::test]
    async fn should_take_first_of_duplicate_readings() {
        let dir = TempDir::new().unwrap();
        let body = r#"[
            {"stationCode":"B","dataTypeCode":"GHT","dataValue":5,
             "dataDateTime":"2024-03-21T08:00:00"},
            {"stationCode":"B","dataTypeCode":"GHT","dataValue":7,
             "dataDateTime":"2024-03-21T09:00:00"}
        ]"#;
        let endpoint = serve_once("200 OK", body).await;
        let config = config(dir.path(), endpoint, "report.csv");

        run(&config, clock()).await.unwrap();

        let report = read_report(&config.report_path).unwrap();
        let b = report.rows.iter().find(|r| r.station_code == "B").unwrap();
        assert_eq!(report.value(b, "GHT"), Some(5.0));
    }

    #[tokio::test]
    async fn should_keep_orphans_when_asked() {
        let dir = TempDir::new().unwrap();
        let body = r#"[
            {"stationCode":"Z","dataTypeCode":"GPR","dataValue":1,
             "dataDateTime":"2024-03-21T08:00:00"}
        ]"#;
        let endpoint = serve_once("200 OK", body).await;
        let config = Config {
            orphans: OrphanPolicy::Keep,
            ..config(dir.path(), endpoint, "report.csv")
        };

        run(&config, clock()).await.unwrap();

        let report = read_report(&config.report_path).unwrap();
        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.rows[3].station_code, "Z");
    }

    #[tokio::test]
    async fn should_leave_report_untouched_on_transport_failure() {
        let dir = TempDir::new().unwrap();
        let endpoint = closed_endpoint().await;
        let config = config(dir.path(), endpoint, "report.csv");
        fs::write(&config.report_path, "previous report").unwrap();

        let err = run(&config, clock()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Transport { .. })
        ));
        let kept = fs::read_to_string(&config.report_path).unwrap();
        assert_eq!(kept, "previous report");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn should_leave_report_untouched_on_parse_failure() {
        let dir = TempDir::new().unwrap();
        let endpoint = serve_once("200 OK", "").await;
        let config = config(dir.path(), endpoint, "report.csv");
        fs::write(&config.report_path, "previous report").unwrap();

        let err = run(&config, clock()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Parse(_))
        ));
        let kept = fs::read_to_string(&config.report_path).unwrap();
        assert_eq!(kept, "previous report");
    }

    #[tokio::test]
    async fn should_fail_on_registry_schema() {
        let dir = TempDir::new().unwrap();
        let endpoint = serve_once("200 OK", "[]").await;
        let config = config(dir.path(), endpoint, "report.csv");
        let partial = "Station Code,Station Name\nA,Alpha\n";
        fs::write(&config.registry_path, partial).unwrap();

        let err = run(&config, clock()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Schema { .. })
        ));
        assert!(!config.report_path.exists());
    }

    #[tokio::test]
    async fn should_reject_invalid_config_before_fetching() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            codes: Vec::new(),
            ..config(dir.path(), closed_endpoint().await, "report.csv")
        };

        let err = run(&config, clock()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }
}
