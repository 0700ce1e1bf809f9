//! Serialises the report table to disk and reads it back.
//!
//! Writes are serialised by a process-wide lock and land in a temporary file
//! beside the target, which is renamed over the target only once complete.

pub mod csv_writer;
pub mod filter;
pub mod parquet_writer;
pub mod reader;

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    config::ReportFormat,
    error::{PipelineError, Result},
    pivot::ReportTable,
};

pub use filter::filter_report;
pub use reader::read_report;

pub const IDENTITY_COLUMNS: [&str; 11] = [
    "Station Code",
    "Station Name",
    "District",
    "Taluka",
    "Date",
    "Time",
    "Date Time",
    "Project Name",
    "Agency Name",
    "Station Type",
    "RTDAS Type",
];
pub const COORDINATE_COLUMNS: [&str; 2] = ["Latitude", "Longitude"];

static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Full header row: identity columns, one per code, then coordinates.
pub fn header(codes: &[String]) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(codes.iter().cloned())
        .chain(COORDINATE_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Replaces the file at `path` with `table`.
///
/// On failure the previous file is left as it was.
pub fn write_report(table: &ReportTable, path: &Path, format: ReportFormat) -> Result<()> {
    replace_file(path, |file| match format {
        ReportFormat::Csv => csv_writer::write_csv(table, file, path),
        ReportFormat::Parquet => parquet_writer::write_parquet(table, file, path),
    })?;

    info!(path = %path.display(), rows = table.rows.len(), format = ?format, "Report written");
    Ok(())
}

/// Stages `fill`'s output beside `path` and renames it into place. The
/// staged file is removed if `fill`, the sync or the rename fails.
fn replace_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let _guard = WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    debug!(path = %path.display(), "Acquired report write lock");

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| PipelineError::write(path, e))?;

    fill(staged.as_file_mut())?;

    staged
        .as_file()
        .sync_all()
        .map_err(|e| PipelineError::write(path, e))?;
    staged
        .persist(path)
        .map_err(|e| PipelineError::write(path, e.error))?;

    Ok(())
}

/// Text form of a measurement or coordinate; the empty marker is `""`.
pub fn format_value(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, io::Write, sync::Arc, thread};

    use tempfile::TempDir;

    use super::*;
    use crate::pivot::ReportRow;

    pub(crate) fn table() -> ReportTable {
        let row = |code: &str, value: Option<f64>| ReportRow {
            station_code: code.to_string(),
            station_name: format!("{} station", code),
            district: "Surat".to_string(),
            taluka: "Olpad".to_string(),
            date: "21-03-2024".to_string(),
            time: if value.is_some() {
                "08:15:00".to_string()
            } else {
                String::new()
            },
            report_label: "21-03-2024 at 10:05:00".to_string(),
            project_name: "NHP".to_string(),
            agency_name: "SWDC".to_string(),
            station_type: "ARG".to_string(),
            rtdas_type: "GPRS".to_string(),
            values: vec![value, None],
            latitude: Some(21.33),
            longitude: Some(72.75),
        };

        ReportTable {
            codes: vec!["GPR".to_string(), "GHT".to_string()],
            rows: vec![row("A", Some(12.5)), row("B", None)],
        }
    }

    #[test]
    fn should_build_header() {
        let header = header(&["GPR".to_string()]);

        assert_eq!(header.len(), 14);
        assert_eq!(header[0], "Station Code");
        assert_eq!(header[6], "Date Time");
        assert_eq!(header[11], "GPR");
        assert_eq!(header[13], "Longitude");
    }

    #[test]
    fn should_overwrite_existing_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        fs::write(&path, "stale").unwrap();

        write_report(&table(), &path, ReportFormat::Csv).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Station Code,"));
        assert!(!text.contains("stale"));
        // Only the report remains; the staging file was renamed into place.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn should_fail_when_directory_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("report.csv");

        let err = write_report(&table(), &path, ReportFormat::Csv).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn should_keep_previous_report_when_serialisation_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&table(), &path, ReportFormat::Csv).unwrap();
        let before = fs::read(&path).unwrap();

        let err = replace_file(&path, |file| {
            file.write_all(b"Station Code,Stat")
                .map_err(|e| PipelineError::write(&path, e))?;
            Err(PipelineError::write(&path, "disk full"))
        })
        .unwrap_err();

        assert!(matches!(err, PipelineError::Write { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn should_keep_previous_report_when_rename_fails() {
        let dir = TempDir::new().unwrap();
        let prior = dir.path().join("report.csv");
        write_report(&table(), &prior, ReportFormat::Csv).unwrap();
        let before = fs::read(&prior).unwrap();

        // A non-empty directory cannot be replaced by a file.
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), "x").unwrap();

        let err = write_report(&table(), &blocked, ReportFormat::Csv).unwrap_err();

        assert!(matches!(err, PipelineError::Write { .. }));
        assert!(blocked.is_dir());
        assert_eq!(fs::read(&prior).unwrap(), before);
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn should_serialise_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(dir.path().join("report.csv"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || write_report(&table(), &path, ReportFormat::Csv))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let reread = read_report(&path).unwrap();
        assert_eq!(reread, table());
    }

    #[test]
    fn should_format_empty_marker() {
        assert_eq!(format_value(None), "");
        assert_eq!(format_value(Some(12.5)), "12.5");
        assert_eq!(format_value(Some(5.0)), "5");
    }
}
