//! Re-serialise a filtered copy of an existing report.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::{
    cli::FilterArgs,
    config::{default_report_path, ReportFormat},
    report::{filter::distinct, filter_report, read_report, write_report},
};

use super::make_filtered_file_name;

pub enum FilterOutcome {
    Written {
        path: PathBuf,
        rows: usize,
        total: usize,
    },
    Options {
        districts: Vec<String>,
        station_types: Vec<String>,
    },
}

pub fn filter(args: &FilterArgs) -> Result<FilterOutcome> {
    let input = args.input.clone().unwrap_or_else(default_report_path);
    let report = read_report(&input)?;

    if args.list {
        return Ok(FilterOutcome::Options {
            districts: to_owned(distinct(&report, |r| r.district.as_str())),
            station_types: to_owned(distinct(&report, |r| r.station_type.as_str())),
        });
    }

    let filtered = filter_report(&report, &args.districts, &args.station_types);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| make_filtered_file_name(&input));

    write_report(&filtered, &output, ReportFormat::from_path(&output))
        .with_context(|| format!("Could not write filtered report to {}", output.display()))?;

    Ok(FilterOutcome::Written {
        path: output,
        rows: filtered.rows.len(),
        total: report.rows.len(),
    })
}

fn to_owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(String::from).collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{error::PipelineError, report::tests::table};

    fn args(input: PathBuf) -> FilterArgs {
        FilterArgs {
            input: Some(input),
            output: None,
            districts: Vec::new(),
            station_types: Vec::new(),
            list: false,
        }
    }

    #[test]
    fn should_write_filtered_copy_beside_report() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.csv");
        let mut t = table();
        t.rows[1].district = "Kutch".to_string();
        write_report(&t, &input, ReportFormat::Csv).unwrap();

        let outcome = filter(&FilterArgs {
            districts: vec!["Kutch".to_string()],
            ..args(input.clone())
        })
        .unwrap();

        let FilterOutcome::Written { path, rows, total } = outcome else {
            panic!("expected a written report");
        };
        assert_eq!(path, dir.path().join("report-filtered.csv"));
        assert_eq!((rows, total), (1, 2));
        assert_eq!(read_report(&path).unwrap().rows[0].station_code, "B");
        // Source report is unchanged.
        assert_eq!(read_report(&input).unwrap(), t);
    }

    #[test]
    fn should_convert_format_by_output_extension() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.csv");
        write_report(&table(), &input, ReportFormat::Csv).unwrap();
        let output = dir.path().join("download.parquet");

        filter(&FilterArgs {
            output: Some(output.clone()),
            ..args(input)
        })
        .unwrap();

        assert_eq!(read_report(&output).unwrap(), table());
    }

    #[test]
    fn should_list_filter_options() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.csv");
        write_report(&table(), &input, ReportFormat::Csv).unwrap();

        let outcome = filter(&FilterArgs {
            list: true,
            ..args(input)
        })
        .unwrap();

        let (districts, station_types) = match outcome {
            FilterOutcome::Options {
                districts,
                station_types,
            } => (districts, station_types),
            FilterOutcome::Written { .. } => panic!("expected options"),
        };
        assert_eq!(districts, vec!["Surat"]);
        assert_eq!(station_types, vec!["ARG"]);
    }

    #[test]
    fn should_ask_for_fetch_when_report_missing() {
        let dir = TempDir::new().unwrap();
        let err = filter(&args(dir.path().join("absent.csv"))).err().unwrap();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ReportMissing(_))
        ));
        assert!(err.to_string().contains("fetch data first"));
    }
}
