//! Reads a previously written report back into a [`ReportTable`].

use std::{fs::File, path::Path};

use arrow::{
    array::{Array, Float64Array, StringArray},
    record_batch::RecordBatch,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::{
    config::ReportFormat,
    error::{PipelineError, Result},
    pivot::{ReportRow, ReportTable},
};

use super::{COORDINATE_COLUMNS, IDENTITY_COLUMNS};

pub fn read_report(path: &Path) -> Result<ReportTable> {
    if !path.exists() {
        return Err(PipelineError::ReportMissing(path.to_path_buf()));
    }

    match ReportFormat::from_path(path) {
        ReportFormat::Csv => read_csv(path),
        ReportFormat::Parquet => read_parquet(path),
    }
}

/// Measurement codes sit between the identity and coordinate columns.
fn codes_from_header(names: &[String], path: &Path) -> Result<Vec<String>> {
    let fixed = IDENTITY_COLUMNS.len() + COORDINATE_COLUMNS.len();
    if names.len() < fixed {
        return Err(PipelineError::report_read(path, "too few columns"));
    }

    let (identity, rest) = names.split_at(IDENTITY_COLUMNS.len());
    let (codes, coordinates) = rest.split_at(rest.len() - COORDINATE_COLUMNS.len());
    if identity != IDENTITY_COLUMNS || coordinates != COORDINATE_COLUMNS {
        return Err(PipelineError::report_read(path, "unexpected column layout"));
    }

    Ok(codes.to_vec())
}

fn read_csv(path: &Path) -> Result<ReportTable> {
    let err = |e: csv::Error| PipelineError::report_read(path, e);
    let mut reader = csv::Reader::from_path(path).map_err(err)?;

    let names: Vec<String> = reader
        .headers()
        .map_err(err)?
        .iter()
        .map(String::from)
        .collect();
    let codes = codes_from_header(&names, path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(err)?;
        let text = |i: usize| record.get(i).unwrap_or("").to_string();
        let number = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f64>().ok());
        let first_code = IDENTITY_COLUMNS.len();
        let last_code = first_code + codes.len();

        rows.push(ReportRow {
            station_code: text(0),
            station_name: text(1),
            district: text(2),
            taluka: text(3),
            date: text(4),
            time: text(5),
            report_label: text(6),
            project_name: text(7),
            agency_name: text(8),
            station_type: text(9),
            rtdas_type: text(10),
            values: (first_code..last_code).map(number).collect(),
            latitude: number(last_code),
            longitude: number(last_code + 1),
        });
    }

    Ok(ReportTable { codes, rows })
}

fn read_parquet(path: &Path) -> Result<ReportTable> {
    let err = |e: parquet::errors::ParquetError| PipelineError::report_read(path, e);
    let file = File::open(path).map_err(|e| PipelineError::report_read(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(err)?;

    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let codes = codes_from_header(&names, path)?;

    let mut rows = Vec::new();
    for batch in builder.build().map_err(err)? {
        let batch = batch.map_err(|e| PipelineError::report_read(path, e))?;
        rows.extend(rows_from_batch(&batch, codes.len(), path)?);
    }

    Ok(ReportTable { codes, rows })
}

fn rows_from_batch(
    batch: &RecordBatch,
    code_count: usize,
    path: &Path,
) -> Result<Vec<ReportRow>> {
    let mistyped = |i: usize, kind: &str| {
        PipelineError::report_read(path, format!("column {} is not {}", i, kind))
    };
    let strings = (0..IDENTITY_COLUMNS.len())
        .map(|i| {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| mistyped(i, "text"))
        })
        .collect::<Result<Vec<_>>>()?;
    let numbers = (IDENTITY_COLUMNS.len()..batch.num_columns())
        .map(|i| {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| mistyped(i, "numeric"))
        })
        .collect::<Result<Vec<_>>>()?;

    let text = |col: &StringArray, i: usize| {
        if col.is_null(i) {
            String::new()
        } else {
            col.value(i).to_string()
        }
    };
    let number = |col: &Float64Array, i: usize| col.is_valid(i).then(|| col.value(i));

    let rows = (0..batch.num_rows())
        .map(|i| ReportRow {
            station_code: text(strings[0], i),
            station_name: text(strings[1], i),
            district: text(strings[2], i),
            taluka: text(strings[3], i),
            date: text(strings[4], i),
            time: text(strings[5], i),
            report_label: text(strings[6], i),
            project_name: text(strings[7], i),
            agency_name: text(strings[8], i),
            station_type: text(strings[9], i),
            rtdas_type: text(strings[10], i),
            values: numbers[..code_count]
                .iter()
                .map(|col| number(*col, i))
                .collect(),
            latitude: number(numbers[code_count], i),
            longitude: number(numbers[code_count + 1], i),
        })
        .collect();

    Ok(rows)
}

// -- Tests -------------------------------------------------------------------
