//! Parquet rendition of the report. Empty cells are nulls.

use std::{io::Write, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, ZstdLevel},
    errors::ParquetError,
    file::properties::WriterProperties,
};

use crate::{
    error::{PipelineError, Result},
    pivot::{ReportRow, ReportTable},
};

use super::{COORDINATE_COLUMNS, IDENTITY_COLUMNS};

/// Identity columns are nullable text; codes and coordinates nullable floats.
pub fn schema(codes: &[String]) -> Schema {
    let mut fields: Vec<Field> = IDENTITY_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, true))
        .collect();
    for name in codes.iter().map(String::as_str).chain(COORDINATE_COLUMNS) {
        fields.push(Field::new(name, DataType::Float64, true));
    }

    Schema::new(fields)
}

pub fn write_parquet<W: Write + Send>(table: &ReportTable, writer: W, target: &Path) -> Result<()> {
    let schema = Arc::new(schema(&table.codes));
    let err = |e: ParquetError| PipelineError::write(target, e);

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(writer, schema.clone(), Some(props)).map_err(err)?;

    let identity: [fn(&ReportRow) -> &str; 11] = [
        |r| r.station_code.as_str(),
        |r| r.station_name.as_str(),
        |r| r.district.as_str(),
        |r| r.taluka.as_str(),
        |r| r.date.as_str(),
        |r| r.time.as_str(),
        |r| r.report_label.as_str(),
        |r| r.project_name.as_str(),
        |r| r.agency_name.as_str(),
        |r| r.station_type.as_str(),
        |r| r.rtdas_type.as_str(),
    ];

    let mut columns: Vec<ArrayRef> = identity
        .iter()
        .map(|get| {
            let values: Vec<Option<&str>> = table
                .rows
                .iter()
                .map(|row| Some(get(row)).filter(|s| !s.is_empty()))
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();

    for slot in 0..table.codes.len() {
        let values: Vec<Option<f64>> = table
            .rows
            .iter()
            .map(|row| row.values.get(slot).copied().flatten())
            .collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let latitudes: Vec<Option<f64>> = table.rows.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<Option<f64>> = table.rows.iter().map(|r| r.longitude).collect();
    columns.push(Arc::new(Float64Array::from(latitudes)));
    columns.push(Arc::new(Float64Array::from(longitudes)));

    let batch = RecordBatch::try_new(schema, columns).map_err(|e| PipelineError::write(target, e))?;

    writer.write(&batch).map_err(err)?;
    writer.close().map_err(err)?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
