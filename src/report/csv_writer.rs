//! CSV rendition of the report. Empty cells are the empty marker.

use std::{io::Write, path::Path};

use crate::{
    error::{PipelineError, Result},
    pivot::ReportTable,
};

use super::{format_value, header};

pub fn write_csv<W: Write>(table: &ReportTable, writer: W, target: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let err = |e: csv::Error| PipelineError::write(target, e);

    wtr.write_record(header(&table.codes)).map_err(err)?;

    for row in &table.rows {
        let mut record: Vec<String> = vec![
            row.station_code.clone(),
            row.station_name.clone(),
            row.district.clone(),
            row.taluka.clone(),
            row.date.clone(),
            row.time.clone(),
            row.report_label.clone(),
            row.project_name.clone(),
            row.agency_name.clone(),
            row.station_type.clone(),
            row.rtdas_type.clone(),
        ];
        record.extend(row.values.iter().map(|v| format_value(*v)));
        record.push(format_value(row.latitude));
        record.push(format_value(row.longitude));

        wtr.write_record(&record).map_err(err)?;
    }

    wtr.flush().map_err(|e| PipelineError::write(target, e))?;
    Ok(())
}

// -- Tests -------------------------------------------------------------------
