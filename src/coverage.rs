//! Registry coverage checks run between pipeline stages.

use std::collections::HashMap;

use crate::{
    config::OrphanPolicy,
    error::{PipelineError, Result},
    merge::MergedTable,
    pivot::ReportTable,
    registry::Registry,
};

/// Every registered station has at least one merged row.
pub fn check_merged(table: &MergedTable, registry: &Registry) -> Result<()> {
    let counts = count(table.records.iter().map(|r| r.station_code.as_str()));
    check("merge", &counts, registry, false, true)
}

/// Every registered station has exactly one report row, and unregistered
/// stations appear only when the policy keeps them.
pub fn check_report(table: &ReportTable, registry: &Registry, orphans: OrphanPolicy) -> Result<()> {
    let counts = count(table.rows.iter().map(|r| r.station_code.as_str()));
    check(
        "pivot",
        &counts,
        registry,
        true,
        orphans == OrphanPolicy::Keep,
    )
}

fn count<'a>(codes: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for code in codes {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}

fn check(
    stage: &'static str,
    counts: &HashMap<&str, usize>,
    registry: &Registry,
    exactly_once: bool,
    allow_orphans: bool,
) -> Result<()> {
    let fail = |message: String| PipelineError::Coverage { stage, message };

    for station in registry.stations() {
        let n = counts.get(station.code.as_str()).copied().unwrap_or(0);
        if n == 0 {
            return Err(fail(format!("station '{}' is missing", station.code)));
        }
        if exactly_once && n > 1 {
            return Err(fail(format!("station '{}' appears {} times", station.code, n)));
        }
    }

    for (code, &n) in counts {
        if registry.contains(code) {
            continue;
        }
        if !allow_orphans {
            return Err(fail(format!("unregistered station '{}' is present", code)));
        }
        if exactly_once && n > 1 {
            return Err(fail(format!("station '{}' appears {} times", code, n)));
        }
    }

    Ok(())
}

// -- Tests -------------------------------------------------------------------
