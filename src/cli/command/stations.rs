//! Summarise the station registry.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::{
    cli::StationsArgs,
    registry::{load_registry, Registry},
};

#[derive(Debug, Default, PartialEq)]
pub struct RegistrySummary {
    pub stations: usize,
    pub by_district: BTreeMap<String, usize>,
    pub by_station_type: BTreeMap<String, usize>,
    pub missing_coordinates: Vec<String>,
}

pub fn stations(args: &StationsArgs) -> Result<RegistrySummary> {
    let registry = load_registry(&args.registry)
        .with_context(|| format!("Could not load registry {}", args.registry.display()))?;

    Ok(summarise(&registry))
}

pub fn summarise(registry: &Registry) -> RegistrySummary {
    let mut summary = RegistrySummary {
        stations: registry.len(),
        ..RegistrySummary::default()
    };

    for station in registry.stations() {
        tally(&mut summary.by_district, &station.district);
        tally(&mut summary.by_station_type, &station.station_type);
        if station.latitude.is_none() || station.longitude.is_none() {
            summary.missing_coordinates.push(station.code.clone());
        }
    }

    summary
}

fn tally(counts: &mut BTreeMap<String, usize>, value: &str) {
    *counts.entry(label(value)).or_insert(0) += 1;
}

fn label(s: &str) -> String {
    if s.is_empty() {
        "(blank)".to_string()
    } else {
        s.to_string()
    }
}

// -- Tests -------------------------------------------------------------------
