mod cli;
mod config;
mod coverage;
mod error;
mod fetch;
mod logging;
mod merge;
mod pivot;
mod reading;
mod registry;
mod report;

use std::process;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{
    command::{self, filter::FilterOutcome},
    Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let outcome = match cli.command {
        Commands::Fetch(args) => {
            let config = args.into_config();
            command::fetch(&config).await.map(|summary| {
                println!(
                    "{} of {} stations reported {} readings",
                    summary.reporting_stations, summary.stations, summary.readings
                );
                println!("File saved to `{}`", summary.report_path.display());
            })
        }
        Commands::Filter(args) => command::filter(&args).map(|outcome| match outcome {
            FilterOutcome::Written { path, rows, total } => {
                println!("Kept {} of {} rows", rows, total);
                println!("File saved to `{}`", path.display());
            }
            FilterOutcome::Options {
                districts,
                station_types,
            } => {
                println!("Districts: {}", districts.join(", "));
                println!("Station types: {}", station_types.join(", "));
            }
        }),
        Commands::Stations(args) => command::stations(&args).map(|summary| {
            println!("{} stations", summary.stations);
            for (district, count) in &summary.by_district {
                println!("  {:<24} {}", district, count);
            }
            println!("By station type:");
            for (station_type, count) in &summary.by_station_type {
                println!("  {:<24} {}", station_type, count);
            }
            if !summary.missing_coordinates.is_empty() {
                println!(
                    "Missing coordinates: {}",
                    summary.missing_coordinates.join(", ")
                );
            }
        }),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    Ok(())
}
