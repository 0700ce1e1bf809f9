//! Requests today's readings from the upstream service.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::{Config, RunClock},
    error::{PipelineError, Result},
};

/// Request body understood by the date-wise agency endpoint.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRequest {
    pub station_code: String,
    pub project_name: String,
    pub data_type_code: String,
    pub agency_code: String,
    pub start_date: String,
    pub end_date: String,
}

impl ReadingRequest {
    /// Builds the `[00:00:00, now]` window request for the configured codes.
    pub fn for_today(config: &Config, clock: &RunClock) -> Self {
        let fmt = "%Y-%m-%d %H:%M:%S";

        ReadingRequest {
            station_code: quote(&config.station_selector),
            project_name: quote(&config.project),
            data_type_code: config
                .codes
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(","),
            agency_code: config.agency_code.clone(),
            start_date: clock.start_of_day().format(fmt).to_string(),
            end_date: clock.instant().format(fmt).to_string(),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s)
}

/// Issues a single POST and returns the raw response body. No retries.
pub async fn fetch_readings(config: &Config, clock: &RunClock) -> Result<String> {
    if config.accept_invalid_certs {
        warn!(
            "TLS certificate validation is disabled for {}",
            config.endpoint
        );
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(|e| PipelineError::transport("could not build HTTP client", Some(e)))?;

    let request = ReadingRequest::for_today(config, clock);
    info!(
        endpoint = %config.endpoint,
        start = %request.start_date,
        end = %request.end_date,
        codes = %request.data_type_code,
        "Requesting readings"
    );

    let failed = format!("request to {} failed", config.endpoint);
    let response = client
        .post(&config.endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| PipelineError::transport(failed, Some(e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PipelineError::transport(format!("{} - {}", status, body.trim()), None));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PipelineError::transport("could not read response body", Some(e)))?;
    info!(bytes = body.len(), "Response received");

    Ok(body)
}

// -- Tests -------------------------------------------------------------------
