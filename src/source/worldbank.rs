//! World Bank indicators API (v2) client.
//!
//! Region codes may be aggregate pseudo-countries such as `SSF` or `WLD`;
//! the API serves them through the same `country/{code}` endpoint.

use super::{HttpReply, SeriesRequest, Transport};
use crate::error::FetchError;
use crate::models::{ObservationPoint, Series};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_PER_PAGE: usize = 2000;

/// Longest body excerpt carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// reqwest-backed transport for the indicators endpoint.
pub struct WorldBankTransport {
    http_client: reqwest::Client,
    base_url: String,
    per_page: usize,
}

impl WorldBankTransport {
    pub fn new(base_url: &str, per_page: usize, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::UpstreamUnavailable {
                status: None,
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            per_page,
        })
    }

    /// URL for one full-range, single-page request.
    pub fn series_url(&self, request: &SeriesRequest) -> String {
        format!(
            "{}/country/{}/indicator/{}?per_page={}&date={}:{}&format=json",
            self.base_url,
            request.key.region,
            request.key.indicator,
            self.per_page,
            request.start_year,
            request.end_year
        )
    }
}

#[async_trait]
impl Transport for WorldBankTransport {
    async fn get(&self, request: &SeriesRequest) -> Result<HttpReply, FetchError> {
        let url = self.series_url(request);
        debug!("GET {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                format!("cannot connect to {}", self.base_url)
            } else {
                format!("request failed: {}", e)
            };
            FetchError::UpstreamUnavailable {
                status: None,
                message,
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable {
                status: Some(status),
                message: format!("failed to read response body: {}", e),
            })?;

        Ok(HttpReply { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct Record {
    date: String,
    value: Option<f64>,
}

/// Parse the `[paging, records]` body into a series.
///
/// Null values are dropped. A null records element means the range has no data.
pub fn parse_series_body(body: &str) -> Result<Series, FetchError> {
    let parts: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    // The API answers unknown codes with a single `[{"message": ...}]` element.
    let records = match parts.get(1) {
        Some(records) => records.clone(),
        None => {
            return Err(FetchError::MalformedResponse(format!(
                "expected two elements, got {}: {}",
                parts.len(),
                excerpt(body)
            )))
        }
    };

    let records: Option<Vec<Record>> = serde_json::from_value(records)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid records: {}", e)))?;

    let mut points = Vec::new();
    for record in records.unwrap_or_default() {
        let Some(value) = record.value else {
            continue;
        };
        let year = record.date.trim().parse::<i32>().map_err(|_| {
            FetchError::MalformedResponse(format!("invalid year '{}'", record.date))
        })?;
        points.push(ObservationPoint {
            year,
            value: Some(value),
        });
    }

    Ok(Series::from_points(points))
}

/// Short prefix of a body for log and error messages.
pub fn excerpt(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
