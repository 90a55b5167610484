//! Series fetching with bounded retry on rate limiting.

use super::worldbank::{excerpt, parse_series_body};
use super::{RetryPolicy, SeriesRequest, Sleeper, Transport};
use crate::error::FetchError;
use crate::models::{Series, SeriesKey, YearIndex};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches whole-range series through a [`Transport`], retrying on 429.
#[derive(Clone)]
pub struct SeriesFetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl SeriesFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Fetch one series for the full year range, sorted ascending with nulls removed.
    ///
    /// A 429 answer is retried up to `policy.max_retries` times, pausing
    /// `attempt * base_backoff` before each retry. Every other failure is
    /// returned immediately.
    pub async fn fetch_series(
        &self,
        key: &SeriesKey,
        years: &YearIndex,
    ) -> Result<Series, FetchError> {
        let request = SeriesRequest::new(key, years);
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            let reply = self.transport.get(&request).await?;

            if reply.is_success() {
                let series = parse_series_body(&reply.body)?;
                if series.is_empty() {
                    warn!("{} has no observations in {}", key, years);
                }
                debug!("Fetched {} ({} points, attempt {})", key, series.len(), attempt);
                return Ok(series);
            }

            if !reply.is_rate_limited() {
                return Err(FetchError::UpstreamUnavailable {
                    status: Some(reply.status),
                    message: excerpt(&reply.body),
                });
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_for_attempt(attempt);
                warn!(
                    "Attempt {}/{}: rate limited on {}, retrying in {}ms",
                    attempt,
                    max_attempts,
                    key,
                    delay.as_millis()
                );
                self.sleeper.sleep(delay).await;
            }
        }

        warn!("All {} attempts rate limited for {}", max_attempts, key);
        Err(FetchError::RateLimited {
            attempts: max_attempts,
        })
    }
}
