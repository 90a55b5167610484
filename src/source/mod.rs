//! Upstream statistics source.
//!
//! The [`Transport`] trait is the seam between the retrying fetcher and the
//! network: the World Bank client implements it over reqwest, tests implement
//! it with scripted replies.

pub mod fetcher;
pub mod retry;
pub mod worldbank;

#[cfg(test)]
pub mod fake;

use crate::error::FetchError;
use crate::models::{SeriesKey, YearIndex};
use async_trait::async_trait;

pub use fetcher::SeriesFetcher;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use worldbank::WorldBankTransport;

/// A single logical request for one series over a year range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub key: SeriesKey,
    pub start_year: i32,
    pub end_year: i32,
}

impl SeriesRequest {
    pub fn new(key: &SeriesKey, years: &YearIndex) -> Self {
        Self {
            key: key.clone(),
            start_year: years.start(),
            end_year: years.end(),
        }
    }
}

/// Raw status and body of one upstream answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Performs one HTTP exchange for a series request.
///
/// Implementations return `Err` only when no reply was received at all;
/// non-success statuses come back as an [`HttpReply`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &SeriesRequest) -> Result<HttpReply, FetchError>;
}
