//! Error types for fetching and refreshing indicator data.

use crate::models::SeriesKey;
use thiserror::Error;

/// Failure to obtain one series from the upstream source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The upstream kept answering 429 until the retry cap was reached.
    #[error("rate limited by upstream after {attempts} attempts")]
    RateLimited { attempts: usize },

    /// Non-success status other than 429, or the request never completed.
    #[error("upstream unavailable{}: {message}", status_suffix(.status))]
    UpstreamUnavailable { status: Option<u16>, message: String },

    /// The body did not have the expected two-element shape.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

/// Why a refresh cycle did not publish a ready dataset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: SeriesKey,
        #[source]
        source: FetchError,
    },

    /// The cycle was superseded or the aggregator was disposed.
    #[error("refresh cycle cancelled")]
    Cancelled,
}

impl RefreshError {
    pub fn fetch(key: &SeriesKey, source: FetchError) -> Self {
        RefreshError::Fetch {
            key: key.clone(),
            source,
        }
    }

    /// Message shown to the user when the cycle fails.
    pub fn user_message(&self) -> String {
        match self {
            RefreshError::Fetch { .. } => {
                "Live data unavailable right now. Please try again later.".to_string()
            }
            RefreshError::Cancelled => "Refresh cancelled.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display_with_and_without_status() {
        let with_status = FetchError::UpstreamUnavailable {
            status: Some(503),
            message: "service unavailable".to_string(),
        };
        assert_eq!(
            with_status.to_string(),
            "upstream unavailable (status 503): service unavailable"
        );

        let without_status = FetchError::UpstreamUnavailable {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            without_status.to_string(),
            "upstream unavailable: connection refused"
        );
    }

    #[test]
    fn test_refresh_error_names_series() {
        let err = RefreshError::fetch(
            &SeriesKey::new("SSF", "SP.POP.TOTL"),
            FetchError::RateLimited { attempts: 3 },
        );
        let text = err.to_string();
        assert!(text.contains("SSF/SP.POP.TOTL"));
        assert!(text.contains("3 attempts"));
        assert!(err.user_message().contains("unavailable"));
    }
}
