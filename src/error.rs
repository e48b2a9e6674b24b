//! Custom error types for scholarleads.
//!
//! Only two kinds of failure escape the pipeline as top-level errors: invalid
//! input and a failed primary fetch. Everything downstream of a successful
//! primary fetch is absorbed locally and degrades to sentinel values.

use std::time::Duration;
use thiserror::Error;

/// Main error type for scholarleads operations.
#[derive(Debug, Error)]
pub enum LeadsError {
    /// A required input was empty or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The search results page could not be fetched
    #[error("Search failed: {0}")]
    SearchFailed(#[source] FetchError),

    /// The primary profile page could not be fetched
    #[error("Failed to fetch profile {url}: {source}")]
    ProfileFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML or response parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `LeadsError`
pub type Result<T> = std::result::Result<T, LeadsError>;

/// Failure of a single page fetch.
///
/// A fetch that completes with `success = false` is mapped to
/// [`FetchError::Unsuccessful`] so callers handle both paths the same way.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("timed out after {after:?}: {url}")]
    Timeout { url: String, after: Duration },

    #[error("http error {status}")]
    Http { status: u16, retriable: bool },

    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    #[error("fetch reported failure for {url}")]
    Unsuccessful { url: String },

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::InvalidUrl(_) | Self::Captcha | Self::Unsuccessful { .. } => false,
            Self::Http { retriable, .. } => *retriable,
            Self::Timeout { .. } | Self::RateLimited(_) | Self::Network(_) => true,
        }
    }

    /// Classify a reqwest failure; `budget` is the timeout the request ran under.
    pub fn from_reqwest_error(err: reqwest::Error, budget: Duration) -> Self {
        if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                retriable: status.is_server_error(),
            }
        } else if err.is_timeout() {
            Self::Timeout {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                after: budget,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// One publication's enrichment failed. Isolated to that publication.
#[derive(Debug, Clone, Error)]
#[error("enrichment failed for {url}: {reason}")]
pub struct EnrichmentFailed {
    pub url: String,
    pub reason: String,
}

impl EnrichmentFailed {
    pub fn new(url: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!FetchError::Captcha.should_retry());
        assert!(FetchError::RateLimited(60).should_retry());
        assert!(!FetchError::Http { status: 404, retriable: false }.should_retry());
        assert!(FetchError::Http { status: 503, retriable: true }.should_retry());
    }
}
