//! Trait seam for upstream review providers
//!
//! Sources are injected into the aggregation step as trait objects, so the
//! whole pipeline can be exercised with in-memory doubles in tests instead
//! of live HTTP.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::reviews::types::Review;

pub type SourceResult<T> = Result<T, SourceError>;

/// Failure talking to an upstream review source.
///
/// These never surface as hard API failures: the aggregation step recovers
/// each one (fallback data or an empty contribution) and reports it through
/// a `SourceReport` instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("upstream rejected the request: {0}")]
    Rejected(String),

    #[error("failed to parse upstream response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

/// Result of probing one source's connectivity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source: String,
    pub ok: bool,
    pub detail: String,
}

/// One upstream provider of canonical reviews.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Stable name used in reports and logs.
    fn name(&self) -> &str;

    /// Fetch this source's reviews and normalize them.
    async fn fetch_reviews(&self) -> SourceResult<Vec<Review>>;

    /// Substitute data for when the fetch fails or yields nothing.
    ///
    /// `None` means an empty result is meaningful for this source and
    /// nothing should be substituted.
    fn fallback(&self) -> Option<Vec<Review>> {
        None
    }

    /// Probe upstream connectivity without normalizing anything.
    async fn health_check(&self) -> SourceHealth;
}
