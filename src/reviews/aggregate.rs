//! Aggregation engine: merge every configured source into one collection
//!
//! Sources are fetched concurrently and their results concatenated in the
//! caller-supplied source order. Per-source failures are recovered here,
//! either with the source's fallback data or an empty contribution, and
//! reported through `SourceReport` instead of failing the pass.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::reviews::sources::ReviewSource;
use crate::reviews::types::{Aggregation, SourceReport};

/// Run one aggregation pass over `sources`.
///
/// The result is degraded when any source failed or substituted fallback
/// data. An empty result from a source with no fallback is not
/// degradation; for those sources absence is meaningful.
pub async fn aggregate(sources: &[Arc<dyn ReviewSource>]) -> Aggregation {
    let fetches = sources.iter().map(|source| source.fetch_reviews());
    let outcomes = join_all(fetches).await;

    let mut reviews = Vec::new();
    let mut reports = Vec::with_capacity(sources.len());
    let mut degraded = false;

    for (source, outcome) in sources.iter().zip(outcomes) {
        let report = match outcome {
            Ok(fetched) if !fetched.is_empty() => {
                info!("Source {} returned {} reviews", source.name(), fetched.len());
                let count = fetched.len();
                reviews.extend(fetched);
                SourceReport {
                    source: source.name().to_string(),
                    ok: true,
                    used_fallback: false,
                    fetched: count,
                    error: None,
                }
            }
            Ok(_) => match source.fallback() {
                Some(fallback) => {
                    warn!(
                        "Source {} returned no reviews, substituting {} fallback reviews",
                        source.name(),
                        fallback.len()
                    );
                    degraded = true;
                    let count = fallback.len();
                    reviews.extend(fallback);
                    SourceReport {
                        source: source.name().to_string(),
                        ok: true,
                        used_fallback: true,
                        fetched: count,
                        error: None,
                    }
                }
                None => {
                    info!("Source {} returned no reviews", source.name());
                    SourceReport {
                        source: source.name().to_string(),
                        ok: true,
                        used_fallback: false,
                        fetched: 0,
                        error: None,
                    }
                }
            },
            Err(error) => {
                warn!("Source {} failed: {}", source.name(), error);
                degraded = true;
                match source.fallback() {
                    Some(fallback) => {
                        info!(
                            "Substituting {} fallback reviews for {}",
                            fallback.len(),
                            source.name()
                        );
                        let count = fallback.len();
                        reviews.extend(fallback);
                        SourceReport {
                            source: source.name().to_string(),
                            ok: false,
                            used_fallback: true,
                            fetched: count,
                            error: Some(error.to_string()),
                        }
                    }
                    None => SourceReport {
                        source: source.name().to_string(),
                        ok: false,
                        used_fallback: false,
                        fetched: 0,
                        error: Some(error.to_string()),
                    },
                }
            }
        };
        reports.push(report);
    }

    Aggregation {
        reviews,
        degraded,
        sources: reports,
    }
}
