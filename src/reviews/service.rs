//! Review service: owns the configured sources and the current in-memory
//! collection, and exposes the operations the HTTP layer calls.
//!
//! Moderation changes live only in memory for the lifetime of the process.
//! A refresh re-aggregates from the sources and therefore discards them.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::reviews::aggregate::aggregate;
use crate::reviews::filter::apply_filters;
use crate::reviews::google::{GooglePlacesClient, GoogleReviewsSource};
use crate::reviews::hostaway::HostawayClient;
use crate::reviews::seed;
use crate::reviews::sort::sort_reviews;
use crate::reviews::sources::{ReviewSource, SourceHealth};
use crate::reviews::stats::compute_stats;
use crate::reviews::types::{
    PropertyRef, Review, ReviewFilter, ReviewStats, ReviewUpdate, SortDirection, SortField,
    SourceReport,
};

/// Payload of one reviews query: the filtered, sorted collection plus
/// stats computed over that same filtered set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedReviews {
    pub reviews: Vec<Review>,
    pub stats: ReviewStats,
    /// Reviews surviving the filter.
    pub total: usize,
    /// Reviews in the aggregation before filtering.
    pub original_total: usize,
    pub degraded: bool,
    pub sources: Vec<SourceReport>,
}

/// One aggregation pass, snapshotted. The review vec sits behind an `Arc`
/// so readers keep a consistent view while updates swap in replacements.
#[derive(Debug, Clone)]
struct CollectionState {
    reviews: Arc<Vec<Review>>,
    degraded: bool,
    sources: Vec<SourceReport>,
}

pub struct ReviewService {
    sources: Vec<Arc<dyn ReviewSource>>,
    state: RwLock<Option<CollectionState>>,
}

impl ReviewService {
    pub fn new(sources: Vec<Arc<dyn ReviewSource>>) -> Self {
        Self {
            sources,
            state: RwLock::new(None),
        }
    }

    /// Run one aggregation pass over the configured sources.
    async fn collect(&self) -> CollectionState {
        let aggregation = aggregate(&self.sources).await;
        info!(
            "Aggregated {} reviews from {} sources (degraded: {})",
            aggregation.reviews.len(),
            self.sources.len(),
            aggregation.degraded
        );

        CollectionState {
            reviews: Arc::new(aggregation.reviews),
            degraded: aggregation.degraded,
            sources: aggregation.sources,
        }
    }

    /// The current collection, aggregating on first use. `force` runs a
    /// fresh pass even when a collection is already loaded.
    async fn load(&self, force: bool) -> CollectionState {
        if !force {
            let guard = self.state.read().await;
            if let Some(state) = guard.as_ref() {
                return state.clone();
            }
        }

        let fresh = self.collect().await;

        let mut guard = self.state.write().await;
        if !force {
            // Another caller filled the state while we were fetching. Keep
            // theirs: it may already carry moderation edits.
            if let Some(existing) = guard.as_ref() {
                return existing.clone();
            }
        }
        *guard = Some(fresh.clone());
        fresh
    }

    /// Aggregate (or reuse the loaded collection), filter, compute stats
    /// over the filtered set, then sort for presentation.
    pub async fn get_aggregated_reviews(
        &self,
        filter: &ReviewFilter,
        field: SortField,
        direction: SortDirection,
        force_refresh: bool,
    ) -> AggregatedReviews {
        let state = self.load(force_refresh).await;

        let filtered = apply_filters(&state.reviews, filter);
        let stats = compute_stats(&filtered);
        let reviews = sort_reviews(&filtered, field, direction);

        AggregatedReviews {
            total: reviews.len(),
            original_total: state.reviews.len(),
            degraded: state.degraded,
            sources: state.sources.clone(),
            reviews,
            stats,
        }
    }

    /// Apply a moderation update to one review and swap in the updated
    /// collection. Returns `None` when no review has that id.
    ///
    /// The whole read-modify-write runs under the write guard, so
    /// overlapping updates apply one after the other instead of losing
    /// whichever landed first.
    ///
    /// Revoking approval always clears the display flag; a review that is
    /// not approved must never stay publicly displayed.
    pub async fn update_review(&self, review_id: &str, update: &ReviewUpdate) -> Option<Review> {
        let mut guard = self.state.write().await;
        if guard.is_none() {
            *guard = Some(self.collect().await);
        }
        let state = guard.as_mut()?;
        let position = state.reviews.iter().position(|r| r.id == review_id)?;

        let mut reviews: Vec<Review> = state.reviews.as_ref().clone();
        {
            let review = &mut reviews[position];
            if let Some(approved) = update.is_approved {
                review.is_approved = approved;
                if !approved {
                    review.is_displayed = false;
                }
            }
            if let Some(displayed) = update.is_displayed {
                review.is_displayed = displayed;
            }
            if let Some(tags) = &update.tags {
                review.tags = tags.clone();
            }
            if let Some(response) = &update.response_from_host {
                review.response_from_host = Some(response.clone());
                review.response_date = Some(Utc::now());
            }
        }
        let updated = reviews[position].clone();
        state.reviews = Arc::new(reviews);

        info!("Updated review {}", review_id);
        Some(updated)
    }

    /// Probe every configured source's connectivity, concurrently.
    pub async fn test_connectivity(&self) -> Vec<SourceHealth> {
        let checks = self.sources.iter().map(|source| source.health_check());
        join_all(checks).await
    }
}

/// The sources assembled from configuration. The google handle is kept
/// separately so the per-property endpoint can reach it directly.
pub struct SourceSet {
    pub sources: Vec<Arc<dyn ReviewSource>>,
    pub google: Option<Arc<GoogleReviewsSource>>,
}

/// Build the configured sources: Hostaway always, Google Places only when
/// an API key is configured.
pub fn build_sources(config: &Config) -> Result<SourceSet> {
    let hostaway = HostawayClient::new(
        &config.hostaway_base_url,
        &config.hostaway_account_id,
        &config.hostaway_api_key,
        config.source_timeout,
    )?;
    let mut sources: Vec<Arc<dyn ReviewSource>> = vec![Arc::new(hostaway)];

    let google = match &config.google_maps_api_key {
        Some(api_key) => {
            let client = GooglePlacesClient::new(api_key, config.source_timeout)?;
            let properties: Vec<PropertyRef> =
                seed::SEED_PROPERTIES.iter().map(PropertyRef::from).collect();
            let source = Arc::new(GoogleReviewsSource::new(Arc::new(client), properties));
            let as_review_source: Arc<dyn ReviewSource> = source.clone();
            sources.push(as_review_source);
            Some(source)
        }
        None => {
            info!("Google Places source disabled (GOOGLE_MAPS_API_KEY not set)");
            None
        }
    };

    Ok(SourceSet { sources, google })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::sources::{SourceError, SourceResult};
    use crate::reviews::types::{Category, Channel};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn mock_review(id: &str, rating: u8, channel: Channel) -> Review {
        Review {
            id: id.to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "Sarah Johnson".to_string(),
            rating,
            comment: "Wonderful stay".to_string(),
            date: "2024-01-15T10:30:00Z".parse().unwrap(),
            channel,
            category: Category::Overall,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: Vec::new(),
        }
    }

    struct CountingSource {
        reviews: Vec<Review>,
        fail: bool,
        fallback: Option<Vec<Review>>,
        fetches: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingSource {
        fn healthy(reviews: Vec<Review>) -> Self {
            Self {
                reviews,
                fail: false,
                fallback: None,
                fetches: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(reviews: Vec<Review>, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::healthy(reviews)
            }
        }
    }

    #[async_trait]
    impl ReviewSource for CountingSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch_reviews(&self) -> SourceResult<Vec<Review>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(SourceError::Network("unreachable".to_string()));
            }
            Ok(self.reviews.clone())
        }

        fn fallback(&self) -> Option<Vec<Review>> {
            self.fallback.clone()
        }

        async fn health_check(&self) -> SourceHealth {
            SourceHealth {
                source: "stub".to_string(),
                ok: !self.fail,
                detail: "stub".to_string(),
            }
        }
    }

    fn service_with(reviews: Vec<Review>) -> (ReviewService, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::healthy(reviews));
        let as_source: Arc<dyn ReviewSource> = source.clone();
        (ReviewService::new(vec![as_source]), source)
    }

    #[tokio::test]
    async fn stats_describe_the_filtered_set() {
        let (service, _) = service_with(vec![
            mock_review("1", 5, Channel::Airbnb),
            mock_review("2", 4, Channel::Booking),
            mock_review("3", 5, Channel::Direct),
        ]);

        let filter = ReviewFilter {
            rating: vec![5],
            ..Default::default()
        };
        let result = service
            .get_aggregated_reviews(&filter, SortField::Date, SortDirection::Desc, false)
            .await;

        assert_eq!(result.total, 2);
        assert_eq!(result.original_total, 3);
        assert_eq!(result.stats.total_reviews, 2);
        assert_eq!(result.stats.average_rating, 5.0);
    }

    #[tokio::test]
    async fn collection_loads_once_and_is_reused() {
        let (service, source) = service_with(vec![mock_review("1", 5, Channel::Airbnb)]);

        let filter = ReviewFilter::default();
        service
            .get_aggregated_reviews(&filter, SortField::Date, SortDirection::Desc, false)
            .await;
        service
            .get_aggregated_reviews(&filter, SortField::Date, SortDirection::Desc, false)
            .await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        service
            .get_aggregated_reviews(&filter, SortField::Date, SortDirection::Desc, true)
            .await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn update_on_unknown_id_returns_none() {
        let (service, _) = service_with(vec![mock_review("1", 5, Channel::Airbnb)]);

        let update = ReviewUpdate {
            is_approved: Some(false),
            ..Default::default()
        };
        assert!(service.update_review("missing", &update).await.is_none());
    }

    #[tokio::test]
    async fn revoking_approval_clears_display() {
        let (service, _) = service_with(vec![mock_review("1", 5, Channel::Airbnb)]);

        let update = ReviewUpdate {
            is_approved: Some(false),
            ..Default::default()
        };
        let updated = service.update_review("1", &update).await.unwrap();

        assert!(!updated.is_approved);
        assert!(!updated.is_displayed);
    }

    #[tokio::test]
    async fn updates_are_visible_to_subsequent_queries() {
        let (service, _) = service_with(vec![
            mock_review("1", 5, Channel::Airbnb),
            mock_review("2", 4, Channel::Booking),
        ]);

        let update = ReviewUpdate {
            is_approved: Some(false),
            ..Default::default()
        };
        service.update_review("2", &update).await.unwrap();

        let result = service
            .get_aggregated_reviews(
                &ReviewFilter {
                    is_approved: Some(true),
                    ..Default::default()
                },
                SortField::Date,
                SortDirection::Desc,
                false,
            )
            .await;

        assert_eq!(result.total, 1);
        assert_eq!(result.reviews[0].id, "1");
    }

    #[tokio::test]
    async fn host_response_update_stamps_a_response_date() {
        let (service, _) = service_with(vec![mock_review("1", 5, Channel::Airbnb)]);

        let update = ReviewUpdate {
            response_from_host: Some("Thanks for staying!".to_string()),
            tags: Some(vec!["responded".to_string()]),
            ..Default::default()
        };
        let updated = service.update_review("1", &update).await.unwrap();

        assert_eq!(
            updated.response_from_host.as_deref(),
            Some("Thanks for staying!")
        );
        assert!(updated.response_date.is_some());
        assert_eq!(updated.tags, vec!["responded".to_string()]);
    }

    #[tokio::test]
    async fn overlapping_updates_both_persist() {
        // A slow source keeps the first update mid-flight while the second
        // arrives, so both go through the cold-start path together.
        let source = Arc::new(CountingSource::slow(
            vec![
                mock_review("1", 5, Channel::Airbnb),
                mock_review("2", 4, Channel::Booking),
            ],
            Duration::from_millis(50),
        ));
        let as_source: Arc<dyn ReviewSource> = source.clone();
        let service = ReviewService::new(vec![as_source]);

        let revoke = ReviewUpdate {
            is_approved: Some(false),
            ..Default::default()
        };
        let tag = ReviewUpdate {
            tags: Some(vec!["vip".to_string()]),
            ..Default::default()
        };
        let (first, second) = tokio::join!(
            service.update_review("1", &revoke),
            service.update_review("2", &tag)
        );
        assert!(first.is_some());
        assert!(second.is_some());

        let result = service
            .get_aggregated_reviews(
                &ReviewFilter::default(),
                SortField::Date,
                SortDirection::Desc,
                false,
            )
            .await;
        let one = result.reviews.iter().find(|r| r.id == "1").unwrap();
        let two = result.reviews.iter().find(|r| r.id == "2").unwrap();
        assert!(!one.is_approved);
        assert_eq!(two.tags, vec!["vip".to_string()]);
    }

    #[tokio::test]
    async fn refresh_discards_moderation_changes() {
        let (service, _) = service_with(vec![mock_review("1", 5, Channel::Airbnb)]);

        let update = ReviewUpdate {
            is_approved: Some(false),
            ..Default::default()
        };
        service.update_review("1", &update).await.unwrap();

        let refreshed = service
            .get_aggregated_reviews(
                &ReviewFilter::default(),
                SortField::Date,
                SortDirection::Desc,
                true,
            )
            .await;

        // The source still says approved; the in-memory edit is gone
        assert!(refreshed.reviews[0].is_approved);
    }

    #[tokio::test]
    async fn connectivity_probe_covers_every_source() {
        let first = Arc::new(CountingSource::healthy(Vec::new()));
        let second = Arc::new(CountingSource {
            reviews: Vec::new(),
            fail: true,
            fallback: None,
            fetches: AtomicUsize::new(0),
            delay: None,
        });
        let sources: Vec<Arc<dyn ReviewSource>> = vec![first, second];
        let service = ReviewService::new(sources);

        let health = service.test_connectivity().await;
        assert_eq!(health.len(), 2);
        assert!(health[0].ok);
        assert!(!health[1].ok);
    }

    #[test]
    fn build_sources_without_google_key_has_hostaway_only() {
        let config = Config {
            port: 3001,
            hostaway_base_url: "https://api.hostaway.example/v1".to_string(),
            hostaway_account_id: "61148".to_string(),
            hostaway_api_key: "key".to_string(),
            google_maps_api_key: None,
            source_timeout: Duration::from_secs(15),
        };

        let set = build_sources(&config).unwrap();
        assert_eq!(set.sources.len(), 1);
        assert!(set.google.is_none());
    }

    #[test]
    fn build_sources_with_google_key_adds_places_source() {
        let config = Config {
            port: 3001,
            hostaway_base_url: "https://api.hostaway.example/v1".to_string(),
            hostaway_account_id: "61148".to_string(),
            hostaway_api_key: "key".to_string(),
            google_maps_api_key: Some("places-key".to_string()),
            source_timeout: Duration::from_secs(15),
        };

        let set = build_sources(&config).unwrap();
        assert_eq!(set.sources.len(), 2);
        assert!(set.google.is_some());
    }
}
