//! Google Places review source: two-step place lookup and normalization
//!
//! The secondary source. Each tracked property is resolved to a place id by
//! free-text search, then that place's reviews are fetched and normalized.
//! Unlike the primary source there is no fallback: a property with no
//! resolvable place simply contributes nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::reviews::sources::{ReviewSource, SourceError, SourceHealth, SourceResult};
use crate::reviews::types::{clamp_rating, Category, Channel, PropertyRef, Review, ANONYMOUS_GUEST};

const PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Marker tag stamped on every review normalized from this source.
pub const SOURCE_TAG: &str = "google-reviews";

/// Review timestamp as Places returns it: unix seconds, or occasionally an
/// RFC 3339 string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlaceTime {
    Seconds(i64),
    Text(String),
}

/// Raw review entry inside a place-details result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GooglePlaceReview {
    pub author_name: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub time: Option<PlaceTime>,
}

/// Reviews and aggregate rating details for one resolved place.
#[derive(Debug, Clone, Default)]
pub struct PlaceDetails {
    pub reviews: Vec<GooglePlaceReview>,
    pub rating: f64,
    pub total_ratings: u32,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<PlaceCandidate>,
}

#[derive(Debug, Deserialize)]
struct PlaceCandidate {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsResult {
    reviews: Vec<GooglePlaceReview>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
}

/// The two-step place resolution protocol, behind a trait so aggregation
/// and service tests can drive it with an in-memory double.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Resolve a free-text name and address to a place id.
    async fn find_place(&self, name: &str, address: &str) -> SourceResult<Option<String>>;

    /// Fetch review details for a resolved place id.
    async fn place_details(&self, place_id: &str) -> SourceResult<Option<PlaceDetails>>;
}

/// Handle on the Google Places web service.
pub struct GooglePlacesClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        Self::with_base_url(PLACES_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> SourceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PlaceLookup for GooglePlacesClient {
    async fn find_place(&self, name: &str, address: &str) -> SourceResult<Option<String>> {
        let url = format!("{}/findplacefromtext/json", self.base_url);
        let input = format!("{} {}", name, address);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("input", input.as_str()),
                ("inputtype", "textquery"),
                ("fields", "place_id"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: FindPlaceResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        match body.status.as_str() {
            "OK" => Ok(body.candidates.into_iter().find_map(|c| c.place_id)),
            "ZERO_RESULTS" => Ok(None),
            other => Err(SourceError::Rejected(format!(
                "find-place returned status {}",
                other
            ))),
        }
    }

    async fn place_details(&self, place_id: &str) -> SourceResult<Option<PlaceDetails>> {
        let url = format!("{}/details/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("place_id", place_id),
                ("fields", "reviews,rating,user_ratings_total,name"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DetailsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        match (body.status.as_str(), body.result) {
            ("OK", Some(result)) => Ok(Some(PlaceDetails {
                reviews: result.reviews,
                rating: result.rating.unwrap_or(0.0),
                total_ratings: result.user_ratings_total.unwrap_or(0),
            })),
            ("OK", None) | ("ZERO_RESULTS", _) | ("NOT_FOUND", _) => Ok(None),
            (other, _) => Err(SourceError::Rejected(format!(
                "place-details returned status {}",
                other
            ))),
        }
    }
}

/// Review source that resolves every tracked property through a
/// `PlaceLookup` and merges the results.
pub struct GoogleReviewsSource {
    lookup: Arc<dyn PlaceLookup>,
    properties: Vec<PropertyRef>,
}

impl GoogleReviewsSource {
    pub fn new(lookup: Arc<dyn PlaceLookup>, properties: Vec<PropertyRef>) -> Self {
        Self { lookup, properties }
    }

    /// Fetch and normalize reviews for a single property. A property that
    /// resolves to no place, or a place with no details, yields an empty
    /// list rather than an error.
    pub async fn reviews_for_property(&self, property: &PropertyRef) -> SourceResult<Vec<Review>> {
        let place_id = match self
            .lookup
            .find_place(&property.name, &property.address)
            .await?
        {
            Some(place_id) => place_id,
            None => {
                info!("No place found for {}", property.name);
                return Ok(Vec::new());
            }
        };

        let details = match self.lookup.place_details(&place_id).await? {
            Some(details) => details,
            None => {
                info!("No place details for {}", property.name);
                return Ok(Vec::new());
            }
        };

        Ok(normalize_place_reviews(
            &details.reviews,
            &property.listing_id,
            &property.name,
        ))
    }
}

#[async_trait]
impl ReviewSource for GoogleReviewsSource {
    fn name(&self) -> &str {
        "google"
    }

    async fn fetch_reviews(&self) -> SourceResult<Vec<Review>> {
        let mut all = Vec::new();
        let mut failures = 0;
        let mut last_error: Option<SourceError> = None;

        for property in &self.properties {
            match self.reviews_for_property(property).await {
                Ok(mut reviews) => {
                    if !reviews.is_empty() {
                        info!(
                            "Fetched {} Google reviews for {}",
                            reviews.len(),
                            property.name
                        );
                    }
                    all.append(&mut reviews);
                }
                Err(e) => {
                    warn!("Google lookup failed for {}: {}", property.name, e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        // Partial failures degrade to whatever was fetched; only a clean
        // sweep of failures surfaces as a source error.
        match last_error {
            Some(error) if failures == self.properties.len() && !self.properties.is_empty() => {
                Err(error)
            }
            _ => Ok(all),
        }
    }

    async fn health_check(&self) -> SourceHealth {
        let property = match self.properties.first() {
            Some(property) => property,
            None => {
                return SourceHealth {
                    source: self.name().to_string(),
                    ok: false,
                    detail: "no properties configured for lookup".to_string(),
                }
            }
        };

        let (ok, detail) = match self
            .lookup
            .find_place(&property.name, &property.address)
            .await
        {
            Ok(Some(place_id)) => (true, format!("resolved {} to {}", property.name, place_id)),
            Ok(None) => (true, format!("connected, no place match for {}", property.name)),
            Err(e) => (false, format!("lookup failed: {}", e)),
        };

        SourceHealth {
            source: self.name().to_string(),
            ok,
            detail,
        }
    }
}

/// Normalize raw place reviews for one listing. Ids are positional within
/// the listing, so the same place data always produces the same ids.
pub fn normalize_place_reviews(
    raw: &[GooglePlaceReview],
    listing_id: &str,
    listing_name: &str,
) -> Vec<Review> {
    raw.iter()
        .enumerate()
        .map(|(index, entry)| Review {
            id: format!("google-{}-{}", listing_id, index),
            listing_id: listing_id.to_string(),
            listing_name: listing_name.to_string(),
            guest_name: entry
                .author_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| ANONYMOUS_GUEST.to_string()),
            rating: entry
                .rating
                .filter(|r| *r > 0.0)
                .map(|r| clamp_rating(r.round()))
                .unwrap_or(5),
            comment: entry.text.clone().unwrap_or_default(),
            date: review_time(entry.time.as_ref()),
            channel: Channel::Google,
            category: Category::Overall,
            is_approved: false,
            is_displayed: false,
            response_from_host: None,
            response_date: None,
            tags: vec![SOURCE_TAG.to_string()],
        })
        .collect()
}

/// Review timestamp: unix seconds are converted to milliseconds before the
/// datetime is built; string timestamps are parsed as RFC 3339. Anything
/// else becomes "now".
fn review_time(time: Option<&PlaceTime>) -> DateTime<Utc> {
    match time {
        Some(PlaceTime::Seconds(seconds)) => Utc
            .timestamp_millis_opt(seconds.saturating_mul(1000))
            .single()
            .unwrap_or_else(Utc::now),
        Some(PlaceTime::Text(text)) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        None => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_place_review(author: &str, rating: f64, time: i64) -> GooglePlaceReview {
        GooglePlaceReview {
            author_name: Some(author.to_string()),
            rating: Some(rating),
            text: Some("A pleasant stay".to_string()),
            time: Some(PlaceTime::Seconds(time)),
        }
    }

    #[test]
    fn ids_are_source_listing_and_position() {
        let raw = vec![
            raw_place_review("Ana", 5.0, 1_700_000_000),
            raw_place_review("Ben", 4.0, 1_700_000_100),
        ];
        let reviews = normalize_place_reviews(&raw, "2", "Cozy Marina Apartment");

        assert_eq!(reviews[0].id, "google-2-0");
        assert_eq!(reviews[1].id, "google-2-1");
        assert_eq!(reviews[0].listing_id, "2");
        assert_eq!(reviews[0].listing_name, "Cozy Marina Apartment");
    }

    #[test]
    fn unix_seconds_become_utc_timestamps() {
        let raw = vec![raw_place_review("Ana", 5.0, 1_700_000_000)];
        let reviews = normalize_place_reviews(&raw, "1", "Loft");
        assert_eq!(
            reviews[0].date,
            Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap()
        );
    }

    #[test]
    fn string_timestamps_parse_as_rfc3339() {
        let raw = vec![GooglePlaceReview {
            time: Some(PlaceTime::Text("2024-02-01T08:00:00Z".to_string())),
            ..GooglePlaceReview::default()
        }];
        let reviews = normalize_place_reviews(&raw, "1", "Loft");
        assert_eq!(
            reviews[0].date,
            "2024-02-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn missing_fields_get_defaults() {
        let reviews = normalize_place_reviews(&[GooglePlaceReview::default()], "3", "Studio");
        let review = &reviews[0];

        assert_eq!(review.guest_name, ANONYMOUS_GUEST);
        assert_eq!(review.rating, 5);
        assert_eq!(review.comment, "");
        assert_eq!(review.channel, Channel::Google);
        assert_eq!(review.category, Category::Overall);
        assert!(!review.is_approved);
        assert!(!review.is_displayed);
        assert_eq!(review.tags, vec!["google-reviews".to_string()]);
    }

    #[test]
    fn place_reviews_start_unmoderated() {
        let raw = vec![raw_place_review("Ana", 5.0, 1_700_000_000)];
        let reviews = normalize_place_reviews(&raw, "1", "Loft");
        assert!(!reviews[0].is_approved);
        assert!(!reviews[0].is_displayed);
    }

    #[test]
    fn find_place_response_parses_candidates() {
        let body = r#"{
            "status": "OK",
            "candidates": [{"place_id": "ChIJexample"}]
        }"#;
        let parsed: FindPlaceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(
            parsed.candidates[0].place_id.as_deref(),
            Some("ChIJexample")
        );
    }

    #[test]
    fn details_response_tolerates_missing_reviews() {
        let body = r#"{
            "status": "OK",
            "result": {"rating": 4.6, "user_ratings_total": 120}
        }"#;
        let parsed: DetailsResponse = serde_json::from_str(body).unwrap();
        let result = parsed.result.unwrap();
        assert!(result.reviews.is_empty());
        assert_eq!(result.rating, Some(4.6));
        assert_eq!(result.user_ratings_total, Some(120));
    }

    #[test]
    fn place_time_deserializes_both_shapes() {
        let seconds: GooglePlaceReview =
            serde_json::from_str(r#"{"time": 1700000000}"#).unwrap();
        assert!(matches!(seconds.time, Some(PlaceTime::Seconds(1_700_000_000))));

        let text: GooglePlaceReview =
            serde_json::from_str(r#"{"time": "2024-02-01T08:00:00Z"}"#).unwrap();
        assert!(matches!(text.time, Some(PlaceTime::Text(_))));
    }

    mod source {
        use super::*;
        use std::collections::HashMap;

        /// Double for the places protocol: canned answers keyed by
        /// property name.
        struct StubLookup {
            places: HashMap<String, String>,
            details: HashMap<String, PlaceDetails>,
            fail: bool,
        }

        #[async_trait]
        impl PlaceLookup for StubLookup {
            async fn find_place(
                &self,
                name: &str,
                _address: &str,
            ) -> SourceResult<Option<String>> {
                if self.fail {
                    return Err(SourceError::Rejected("REQUEST_DENIED".to_string()));
                }
                Ok(self.places.get(name).cloned())
            }

            async fn place_details(
                &self,
                place_id: &str,
            ) -> SourceResult<Option<PlaceDetails>> {
                if self.fail {
                    return Err(SourceError::Rejected("REQUEST_DENIED".to_string()));
                }
                Ok(self.details.get(place_id).cloned())
            }
        }

        fn property(listing_id: &str, name: &str) -> PropertyRef {
            PropertyRef {
                listing_id: listing_id.to_string(),
                name: name.to_string(),
                address: "123 Main St, San Francisco".to_string(),
            }
        }

        #[tokio::test]
        async fn unresolved_properties_contribute_nothing() {
            let lookup = Arc::new(StubLookup {
                places: HashMap::new(),
                details: HashMap::new(),
                fail: false,
            });
            let source = GoogleReviewsSource::new(lookup, vec![property("1", "Loft")]);

            let reviews = source.fetch_reviews().await.unwrap();
            assert!(reviews.is_empty());
        }

        #[tokio::test]
        async fn resolved_properties_yield_normalized_reviews() {
            let mut places = HashMap::new();
            places.insert("Loft".to_string(), "place-1".to_string());
            let mut details = HashMap::new();
            details.insert(
                "place-1".to_string(),
                PlaceDetails {
                    reviews: vec![raw_place_review("Ana", 4.0, 1_700_000_000)],
                    rating: 4.5,
                    total_ratings: 10,
                },
            );

            let lookup = Arc::new(StubLookup {
                places,
                details,
                fail: false,
            });
            let source = GoogleReviewsSource::new(lookup, vec![property("1", "Loft")]);

            let reviews = source.fetch_reviews().await.unwrap();
            assert_eq!(reviews.len(), 1);
            assert_eq!(reviews[0].id, "google-1-0");
            assert_eq!(reviews[0].rating, 4);
            assert_eq!(reviews[0].channel, Channel::Google);
        }

        #[tokio::test]
        async fn total_lookup_failure_is_a_source_error() {
            let lookup = Arc::new(StubLookup {
                places: HashMap::new(),
                details: HashMap::new(),
                fail: true,
            });
            let source = GoogleReviewsSource::new(
                lookup,
                vec![property("1", "Loft"), property("2", "Studio")],
            );

            let result = source.fetch_reviews().await;
            assert!(matches!(result, Err(SourceError::Rejected(_))));
        }

        #[tokio::test]
        async fn partial_failure_keeps_successful_properties() {
            let mut places = HashMap::new();
            places.insert("Loft".to_string(), "place-1".to_string());
            let mut details = HashMap::new();
            details.insert(
                "place-1".to_string(),
                PlaceDetails {
                    reviews: vec![raw_place_review("Ana", 5.0, 1_700_000_000)],
                    rating: 5.0,
                    total_ratings: 3,
                },
            );

            // Second property resolves to no place; that is not a failure.
            let lookup = Arc::new(StubLookup {
                places,
                details,
                fail: false,
            });
            let source = GoogleReviewsSource::new(
                lookup,
                vec![property("1", "Loft"), property("2", "Studio")],
            );

            let reviews = source.fetch_reviews().await.unwrap();
            assert_eq!(reviews.len(), 1);
        }

        #[tokio::test]
        async fn health_check_reports_resolution() {
            let mut places = HashMap::new();
            places.insert("Loft".to_string(), "place-1".to_string());
            let lookup = Arc::new(StubLookup {
                places,
                details: HashMap::new(),
                fail: false,
            });
            let source = GoogleReviewsSource::new(lookup, vec![property("1", "Loft")]);

            let health = source.health_check().await;
            assert_eq!(health.source, "google");
            assert!(health.ok);
            assert!(health.detail.contains("place-1"));
        }
    }
}
