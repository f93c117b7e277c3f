//! Hostaway review source: wire types, API client, and normalization
//!
//! Hostaway is the primary source. Its sandbox accounts rarely hold review
//! data, so the source carries a fallback (seed set plus synthetic batch)
//! that the aggregation step substitutes when a fetch fails or comes back
//! empty.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::reviews::seed;
use crate::reviews::sources::{ReviewSource, SourceError, SourceHealth, SourceResult};
use crate::reviews::types::{clamp_rating, Category, Channel, Review, ANONYMOUS_GUEST};

/// Marker tag stamped on every review normalized from this source.
pub const SOURCE_TAG: &str = "hostaway";

/// Sub-ratings at or above this (on Hostaway's 10-point scale) earn an
/// `excellent-<category>` tag.
const EXCELLENT_THRESHOLD: f64 = 8.0;

/// Per-category sub-rating on Hostaway's native 10-point scale.
#[derive(Debug, Clone, Deserialize)]
pub struct HostawayCategoryRating {
    pub category: String,
    pub rating: f64,
}

/// Raw review record as returned by `GET /v1/reviews`.
///
/// Every field routinely goes missing in sandbox data, so everything is
/// optional and defaulted. Normalization never drops a record; whatever
/// cannot be derived gets a documented default instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostawayReview {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub rating: Option<f64>,
    pub public_review: Option<String>,
    pub review_category: Vec<HostawayCategoryRating>,
    pub submitted_at: Option<String>,
    pub guest_name: Option<String>,
    pub listing_name: Option<String>,
    /// Explicit channel tag. Rarely present, but when it is it wins over
    /// the listing-name heuristic.
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsEnvelope {
    status: Option<String>,
    #[serde(default)]
    result: Vec<HostawayReview>,
}

#[derive(Debug, Deserialize)]
struct ListingsEnvelope {
    status: Option<String>,
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Handle on the Hostaway REST API for one account.
pub struct HostawayClient {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    api_key: String,
}

impl HostawayClient {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> SourceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            account_id: account_id.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch raw review records for the configured account.
    ///
    /// A non-success envelope is treated as "no reviews", not a failure;
    /// the aggregation step decides whether to substitute fallback data.
    pub async fn fetch_raw(&self) -> SourceResult<Vec<HostawayReview>> {
        let url = format!("{}/reviews", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("accountId", self.account_id.as_str()),
                ("limit", "100"),
                ("offset", "0"),
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

        let envelope: ReviewsEnvelope = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if envelope.status.as_deref() != Some("success") {
            warn!(
                "Hostaway reviews envelope status was {:?}",
                envelope.status
            );
            return Ok(Vec::new());
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl ReviewSource for HostawayClient {
    fn name(&self) -> &str {
        "hostaway"
    }

    async fn fetch_reviews(&self) -> SourceResult<Vec<Review>> {
        let raw = self.fetch_raw().await?;
        info!("Fetched {} raw reviews from Hostaway", raw.len());
        Ok(normalize_reviews(&raw))
    }

    fn fallback(&self) -> Option<Vec<Review>> {
        let mut reviews = seed::seed_reviews();
        reviews.extend(seed::generate_additional(seed::FALLBACK_SYNTHETIC_COUNT));
        Some(reviews)
    }

    async fn health_check(&self) -> SourceHealth {
        let url = format!("{}/listings", self.base_url);
        let result = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("accountId", self.account_id.as_str()), ("limit", "1")])
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        let (ok, detail) = match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<ListingsEnvelope>().await {
                    Ok(envelope) => (
                        true,
                        format!(
                            "connected (status {}, {} listings visible)",
                            envelope.status.as_deref().unwrap_or("unknown"),
                            envelope.result.len()
                        ),
                    ),
                    Err(e) => (false, format!("unreadable listings response: {}", e)),
                }
            }
            Ok(response) => (false, format!("API returned status {}", response.status())),
            Err(e) => (false, format!("connection failed: {}", e)),
        };

        SourceHealth {
            source: self.name().to_string(),
            ok,
            detail,
        }
    }
}

/// Normalize a batch of raw Hostaway records.
pub fn normalize_reviews(raw: &[HostawayReview]) -> Vec<Review> {
    raw.iter().map(normalize_review).collect()
}

/// Normalize one raw record into canonical form.
pub fn normalize_review(raw: &HostawayReview) -> Review {
    let listing_name = raw.listing_name.clone().unwrap_or_default();
    let listing_id = extract_listing_id(&listing_name);
    let published = raw.status.as_deref() == Some("published");

    Review {
        id: derive_id(raw),
        listing_name: if listing_name.is_empty() {
            format!("Property {}", listing_id)
        } else {
            listing_name.clone()
        },
        listing_id,
        guest_name: raw
            .guest_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_GUEST.to_string()),
        rating: overall_rating(raw),
        comment: raw.public_review.clone().unwrap_or_default(),
        date: parse_submitted_at(raw.submitted_at.as_deref()),
        channel: infer_channel(raw.channel.as_deref(), &listing_name),
        category: primary_category(&raw.review_category),
        is_approved: published,
        is_displayed: published,
        response_from_host: None,
        response_date: None,
        tags: build_tags(raw),
    }
}

/// Stable canonical id for a raw record. Records without a native id hash
/// their listing name and timestamp so repeated passes agree.
fn derive_id(raw: &HostawayReview) -> String {
    match raw.id {
        Some(id) => id.to_string(),
        None => {
            let basis = format!(
                "{}-{}",
                raw.listing_name.as_deref().unwrap_or(""),
                raw.submitted_at.as_deref().unwrap_or("")
            );
            format!("{}-{}", SOURCE_TAG, string_hash(&basis))
        }
    }
}

/// Overall rating on the canonical 1-5 scale.
///
/// A positive direct rating wins. Otherwise the mean of positive
/// sub-ratings, halved when it looks like the 10-point scale, rounded half
/// up. A record with no usable rating data gets 5.
pub fn overall_rating(raw: &HostawayReview) -> u8 {
    if let Some(direct) = raw.rating {
        if direct > 0.0 {
            return clamp_rating(direct.round());
        }
    }

    let positive: Vec<f64> = raw
        .review_category
        .iter()
        .map(|c| c.rating)
        .filter(|r| *r > 0.0)
        .collect();

    if !positive.is_empty() {
        let mean = positive.iter().sum::<f64>() / positive.len() as f64;
        let scaled = if mean > 5.0 { mean / 2.0 } else { mean };
        return clamp_rating(scaled.round());
    }

    5
}

/// Canonical category from the first sub-rating's label. Labels outside
/// the known set land on `overall` rather than guessing.
pub fn primary_category(categories: &[HostawayCategoryRating]) -> Category {
    let first = match categories.first() {
        Some(first) => first,
        None => return Category::Overall,
    };

    match first.category.to_lowercase().as_str() {
        "cleanliness" => Category::Cleanliness,
        "communication" => Category::Communication,
        "location" => Category::Location,
        "value" => Category::Value,
        "accuracy" => Category::Accuracy,
        "checkin" | "check_in" => Category::Checkin,
        "respect_house_rules" | "overall" => Category::Overall,
        _ => Category::Overall,
    }
}

/// Extract a listing id from a listing name.
///
/// Four patterns are tried in order; names matching none hash to a stable
/// numeric id so repeated normalization passes produce the same id.
pub fn extract_listing_id(listing_name: &str) -> String {
    let patterns = [
        r"(\d+)B?\s+N?\d*\s*A?\s*-", // "2B N1 A - " style prefixes
        r"(?i)listing[_-]?(\d+)",
        r"(?i)property[_-]?(\d+)",
        r"(\d+)$",
    ];

    for pattern in patterns {
        let re = Regex::new(pattern).expect("valid listing-id pattern");
        if let Some(captures) = re.captures(listing_name) {
            if let Some(matched) = captures.get(1) {
                return matched.as_str().to_string();
            }
        }
    }

    string_hash(listing_name).to_string()
}

/// 32-bit rolling hash (`h = h * 31 + ch` via shift and subtract), absolute
/// value so derived ids stay non-negative.
pub fn string_hash(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for ch in value.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32);
    }
    hash.unsigned_abs()
}

/// Channel for a Hostaway record.
///
/// An explicit channel tag wins when present. Otherwise fall back to
/// listing-name substrings; that heuristic has false positives ("Bel Air"
/// reads as airbnb) and is a known limitation carried for compatibility.
pub fn infer_channel(explicit: Option<&str>, listing_name: &str) -> Channel {
    if let Some(tag) = explicit {
        if let Some(channel) = Channel::parse(&tag.to_lowercase()) {
            return channel;
        }
    }

    let name = listing_name.to_lowercase();
    if name.contains("airbnb") || name.contains("air") {
        Channel::Airbnb
    } else if name.contains("booking") || name.contains("book") {
        Channel::Booking
    } else if name.contains("vrbo") || name.contains("homeaway") {
        Channel::Vrbo
    } else {
        Channel::Direct
    }
}

/// Parse a Hostaway timestamp. The API usually sends
/// `"2020-08-21 22:45:14"`; some records arrive as RFC 3339. Unparseable
/// values become "now" so a review always carries a valid timestamp.
pub fn parse_submitted_at(submitted_at: Option<&str>) -> DateTime<Utc> {
    let raw = match submitted_at {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Utc::now(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }

    warn!("Failed to parse review date: {}", raw);
    Utc::now()
}

/// Tags for a normalized record: the source marker, the raw status, and an
/// `excellent-<category>` tag per high sub-rating.
pub fn build_tags(raw: &HostawayReview) -> Vec<String> {
    let mut tags = vec![SOURCE_TAG.to_string()];

    if let Some(status) = raw.status.as_deref() {
        if !status.is_empty() {
            tags.push(status.to_string());
        }
    }

    for sub in &raw.review_category {
        if sub.rating >= EXCELLENT_THRESHOLD {
            tags.push(format!("excellent-{}", sub.category));
        }
    }

    tags
}
