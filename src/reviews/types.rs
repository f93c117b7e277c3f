//! Type definitions for the review aggregation pipeline
//!
//! These are the canonical data structures every source normalizes into and
//! every engine (filter, stats, sort, export) operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Guest name used when a source record carries none.
pub const ANONYMOUS_GUEST: &str = "Anonymous Guest";

/// Booking channel a review arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Airbnb,
    Booking,
    Vrbo,
    Direct,
    Google,
}

impl Channel {
    /// Parse a canonical channel name. Unknown names are rejected rather
    /// than mapped onto a default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "airbnb" => Some(Channel::Airbnb),
            "booking" => Some(Channel::Booking),
            "vrbo" => Some(Channel::Vrbo),
            "direct" => Some(Channel::Direct),
            "google" => Some(Channel::Google),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Airbnb => "airbnb",
            Channel::Booking => "booking",
            Channel::Vrbo => "vrbo",
            Channel::Direct => "direct",
            Channel::Google => "google",
        };
        write!(f, "{}", name)
    }
}

/// Aspect of the stay a review is primarily about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Overall,
    Cleanliness,
    Communication,
    Location,
    Value,
    Accuracy,
    Checkin,
}

impl Category {
    /// Parse a canonical category name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overall" => Some(Category::Overall),
            "cleanliness" => Some(Category::Cleanliness),
            "communication" => Some(Category::Communication),
            "location" => Some(Category::Location),
            "value" => Some(Category::Value),
            "accuracy" => Some(Category::Accuracy),
            "checkin" => Some(Category::Checkin),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Overall => "overall",
            Category::Cleanliness => "cleanliness",
            Category::Communication => "communication",
            Category::Location => "location",
            Category::Value => "value",
            Category::Accuracy => "accuracy",
            Category::Checkin => "checkin",
        };
        write!(f, "{}", name)
    }
}

/// A guest review in canonical form, whatever source it came from.
///
/// Ratings are always on the 1-5 scale; per-source normalization converts
/// native scales before a review reaches the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub listing_id: String,
    pub listing_name: String,
    pub guest_name: String,
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
    pub channel: Channel,
    pub category: Category,
    pub is_approved: bool,
    pub is_displayed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_from_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Clamp an arbitrary numeric rating onto the canonical 1-5 scale.
pub fn clamp_rating(value: f64) -> u8 {
    value.clamp(1.0, 5.0) as u8
}

/// Inclusive date window for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Declarative filter over a review collection.
///
/// Every dimension must hold for a review to survive. Empty vecs and `None`
/// fields constrain nothing, so the default filter passes everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewFilter {
    pub rating: Vec<u8>,
    pub channel: Vec<Channel>,
    pub category: Vec<Category>,
    pub is_approved: Option<bool>,
    pub search_term: Option<String>,
    pub date_range: Option<DateRange>,
}

/// Moderation fields a dashboard update may touch. Absent fields are left
/// unchanged on the stored review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewUpdate {
    pub is_approved: Option<bool>,
    pub is_displayed: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub response_from_host: Option<String>,
}

impl ReviewUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_approved.is_none()
            && self.is_displayed.is_none()
            && self.tags.is_none()
            && self.response_from_host.is_none()
    }
}

/// Field a review collection can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    Rating,
    GuestName,
    ListingName,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(SortField::Date),
            "rating" => Some(SortField::Rating),
            "guestName" => Some(SortField::GuestName),
            "listingName" => Some(SortField::ListingName),
            _ => None,
        }
    }
}

impl Default for SortField {
    fn default() -> Self {
        SortField::Date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

/// One month's bucket in the trailing review trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// Calendar month in `YYYY-MM` form.
    pub month: String,
    pub count: usize,
    pub average_rating: f64,
}

/// Aggregate metrics over a review collection.
///
/// Always computed on whatever set the caller hands in, so stats reflect
/// the filtered view rather than the raw aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// Counts for each rating 1 through 5, zero-filled.
    pub rating_distribution: BTreeMap<u8, usize>,
    pub channel_breakdown: BTreeMap<Channel, usize>,
    pub category_averages: BTreeMap<Category, f64>,
    /// Ascending by month, at most the 12 most recent months present.
    pub monthly_trends: Vec<MonthlyTrend>,
}

/// What happened to one source during an aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub ok: bool,
    pub used_fallback: bool,
    pub fetched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged output of one aggregation pass across every configured source.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub reviews: Vec<Review>,
    /// True when any source failed or fell back to substitute data.
    pub degraded: bool,
    pub sources: Vec<SourceReport>,
}

/// A property to resolve against an external place index.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    pub listing_id: String,
    pub name: String,
    pub address: String,
}
