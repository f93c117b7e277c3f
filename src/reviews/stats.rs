//! Statistics engine: aggregate metrics over a review collection
//!
//! Callers hand in whatever set they want summarized; when stats should
//! describe a filtered view, filter first and compute here second.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::reviews::types::{Category, Channel, MonthlyTrend, Review, ReviewStats};

/// Months of history kept in the trailing trend.
const TREND_MONTHS: usize = 12;

/// Round to one decimal place, halves rounding up.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute dashboard statistics for a review collection.
///
/// Total on any input: an empty collection yields a valid all-zero stats
/// object with the rating histogram still zero-filled for 1 through 5.
pub fn compute_stats(reviews: &[Review]) -> ReviewStats {
    let mut rating_distribution: BTreeMap<u8, usize> = (1..=5).map(|r| (r, 0)).collect();

    if reviews.is_empty() {
        return ReviewStats {
            total_reviews: 0,
            average_rating: 0.0,
            rating_distribution,
            channel_breakdown: BTreeMap::new(),
            category_averages: BTreeMap::new(),
            monthly_trends: Vec::new(),
        };
    }

    let total_reviews = reviews.len();
    let rating_sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let average_rating = round_one_decimal(f64::from(rating_sum) / total_reviews as f64);

    let mut channel_breakdown: BTreeMap<Channel, usize> = BTreeMap::new();
    let mut category_sums: BTreeMap<Category, (u32, usize)> = BTreeMap::new();

    for review in reviews {
        // Canonical ratings are already 1-5; clamp again so a violated
        // invariant skews a bucket instead of losing the review.
        let bucket = review.rating.clamp(1, 5);
        *rating_distribution.entry(bucket).or_insert(0) += 1;

        *channel_breakdown.entry(review.channel).or_insert(0) += 1;

        let entry = category_sums.entry(review.category).or_insert((0, 0));
        entry.0 += u32::from(review.rating);
        entry.1 += 1;
    }

    let category_averages = category_sums
        .into_iter()
        .map(|(category, (sum, count))| {
            (category, round_one_decimal(f64::from(sum) / count as f64))
        })
        .collect();

    ReviewStats {
        total_reviews,
        average_rating,
        rating_distribution,
        channel_breakdown,
        category_averages,
        monthly_trends: monthly_trends(reviews),
    }
}

/// Bucket reviews by calendar month (`YYYY-MM`), ascending, keeping only
/// the most recent months present.
fn monthly_trends(reviews: &[Review]) -> Vec<MonthlyTrend> {
    let mut buckets: BTreeMap<String, (usize, u32)> = BTreeMap::new();

    for review in reviews {
        let key = format!("{:04}-{:02}", review.date.year(), review.date.month());
        let entry = buckets.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u32::from(review.rating);
    }

    let skip = buckets.len().saturating_sub(TREND_MONTHS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(month, (count, sum))| MonthlyTrend {
            month,
            count,
            average_rating: round_one_decimal(f64::from(sum) / count as f64),
        })
        .collect()
}
