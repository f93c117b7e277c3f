//! Filter engine: declarative narrowing of a review collection
//!
//! Pure functions over slices. All dimensions AND together; survivors keep
//! their input order, so filtering commutes with nothing and surprises
//! nobody.

use crate::reviews::types::{Review, ReviewFilter};

/// Apply `filter` to `reviews`, keeping survivors in their original order.
///
/// Empty vecs and unset fields constrain nothing, so the default filter
/// returns the input unchanged.
pub fn apply_filters(reviews: &[Review], filter: &ReviewFilter) -> Vec<Review> {
    reviews
        .iter()
        .filter(|review| matches(review, filter))
        .cloned()
        .collect()
}

fn matches(review: &Review, filter: &ReviewFilter) -> bool {
    if !filter.rating.is_empty() && !filter.rating.contains(&review.rating) {
        return false;
    }
    if !filter.channel.is_empty() && !filter.channel.contains(&review.channel) {
        return false;
    }
    if !filter.category.is_empty() && !filter.category.contains(&review.category) {
        return false;
    }
    if let Some(approved) = filter.is_approved {
        if review.is_approved != approved {
            return false;
        }
    }
    if let Some(term) = filter.search_term.as_deref() {
        if !term.is_empty() && !searchable_text(review).contains(&term.to_lowercase()) {
            return false;
        }
    }
    if let Some(range) = &filter.date_range {
        if review.date < range.start || review.date > range.end {
            return false;
        }
    }
    true
}

/// Lowercased haystack for free-text search: guest name, comment, listing
/// name, and tags, joined by spaces.
fn searchable_text(review: &Review) -> String {
    let mut parts = vec![
        review.guest_name.as_str(),
        review.comment.as_str(),
        review.listing_name.as_str(),
    ];
    parts.extend(review.tags.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}
