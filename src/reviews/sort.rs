//! Sort engine: presentation ordering of a review collection

use std::cmp::Ordering;

use crate::reviews::types::{Review, SortDirection, SortField};

/// Return a copy of `reviews` ordered by `field` in `direction`.
///
/// The sort is stable, so reviews with equal keys keep their relative
/// input order. Name comparisons are case-insensitive.
pub fn sort_reviews(reviews: &[Review], field: SortField, direction: SortDirection) -> Vec<Review> {
    let mut sorted = reviews.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare(a, b, field);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    sorted
}

fn compare(a: &Review, b: &Review, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Rating => a.rating.cmp(&b.rating),
        SortField::GuestName => a.guest_name.to_lowercase().cmp(&b.guest_name.to_lowercase()),
        SortField::ListingName => a
            .listing_name
            .to_lowercase()
            .cmp(&b.listing_name.to_lowercase()),
    }
}
