//! CSV export of a review collection
//!
//! Renders whatever set the caller hands in, so exports honor the same
//! filter and sort the dashboard was showing.

use anyhow::{anyhow, Result};
use chrono::SecondsFormat;

use crate::reviews::types::Review;

/// Column layout of the dashboard export.
const HEADERS: [&str; 9] = [
    "ID",
    "Guest Name",
    "Rating",
    "Comment",
    "Date",
    "Channel",
    "Category",
    "Approved",
    "Displayed",
];

/// Render reviews as CSV.
///
/// Standard CSV quoting: fields containing commas, quotes, or newlines are
/// wrapped in double quotes with embedded quotes doubled.
pub fn reviews_to_csv(reviews: &[Review]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for review in reviews {
        let rating = review.rating.to_string();
        let date = review.date.to_rfc3339_opts(SecondsFormat::Secs, true);
        let channel = review.channel.to_string();
        let category = review.category.to_string();
        let approved = review.is_approved.to_string();
        let displayed = review.is_displayed.to_string();

        writer.write_record([
            review.id.as_str(),
            review.guest_name.as_str(),
            rating.as_str(),
            review.comment.as_str(),
            date.as_str(),
            channel.as_str(),
            category.as_str(),
            approved.as_str(),
            displayed.as_str(),
        ])?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| anyhow!("finalizing csv output: {}", e))?;
    Ok(String::from_utf8(data)?)
}
