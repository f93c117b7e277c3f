//! Review export orchestrator - aggregates all sources and writes the dashboard CSV

use std::env;

use anyhow::{Context, Result};
use chrono::Utc;
use guest_reviews_backend::config::Config;
use guest_reviews_backend::reviews::export;
use guest_reviews_backend::reviews::service::{build_sources, ReviewService};
use guest_reviews_backend::reviews::types::{ReviewFilter, SortDirection, SortField};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting review export");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!("Configuration loaded");

    let output_path = env::args()
        .nth(1)
        .unwrap_or_else(|| format!("reviews-export-{}.csv", Utc::now().format("%Y-%m-%d")));

    let approved_only = env::var("EXPORT_APPROVED_ONLY")
        .map(|value| value == "true")
        .unwrap_or(false);

    let mut filter = ReviewFilter::default();
    if approved_only {
        info!("Exporting approved reviews only");
        filter.is_approved = Some(true);
    }

    // Step 1: Aggregate reviews from every configured source
    info!("Step 1/3: Aggregating reviews...");
    let source_set = build_sources(&config)?;
    let service = ReviewService::new(source_set.sources);
    let result = service
        .get_aggregated_reviews(&filter, SortField::Date, SortDirection::Desc, true)
        .await;

    if result.degraded {
        for report in &result.sources {
            if !report.ok {
                warn!(
                    "✗ {} failed: {}",
                    report.source,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            } else if report.used_fallback {
                warn!("✗ {} returned nothing; seed reviews substituted", report.source);
            }
        }
    }
    info!(
        "✓ Aggregated {} reviews ({} before filtering)",
        result.total, result.original_total
    );

    // Step 2: Render CSV
    info!("Step 2/3: Rendering CSV...");
    let csv = export::reviews_to_csv(&result.reviews)?;
    info!("✓ Rendered {} rows", result.reviews.len());

    // Step 3: Write to disk
    info!("Step 3/3: Writing output file...");
    std::fs::write(&output_path, &csv).with_context(|| format!("writing {}", output_path))?;
    info!("✓ Export complete: {}", output_path);

    Ok(())
}
