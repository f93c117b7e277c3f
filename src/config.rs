//! Application configuration loaded from the environment
//!
//! Shared by the API server and the export binary. Everything has a local
//! development default except the upstream credentials; with no Hostaway
//! key the fetch fails over to seed data, which is fine for development.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hostaway_base_url: String,
    pub hostaway_account_id: String,
    pub hostaway_api_key: String,
    /// Absent or empty means the Google Places source is disabled.
    pub google_maps_api_key: Option<String>,
    /// Request timeout applied to upstream source fetches.
    pub source_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            hostaway_base_url: env::var("HOSTAWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.hostaway.com/v1".to_string()),
            hostaway_account_id: env::var("HOSTAWAY_ACCOUNT_ID")
                .unwrap_or_else(|_| "61148".to_string()),
            hostaway_api_key: env::var("HOSTAWAY_API_KEY").unwrap_or_default(),
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            source_timeout: Duration::from_secs(
                env::var("SOURCE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .context("SOURCE_TIMEOUT_SECS must be a number of seconds")?,
            ),
        })
    }
}
