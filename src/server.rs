//! HTTP layer: axum router, handlers, and error mapping
//!
//! Aggregation endpoints always answer 200 with best-effort data; upstream
//! trouble is reported inside the payload (`degraded`, per-source reports)
//! rather than as a failure. Only bad requests and missing ids error.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::reviews::google::GoogleReviewsSource;
use crate::reviews::seed;
use crate::reviews::service::ReviewService;
use crate::reviews::types::{
    Category, Channel, DateRange, PropertyRef, ReviewFilter, ReviewUpdate, SortDirection,
    SortField,
};

/// Fields a PATCH may touch; anything else is rejected by name.
const ALLOWED_UPDATE_FIELDS: [&str; 4] = ["isApproved", "isDisplayed", "tags", "responseFromHost"];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReviewService>,
    /// Present only when a Places API key is configured.
    pub google: Option<Arc<GoogleReviewsSource>>,
}

#[derive(Serialize, Deserialize)]
struct ApiResponse {
    message: String,
    status: String,
}

/// Request-level failures. Everything else in the pipeline degrades
/// gracefully instead of erroring.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                // Never leak internals to clients
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

/// Query parameters of the reviews endpoints. Multi-value dimensions are
/// comma-separated; everything arrives as a string and is parsed strictly,
/// so a malformed value gets a 400 naming the parameter instead of being
/// silently dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewsQuery {
    rating: Option<String>,
    channel: Option<String>,
    category: Option<String>,
    is_approved: Option<String>,
    search_term: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    sort_by: Option<String>,
    sort_direction: Option<String>,
    refresh: Option<String>,
}

struct ParsedQuery {
    filter: ReviewFilter,
    field: SortField,
    direction: SortDirection,
    refresh: bool,
}

fn split_csv(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn bad_param(name: &str, value: &str) -> ApiError {
    ApiError::InvalidRequest(format!("invalid {} value: {}", name, value))
}

fn parse_date_param(name: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(ApiError::InvalidRequest(format!(
        "invalid {} value: {} (expected RFC 3339 or YYYY-MM-DD)",
        name, value
    )))
}

fn parse_filter(query: &ReviewsQuery) -> Result<ReviewFilter, ApiError> {
    let mut filter = ReviewFilter::default();

    if let Some(raw) = query.rating.as_deref() {
        filter.rating = split_csv(raw)
            .map(|value| value.parse::<u8>().map_err(|_| bad_param("rating", value)))
            .collect::<Result<_, _>>()?;
    }
    if let Some(raw) = query.channel.as_deref() {
        filter.channel = split_csv(raw)
            .map(|value| Channel::parse(value).ok_or_else(|| bad_param("channel", value)))
            .collect::<Result<_, _>>()?;
    }
    if let Some(raw) = query.category.as_deref() {
        filter.category = split_csv(raw)
            .map(|value| Category::parse(value).ok_or_else(|| bad_param("category", value)))
            .collect::<Result<_, _>>()?;
    }
    if let Some(raw) = query.is_approved.as_deref() {
        filter.is_approved = Some(match raw {
            "true" => true,
            "false" => false,
            other => return Err(bad_param("isApproved", other)),
        });
    }

    filter.search_term = query.search_term.clone().filter(|term| !term.is_empty());

    filter.date_range = match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(start), Some(end)) => Some(DateRange {
            start: parse_date_param("startDate", start)?,
            end: parse_date_param("endDate", end)?,
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::InvalidRequest(
                "startDate and endDate must be supplied together".to_string(),
            ))
        }
    };

    Ok(filter)
}

fn parse_query(query: &ReviewsQuery) -> Result<ParsedQuery, ApiError> {
    let filter = parse_filter(query)?;

    let field = match query.sort_by.as_deref() {
        Some(raw) => SortField::parse(raw).ok_or_else(|| bad_param("sortBy", raw))?,
        None => SortField::default(),
    };
    let direction = match query.sort_direction.as_deref() {
        Some(raw) => SortDirection::parse(raw).ok_or_else(|| bad_param("sortDirection", raw))?,
        None => SortDirection::default(),
    };
    let refresh = query.refresh.as_deref() == Some("true");

    Ok(ParsedQuery {
        filter,
        field,
        direction,
        refresh,
    })
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Guest Reviews API is running!".to_string(),
        status: "ok".to_string(),
    })
}

/// GET /api/reviews - the aggregated, filtered, sorted collection with
/// stats over the filtered set.
async fn get_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let parsed = parse_query(&query)?;
    let result = state
        .service
        .get_aggregated_reviews(&parsed.filter, parsed.field, parsed.direction, parsed.refresh)
        .await;

    Ok(Json(json!({
        "success": true,
        "data": result,
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
            "filters": parsed.filter,
            "apiVersion": "1.0",
        },
    })))
}

/// Validate a moderation body against the allow-list and decode it. A
/// field outside the list rejects the whole request, naming the field.
fn parse_update_body(body: &serde_json::Value) -> Result<ReviewUpdate, ApiError> {
    let map = body.as_object().ok_or_else(|| {
        ApiError::InvalidRequest("request body must be a JSON object".to_string())
    })?;

    let rejected: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !ALLOWED_UPDATE_FIELDS.contains(key))
        .collect();
    if !rejected.is_empty() {
        return Err(ApiError::InvalidRequest(format!(
            "unsupported update fields: {}",
            rejected.join(", ")
        )));
    }

    let update: ReviewUpdate = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid update payload: {}", e)))?;
    if update.is_empty() {
        return Err(ApiError::InvalidRequest(
            "no valid update fields provided".to_string(),
        ));
    }

    Ok(update)
}

/// PATCH /api/reviews/{id} - moderation update through the allow-list.
async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let update = parse_update_body(&body)?;

    let review = state
        .service
        .update_review(&review_id, &update)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("review {} not found", review_id)))?;

    Ok(Json(json!({
        "success": true,
        "data": review,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// POST /api/reviews/test-connection - probe every configured source.
async fn test_connection(State(state): State<AppState>) -> Json<serde_json::Value> {
    let results = state.service.test_connectivity().await;
    let all_ok = results.iter().all(|health| health.ok);

    Json(json!({
        "success": all_ok,
        "data": results,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/reviews/export.csv - the filtered, sorted set as a CSV
/// attachment, same query grammar as the listing endpoint.
async fn export_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Response, ApiError> {
    let parsed = parse_query(&query)?;
    let result = state
        .service
        .get_aggregated_reviews(&parsed.filter, parsed.field, parsed.direction, parsed.refresh)
        .await;

    let csv = crate::reviews::export::reviews_to_csv(&result.reviews)?;
    let disposition = format!(
        "attachment; filename=\"reviews-export-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GoogleQuery {
    property_id: Option<String>,
}

/// GET /api/reviews/google - configuration report, or one property's
/// reviews straight from the secondary source.
async fn google_reviews(
    State(state): State<AppState>,
    Query(query): Query<GoogleQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = match &state.google {
        Some(source) => source,
        None => {
            return Ok(Json(json!({
                "success": false,
                "error": "Google Places API not configured",
                "configuration": { "isConfigured": false },
            })))
        }
    };

    let property_id = match query.property_id {
        Some(property_id) => property_id,
        None => {
            return Ok(Json(json!({
                "success": true,
                "configuration": {
                    "isConfigured": true,
                    "properties": seed::SEED_PROPERTIES.len(),
                },
                "message": "Google Places API is configured and ready to use",
            })))
        }
    };

    let property = seed::SEED_PROPERTIES
        .iter()
        .find(|p| p.id == property_id)
        .ok_or_else(|| ApiError::NotFound(format!("property {} not found", property_id)))?;

    let reviews = source
        .reviews_for_property(&PropertyRef::from(property))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("google lookup failed: {}", e)))?;
    let count = reviews.len();

    Ok(Json(json!({
        "success": true,
        "data": {
            "property": {
                "id": property.id,
                "name": property.name,
                "address": property.address,
                "city": property.city,
            },
            "reviews": reviews,
            "count": count,
        },
        "configuration": { "isConfigured": true },
    })))
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/reviews", get(get_reviews))
        .route("/api/reviews/test-connection", post(test_connection))
        .route("/api/reviews/export.csv", get(export_reviews))
        .route("/api/reviews/google", get(google_reviews))
        .route("/api/reviews/:id", patch(update_review))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_comma_separated_dimensions() {
        let query = ReviewsQuery {
            rating: Some("4,5".to_string()),
            channel: Some("airbnb, direct".to_string()),
            category: Some("overall".to_string()),
            ..Default::default()
        };

        let filter = parse_filter(&query).unwrap();
        assert_eq!(filter.rating, vec![4, 5]);
        assert_eq!(filter.channel, vec![Channel::Airbnb, Channel::Direct]);
        assert_eq!(filter.category, vec![Category::Overall]);
    }

    #[test]
    fn invalid_rating_value_names_the_parameter() {
        let query = ReviewsQuery {
            rating: Some("4,high".to_string()),
            ..Default::default()
        };

        let err = parse_filter(&query).unwrap_err();
        match err {
            ApiError::InvalidRequest(msg) => {
                assert!(msg.contains("rating"));
                assert!(msg.contains("high"));
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn invalid_channel_is_rejected_not_ignored() {
        let query = ReviewsQuery {
            channel: Some("expedia".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filter(&query),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn approval_param_accepts_only_true_and_false() {
        let truthy = ReviewsQuery {
            is_approved: Some("true".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_filter(&truthy).unwrap().is_approved, Some(true));

        let falsy = ReviewsQuery {
            is_approved: Some("false".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_filter(&falsy).unwrap().is_approved, Some(false));

        let junk = ReviewsQuery {
            is_approved: Some("yes".to_string()),
            ..Default::default()
        };
        assert!(parse_filter(&junk).is_err());
    }

    #[test]
    fn bare_dates_become_utc_midnight() {
        let parsed = parse_date_param("startDate", "2024-01-15").unwrap();
        assert_eq!(
            parsed,
            "2024-01-15T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn rfc3339_dates_pass_through() {
        let parsed = parse_date_param("startDate", "2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(
            parsed,
            "2024-01-15T08:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(parse_date_param("startDate", "January 5th").is_err());
    }

    #[test]
    fn half_open_date_range_is_rejected() {
        let query = ReviewsQuery {
            start_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filter(&query),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn full_date_range_parses_inclusively() {
        let query = ReviewsQuery {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-31".to_string()),
            ..Default::default()
        };

        let range = parse_filter(&query).unwrap().date_range.unwrap();
        assert_eq!(
            range.start,
            "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(
            range.end,
            "2024-01-31T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn sort_defaults_to_date_desc() {
        let parsed = parse_query(&ReviewsQuery::default()).unwrap();
        assert_eq!(parsed.field, SortField::Date);
        assert_eq!(parsed.direction, SortDirection::Desc);
        assert!(!parsed.refresh);
    }

    #[test]
    fn sort_params_parse_and_reject_unknowns() {
        let query = ReviewsQuery {
            sort_by: Some("guestName".to_string()),
            sort_direction: Some("asc".to_string()),
            ..Default::default()
        };
        let parsed = parse_query(&query).unwrap();
        assert_eq!(parsed.field, SortField::GuestName);
        assert_eq!(parsed.direction, SortDirection::Asc);

        let unknown = ReviewsQuery {
            sort_by: Some("comment".to_string()),
            ..Default::default()
        };
        assert!(parse_query(&unknown).is_err());
    }

    #[test]
    fn refresh_requires_exact_true() {
        let query = ReviewsQuery {
            refresh: Some("true".to_string()),
            ..Default::default()
        };
        assert!(parse_query(&query).unwrap().refresh);

        let off = ReviewsQuery {
            refresh: Some("1".to_string()),
            ..Default::default()
        };
        assert!(!parse_query(&off).unwrap().refresh);
    }

    #[test]
    fn update_allow_list_matches_wire_names() {
        for field in ["isApproved", "isDisplayed", "tags", "responseFromHost"] {
            assert!(ALLOWED_UPDATE_FIELDS.contains(&field));
        }
        assert!(!ALLOWED_UPDATE_FIELDS.contains(&"rating"));
        assert!(!ALLOWED_UPDATE_FIELDS.contains(&"comment"));
    }

    #[test]
    fn update_body_outside_allow_list_names_the_field() {
        let body = json!({ "rating": 1, "isApproved": true });

        let err = parse_update_body(&body).unwrap_err();
        match err {
            ApiError::InvalidRequest(msg) => {
                assert!(msg.contains("rating"), "{}", msg);
                assert!(!msg.contains("isApproved"));
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn update_body_with_allowed_fields_decodes() {
        let body = json!({ "isApproved": false, "tags": ["vip"] });

        let update = parse_update_body(&body).unwrap();
        assert_eq!(update.is_approved, Some(false));
        assert_eq!(update.tags, Some(vec!["vip".to_string()]));
        assert!(update.is_displayed.is_none());
    }

    #[test]
    fn update_body_must_be_an_object_with_fields() {
        assert!(matches!(
            parse_update_body(&json!([1, 2])),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_update_body(&json!({})),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
