//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for the API domains (users,
//! traffic, event counts, events, vendors and the heat map), excluding the
//! authentication routes which are handled by [`crate::auth`].

pub mod event_data;
pub mod events;
pub mod heatmap;
pub mod traffic;
pub mod user;
pub mod vendors;

use axum::Router;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/users", user::routes::user_router())
        .nest("/traffic", traffic::routes::traffic_router())
        .nest("/eventData", event_data::routes::event_data_router())
        .nest("/events", events::routes::events_router())
        .nest("/vendors", vendors::routes::vendors_router())
        .nest("/heatmap", heatmap::routes::heatmap_router())
}

/// Parses a document id taken from the path.
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid id"))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Like [`parse_date`], failing with a 400 that names `field`.
pub fn require_date(field: &str, raw: Option<&str>) -> ApiResult<DateTime<Utc>> {
    let raw = raw
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))?;
    parse_date(raw).ok_or_else(|| ApiError::bad_request(format!("{field} is not a valid date")))
}
