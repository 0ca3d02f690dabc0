//! Handlers for `/api/heatmap`.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api::parse_id;
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult};
use crate::services::heat_map::{self, HeatMapReport, HourlyTrend, MarketLayout, TimeRange};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatMapQuery {
    pub time_range: Option<String>,
    pub hour: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendsQuery {
    pub hours: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    pub success: bool,
    pub data: Vec<HourlyTrend>,
    pub vendor_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LayoutResponse {
    pub success: bool,
    pub data: MarketLayout,
}

/// An empty `hour` means no hour filter.
fn parse_hour(raw: Option<&str>) -> ApiResult<Option<u8>> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u8>()
            .ok()
            .filter(|hour| *hour <= 23)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("hour must be an integer between 0 and 23")),
    }
}

pub async fn heat_map_data(
    State(state): State<AppState>,
    _caller: AuthUser,
    query: Result<Query<HeatMapQuery>, QueryRejection>,
) -> ApiResult<Json<HeatMapReport>> {
    let Query(query) = query?;
    let range = TimeRange::parse(query.time_range.as_deref());
    let hour = parse_hour(query.hour.as_deref())?;

    let report = heat_map::heat_map(
        state.store.as_ref(),
        range,
        hour,
        state.config.heatmap.max_expected_customers,
        Utc::now(),
    )
    .await?;
    Ok(Json(report))
}

pub async fn traffic_trends(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(vendor_id): Path<String>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> ApiResult<Json<TrendsResponse>> {
    let vendor_id = parse_id(&vendor_id)?;
    let Query(query) = query?;
    let hours = heat_map::trend_window_hours(query.hours.as_deref());

    let data = heat_map::vendor_trends(state.store.as_ref(), vendor_id, hours, Utc::now()).await?;
    debug!(%vendor_id, hours, buckets = data.len(), "computed traffic trends");
    Ok(Json(TrendsResponse {
        success: true,
        data,
        vendor_id,
    }))
}

pub async fn market_layout(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> ApiResult<Json<LayoutResponse>> {
    let vendors = state.store.list_vendors(true).await?;
    Ok(Json(LayoutResponse {
        success: true,
        data: heat_map::market_layout(&vendors),
    }))
}
