//! Handlers for `/api/eventData`.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use market_store::{EventData, NewEventData};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::require_date;
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateEventDataRequest {
    pub date: Option<String>,
    pub count: Option<i64>,
    pub location: Option<String>,
    pub weather: Option<String>,
}

pub async fn list_event_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<EventData>>> {
    let data = state.store.list_event_data(&user.company).await?;
    debug!(company = %user.company, count = data.len(), "listing event data");
    Ok(Json(data))
}

pub async fn create_event_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateEventDataRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EventData>)> {
    let Json(request) = payload?;
    let date = require_date("date", request.date.as_deref())?;
    let count = request
        .count
        .ok_or_else(|| ApiError::bad_request("count is required"))?;

    let data = state
        .store
        .create_event_data(NewEventData {
            company: Some(user.company.clone()),
            date,
            count,
            location: request.location,
            weather: request.weather,
        })
        .await?;
    info!(id = %data.id, company = %user.company, count, "event data recorded");
    Ok((StatusCode::CREATED, Json(data)))
}
