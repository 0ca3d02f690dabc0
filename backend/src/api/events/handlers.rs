//! Handlers for `/api/events`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use market_store::{Event, NewEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{parse_date, require_date};
use crate::auth::{non_blank, AuthUser};
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

/// Dates on the chart read `M/D/YYYY`.
const CHART_DATE_FORMAT: &str = "%-m/%-d/%Y";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPoint {
    pub date: String,
    pub attendees: u32,
    pub event_name: String,
    pub description: Option<String>,
}

impl From<Event> for EventPoint {
    fn from(event: Event) -> Self {
        Self {
            date: event.date.format(CHART_DATE_FORMAT).to_string(),
            attendees: event.attendees,
            event_name: event.name,
            description: event.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsEnvelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: Option<String>,
    pub date: Option<String>,
    pub attendees: Option<u32>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub market_id: Option<Uuid>,
}

/// Events newest first. The range is read, and applies, only when both ends
/// are given.
pub async fn event_chart_data(
    State(state): State<AppState>,
    _caller: AuthUser,
    query: Result<Query<EventRangeQuery>, QueryRejection>,
) -> ApiResult<Json<EventsEnvelope<Vec<EventPoint>>>> {
    let Query(query) = query?;
    let (from, to) = match (non_blank(query.start_date), non_blank(query.end_date)) {
        (Some(start), Some(end)) => {
            let parse = |field: &str, raw: &str| {
                parse_date(raw)
                    .ok_or_else(|| ApiError::bad_request(format!("{field} is not a valid date")))
            };
            (Some(parse("startDate", &start)?), Some(parse("endDate", &end)?))
        }
        _ => (None, None),
    };

    let events = state.store.list_events(from, to).await?;
    debug!(count = events.len(), ?from, ?to, "listing events");
    Ok(Json(EventsEnvelope {
        success: true,
        data: events.into_iter().map(EventPoint::from).collect(),
    }))
}

pub async fn create_event(
    State(state): State<AppState>,
    _caller: AuthUser,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EventsEnvelope<Event>>)> {
    let Json(request) = payload?;
    let name = non_blank(request.name).ok_or_else(|| ApiError::bad_request("name is required"))?;
    let date = require_date("date", request.date.as_deref())?;

    let event = state
        .store
        .create_event(NewEvent {
            name,
            date,
            attendees: request.attendees.unwrap_or(0),
            description: request.description,
            location: request.location,
            market_id: request.market_id,
        })
        .await?;
    info!(event_id = %event.id, name = %event.name, "event created");
    Ok((
        StatusCode::CREATED,
        Json(EventsEnvelope {
            success: true,
            data: event,
        }),
    ))
}
