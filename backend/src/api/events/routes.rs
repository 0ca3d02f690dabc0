use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_event, event_chart_data};
use crate::state::AppState;

pub fn events_router() -> Router<AppState> {
    Router::new()
        .route("/data", get(event_chart_data))
        .route("/", post(create_event))
}
