use axum::{routing::get, Router};

use super::handlers::{create_event_data, list_event_data};
use crate::state::AppState;

pub fn event_data_router() -> Router<AppState> {
    Router::new().route("/", get(list_event_data).post(create_event_data))
}
