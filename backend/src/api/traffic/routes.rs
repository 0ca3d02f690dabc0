use axum::{routing::get, Router};

use super::handlers::{create_traffic, list_traffic};
use crate::state::AppState;

pub fn traffic_router() -> Router<AppState> {
    Router::new().route("/", get(list_traffic).post(create_traffic))
}
