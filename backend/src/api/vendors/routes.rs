use axum::{routing::get, Router};

use super::handlers::{create_vendor, list_vendors};
use crate::state::AppState;

pub fn vendors_router() -> Router<AppState> {
    Router::new().route("/", get(list_vendors).post(create_vendor))
}
