use axum::{routing::get, Router};

use super::handlers::{heat_map_data, market_layout, traffic_trends};
use crate::state::AppState;

pub fn heatmap_router() -> Router<AppState> {
    Router::new()
        .route("/data", get(heat_map_data))
        .route("/trends/:vendor_id", get(traffic_trends))
        .route("/layout", get(market_layout))
}
