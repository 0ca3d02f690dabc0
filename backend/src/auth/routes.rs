//! HTTP routes for authentication, nested under `/api/auth`.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{login, me, register};
use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}
