//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse the request bodies and hand them to
//! [`AuthService`](super::AuthService) for the registration and login flows.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use super::middleware::AuthUser;
use super::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::api::user::UserProfile;
use crate::errors::ApiResult;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(request) = payload?;
    let response = state.auth.register(state.store.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(request) = payload?;
    let response = state.auth.login(state.store.as_ref(), request).await?;
    Ok(Json(response))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}
