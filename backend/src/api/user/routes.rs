//! Routes for user profiles and account management, nested under `/api/users`.

use axum::{
    routing::{get, put},
    Router,
};

use super::handlers::{
    delete_user, get_profile_picture, list_users, update_company, update_graphs,
    update_profile, upload_profile_picture,
};
use crate::state::AppState;

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/profilepicture", put(upload_profile_picture))
        .route("/profilepicture/:user_id", get(get_profile_picture))
        .route("/:id", put(update_profile).delete(delete_user))
        .route("/:id/company", put(update_company))
        .route("/:id/graphs", put(update_graphs))
}
