//! Farmers market analytics backend.
//!
//! An axum service that records vendor traffic and market events, aggregates
//! them for the dashboard's charts and heat map, and manages the accounts
//! allowed to see them. Persistence goes through the [`market_store`] crate.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{error, info};

pub use config::Config;
pub use errors::{ApiError, AppError};
pub use logging::{init_logging, Verbosity};
pub use state::AppState;

async fn root_handler() -> &'static str {
    "Welcome to Farmers Market Analytics!"
}

async fn api_status() -> Json<Value> {
    Json(json!({ "message": "Farmers Market Analytics API is running!" }))
}

/// The complete application router with every layer applied.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.uploads.max_profile_picture_bytes;
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/api/test", get(api_status))
        .nest("/api/auth", auth::auth_router())
        .nest("/api", api::api_router())
        .with_state(state);
    middleware::with_http_layers(router, max_upload)
}

/// Opens the store, binds the listener and serves until a shutdown signal.
pub async fn start_server(config: Config) -> Result<(), AppError> {
    let store = database::open_store(&config.database)?;
    let address = config.bind_address();
    let state = AppState::new(config, store)?;
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{request, send, TestApp};

    #[tokio::test]
    async fn root_and_status_routes_are_public() {
        let app = TestApp::new();

        let response = send(&app.router, request(Method::GET, "/", None, None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "Welcome to Farmers Market Analytics!");

        let response = send(&app.router, request(Method::GET, "/api/test", None, None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json()["message"],
            "Farmers Market Analytics API is running!"
        );
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let app = TestApp::new();

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Vendor A1",
                    "email": "VendorA1@example.com",
                    "password": "password123",
                    "company": "Company A"
                })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let body = response.json();
        assert_eq!(body["email"], "vendora1@example.com");
        assert_eq!(body["role"], "vendor");
        assert_eq!(body["company"], "Company A");
        assert!(body["token"].as_str().is_some());

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "vendora1@example.com", "password": "password123" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        let login = response.json();
        assert_eq!(login["_id"], body["_id"]);
        let token = login["token"].as_str().unwrap().to_string();

        let response = send(
            &app.router,
            request(Method::GET, "/api/auth/me", Some(&token), None),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        let me = response.json();
        assert_eq!(me["name"], "Vendor A1");
        assert_eq!(me["profilePicture"], serde_json::Value::Null);
        assert_eq!(me["enabledGraphs"]["heatMap"], true);
    }

    #[tokio::test]
    async fn auth_failures_use_expected_messages() {
        let app = TestApp::new();

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "ghost@example.com", "password": "x" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["message"], "Invalid credentials");

        let response = send(&app.router, request(Method::GET, "/api/auth/me", None, None)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["message"], "Not authorized, no token");

        let response = send(
            &app.router,
            request(Method::GET, "/api/auth/me", Some("garbage"), None),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["message"], "Not authorized, token failed");

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": "x@example.com" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "Invalid user data");
    }

    #[tokio::test]
    async fn deleted_users_lose_access() {
        let app = TestApp::new();
        let (user, token) = app.user("Gone", "gone@example.com", market_store::Role::Vendor).await;
        app.state.store.delete_user(user.id).await.unwrap();

        let response = send(
            &app.router,
            request(Method::GET, "/api/auth/me", Some(&token), None),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["message"], "Not authorized, token failed");
    }
}
