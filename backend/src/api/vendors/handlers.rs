//! Handlers for `/api/vendors`.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use market_store::{NewVendor, Role, Vendor};
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

const VENDOR_MANAGERS: [Role; 3] = [Role::Admin, Role::MarketManager, Role::SuperAdmin];

/// Active vendors in the order they were added.
pub async fn list_vendors(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> ApiResult<Json<Vec<Vendor>>> {
    let vendors = state.store.list_vendors(true).await?;
    debug!(count = vendors.len(), "listing vendors");
    Ok(Json(vendors))
}

pub async fn create_vendor(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<NewVendor>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vendor>)> {
    caller.require_role(&VENDOR_MANAGERS)?;
    let Json(mut vendor) = payload?;

    vendor.name = vendor.name.trim().to_string();
    vendor.booth_number = vendor.booth_number.trim().to_string();
    if vendor.name.is_empty() || vendor.booth_number.is_empty() {
        return Err(ApiError::bad_request("name and boothNumber are required"));
    }

    let vendor = state.store.create_vendor(vendor).await?;
    info!(vendor_id = %vendor.id, booth = %vendor.booth_number, "vendor created");
    Ok((StatusCode::CREATED, Json(vendor)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::test_support::{request, send, TestApp};

    #[tokio::test]
    async fn only_managers_add_vendors() {
        let app = TestApp::new();
        let (_, vendor_token) = app.user("Vendor", "vendor@example.com", Role::Vendor).await;
        let (_, manager_token) = app
            .user("Manager", "manager@example.com", Role::MarketManager)
            .await;
        let body = json!({ "name": "Honey Hive", "category": "honey", "boothNumber": "C3" });

        let response = send(
            &app.router,
            request(Method::POST, "/api/vendors", Some(&vendor_token), Some(body.clone())),
        )
        .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/vendors",
                Some(&manager_token),
                Some(json!({ "name": " ", "category": "honey", "boothNumber": "C3" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "name and boothNumber are required");

        let response = send(
            &app.router,
            request(
                Method::POST,
                "/api/vendors",
                Some(&manager_token),
                Some(json!({ "name": "Honey Hive", "category": "jewelry", "boothNumber": "C3" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = send(
            &app.router,
            request(Method::POST, "/api/vendors", Some(&manager_token), Some(body)),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let vendor = response.json();
        assert_eq!(vendor["boothNumber"], "C3");
        assert_eq!(vendor["isActive"], true);
    }

    #[tokio::test]
    async fn listing_skips_inactive_vendors() {
        let app = TestApp::new();
        let (_, token) = app.user("Vendor", "vendor@example.com", Role::Vendor).await;
        app.vendor("Fresh Farms", "A1", true).await;
        app.vendor("Closed Stall", "A2", false).await;
        app.vendor("Bread Box", "A3", true).await;

        let response = send(&app.router, request(Method::GET, "/api/vendors", Some(&token), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        let names: Vec<_> = response
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|vendor| vendor["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Fresh Farms", "Bread Box"]);
    }
}
