//! Handlers for `/api/traffic`.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::{Datelike, Timelike, Utc};
use market_store::{MarketDay, NewTrafficRecord, Sales, TrafficFilter, TrafficRecord, Weather};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{parse_date, parse_id};
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrafficRequest {
    pub vendor_id: Option<String>,
    pub timestamp: Option<String>,
    pub customer_count: Option<u32>,
    pub dwell_time: Option<f64>,
    pub weather: Option<Weather>,
    pub day_of_week: Option<String>,
    pub hour_of_day: Option<u8>,
    pub sales: Option<Sales>,
}

pub async fn list_traffic(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<TrafficRecord>>> {
    let records = state
        .store
        .list_traffic(TrafficFilter {
            company: Some(user.company.clone()),
            ..TrafficFilter::default()
        })
        .await?;
    debug!(company = %user.company, count = records.len(), "listing traffic");
    Ok(Json(records))
}

/// Records traffic for the caller's company. The hour and weekday default to
/// those of the timestamp, which defaults to now.
pub async fn create_traffic(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTrafficRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TrafficRecord>)> {
    let Json(request) = payload?;

    let vendor_id = request
        .vendor_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("vendorId is required"))
        .and_then(parse_id)?;
    if state.store.find_vendor(vendor_id).await?.is_none() {
        return Err(ApiError::bad_request(format!("Vendor {vendor_id} does not exist")));
    }

    let timestamp = match request.timestamp.as_deref() {
        Some(raw) => parse_date(raw)
            .ok_or_else(|| ApiError::bad_request("timestamp is not a valid date"))?,
        None => Utc::now(),
    };
    if let Some(hour) = request.hour_of_day {
        if hour > 23 {
            return Err(ApiError::bad_request("hourOfDay must be between 0 and 23"));
        }
    }
    let dwell_time = request.dwell_time.unwrap_or(0.0);
    if !dwell_time.is_finite() || dwell_time < 0.0 {
        return Err(ApiError::bad_request("dwellTime must be a non-negative number"));
    }

    let record = state
        .store
        .insert_traffic(NewTrafficRecord {
            vendor_id,
            company: user.company.clone(),
            timestamp,
            customer_count: request.customer_count.unwrap_or(0),
            dwell_time,
            weather: request.weather,
            day_of_week: Some(
                request
                    .day_of_week
                    .unwrap_or_else(|| MarketDay::from(timestamp.weekday()).as_str().to_string()),
            ),
            hour_of_day: Some(request.hour_of_day.unwrap_or(timestamp.hour() as u8)),
            sales: request.sales,
        })
        .await?;
    info!(record_id = %record.id, %vendor_id, company = %record.company, "traffic recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use market_store::Role;
    use serde_json::json;

    use crate::test_support::{request, send, TestApp};

    #[tokio::test]
    async fn records_are_validated_and_derived_from_the_timestamp() {
        let app = TestApp::new();
        let (_, token) = app.user("Vendor", "vendor@example.com", Role::Vendor).await;
        let vendor = app.vendor("Fresh Farms", "A1", true).await;

        let post = |body| request(Method::POST, "/api/traffic", Some(&token), Some(body));

        let response = send(&app.router, post(json!({ "customerCount": 4 }))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "vendorId is required");

        let unknown = uuid::Uuid::new_v4();
        let response = send(&app.router, post(json!({ "vendorId": unknown }))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], format!("Vendor {unknown} does not exist"));

        let response = send(
            &app.router,
            post(json!({ "vendorId": vendor.id, "hourOfDay": 24 })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = send(
            &app.router,
            post(json!({ "vendorId": vendor.id, "dwellTime": -1.0 })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = send(
            &app.router,
            post(json!({ "vendorId": vendor.id, "timestamp": "2024-06-15T10:30:00Z", "dwellTime": 120.0 })),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let record = response.json();
        assert_eq!(record["vendorId"], vendor.id.to_string());
        assert_eq!(record["company"], "Company A");
        assert_eq!(record["customerCount"], 0);
        assert_eq!(record["hourOfDay"], 10);
        assert_eq!(record["dayOfWeek"], "saturday");
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_callers_company() {
        let app = TestApp::new();
        let (_, token_a) = app.user("A", "a@example.com", Role::Vendor).await;
        let (_, token_b) = app
            .user_in("B", "b@example.com", Role::Vendor, "Company B")
            .await;
        let vendor = app.vendor("Fresh Farms", "A1", true).await;

        for token in [&token_a, &token_b, &token_b] {
            let response = send(
                &app.router,
                request(
                    Method::POST,
                    "/api/traffic",
                    Some(token),
                    Some(json!({ "vendorId": vendor.id, "customerCount": 10 })),
                ),
            )
            .await;
            assert_eq!(response.status, StatusCode::CREATED);
        }

        let response = send(&app.router, request(Method::GET, "/api/traffic", Some(&token_a), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().as_array().unwrap().len(), 1);

        let response = send(&app.router, request(Method::GET, "/api/traffic", Some(&token_b), None)).await;
        let records = response.json();
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert!(records
            .as_array()
            .unwrap()
            .iter()
            .all(|record| record["company"] == "Company B"));

        let response = send(&app.router, request(Method::GET, "/api/traffic", None, None)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
