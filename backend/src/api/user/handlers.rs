//! Handler functions for user profile and management API endpoints.
//!
//! Profile edits follow two rules: a caller may edit their own name and email,
//! and a super admin may edit any account including its role and company. The
//! administration endpoints (listing, deleting, company and chart settings)
//! are open to admins and super admins.

use std::path::Path as FsPath;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Json,
};
use market_store::{ProfilePicture, Role, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::UserProfile;
use crate::api::parse_id;
use crate::auth::{non_blank, normalize_email, AuthUser};
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

const PICTURE_FIELD: &str = "profilePicture";
const ADMIN_ROLES: [Role; 2] = [Role::Admin, Role::SuperAdmin];
const IMAGE_TYPES: [&str; 3] = ["jpeg", "jpg", "png"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureUploaded {
    pub message: &'static str,
    pub profile_picture: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub company: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    pub company: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGraphsRequest {
    pub enabled_graphs: Option<Value>,
}

/// Flags left out keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphsPatch {
    traffic_chart: Option<bool>,
    weather_chart: Option<bool>,
    event_chart: Option<bool>,
    heat_map: Option<bool>,
}

fn is_allowed_image(file_name: &str, content_type: &str) -> bool {
    let extension = FsPath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let extension_ok = extension.is_some_and(|ext| IMAGE_TYPES.contains(&ext.as_str()));
    let content_type = content_type.to_ascii_lowercase();
    let mime_ok = IMAGE_TYPES.iter().any(|kind| content_type.contains(kind));
    extension_ok && mime_ok
}

async fn read_picture(field: Field<'_>, max_bytes: usize) -> ApiResult<ProfilePicture> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !is_allowed_image(&file_name, &content_type) {
        return Err(ApiError::bad_request("Images Only!"));
    }

    let data = field.bytes().await?;
    if data.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge("File too large".to_string()));
    }
    Ok(ProfilePicture {
        data: data.to_vec(),
        content_type,
    })
}

fn not_found() -> ApiError {
    ApiError::not_found("User not found")
}

async fn load_user(state: &AppState, raw_id: &str) -> ApiResult<User> {
    let id = parse_id(raw_id)?;
    state.store.find_user(id).await?.ok_or_else(not_found)
}

pub async fn upload_profile_picture(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PictureUploaded>> {
    let mut multipart = multipart?;
    let max_bytes = state.config.uploads.max_profile_picture_bytes;

    let mut picture = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(PICTURE_FIELD) {
            picture = Some(read_picture(field, max_bytes).await?);
            break;
        }
    }
    let picture = picture
        .filter(|picture| !picture.data.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let size = picture.data.len();
    user.profile_picture = Some(picture);
    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, size, "profile picture updated");

    Ok(Json(PictureUploaded {
        message: "Profile picture updated",
        profile_picture: user.id.to_string(),
    }))
}

/// Public: the dashboard loads pictures through plain `<img>` tags.
pub async fn get_profile_picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let missing = || ApiError::not_found("Profile picture not found");

    let id = parse_id(&user_id).map_err(|_| missing())?;
    let picture = state
        .store
        .find_user(id)
        .await?
        .and_then(|user| user.profile_picture)
        .filter(|picture| !picture.data.is_empty())
        .ok_or_else(missing)?;

    let content_type = if picture.content_type.is_empty() {
        "image/jpeg".to_string()
    } else {
        picture.content_type
    };
    Ok(([(CONTENT_TYPE, content_type)], picture.data))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Json(request) = payload?;
    let mut user = load_user(&state, &id).await?;

    let is_super_admin = caller.role == Role::SuperAdmin;
    if caller.id != user.id && !is_super_admin {
        return Err(ApiError::forbidden("Not authorized to update this user"));
    }

    if let Some(name) = non_blank(request.name) {
        user.name = name;
    }
    if let Some(email) = non_blank(request.email) {
        user.email = normalize_email(&email);
    }

    let company = non_blank(request.company);
    if is_super_admin {
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(company) = company {
            user.company = company;
        }
    } else {
        if request.role.is_some_and(|role| role != user.role) {
            return Err(ApiError::bad_request("Not authorized to change role"));
        }
        if company.is_some_and(|company| company != user.company) {
            return Err(ApiError::bad_request("Not authorized to change company"));
        }
    }

    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, updated_by = %caller.id, "profile updated");
    Ok(Json(UserProfile::from(&user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<UserProfile>>> {
    caller.require_role(&ADMIN_ROLES)?;
    let users = state.store.list_users().await?;
    debug!(count = users.len(), "listing users");
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    caller.require_role(&ADMIN_ROLES)?;
    let user = load_user(&state, &id).await?;

    if user.id == caller.0.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    if !state.store.delete_user(user.id).await? {
        return Err(not_found());
    }
    info!(user_id = %user.id, deleted_by = %caller.0.id, "user deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

pub async fn update_company(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    caller.require_role(&ADMIN_ROLES)?;
    let Json(request) = payload?;
    let company =
        non_blank(request.company).ok_or_else(|| ApiError::bad_request("Company is required"))?;

    let mut user = load_user(&state, &id).await?;
    user.company = company;
    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, company = %user.company, "company updated");
    Ok(Json(UserProfile::from(&user)))
}

pub async fn update_graphs(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateGraphsRequest>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    caller.require_role(&ADMIN_ROLES)?;
    let Json(request) = payload?;
    let required = || ApiError::bad_request("enabledGraphs object is required");

    let patch = match request.enabled_graphs {
        Some(value @ Value::Object(_)) => {
            serde_json::from_value::<GraphsPatch>(value).map_err(|_| required())?
        }
        _ => return Err(required()),
    };

    let mut user = load_user(&state, &id).await?;
    let graphs = &mut user.enabled_graphs;
    graphs.traffic_chart = patch.traffic_chart.unwrap_or(graphs.traffic_chart);
    graphs.weather_chart = patch.weather_chart.unwrap_or(graphs.weather_chart);
    graphs.event_chart = patch.event_chart.unwrap_or(graphs.event_chart);
    graphs.heat_map = patch.heat_map.unwrap_or(graphs.heat_map);

    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, "chart visibility updated");
    Ok(Json(UserProfile::from(&user)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;

    use super::*;
    use crate::test_support::{request, send, test_config, TestApp};

    const BOUNDARY: &str = "market-boundary";

    fn upload(token: &str, field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::PUT)
            .uri("/api/users/profilepicture")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn image_filter_checks_extension_and_type() {
        assert!(is_allowed_image("me.png", "image/png"));
        assert!(is_allowed_image("ME.JPG", "image/jpeg"));
        assert!(!is_allowed_image("me.gif", "image/gif"));
        assert!(!is_allowed_image("me.png", "text/plain"));
        assert!(!is_allowed_image("me", "image/png"));
    }

    #[tokio::test]
    async fn picture_upload_and_public_fetch() {
        let app = TestApp::new();
        let (user, token) = app.user("Ada", "ada@example.com", Role::Vendor).await;
        let png = [0x89, b'P', b'N', b'G', 1, 2, 3, 4];

        let response = send(&app.router, upload(&token, PICTURE_FIELD, "me.png", "image/png", &png)).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        assert_eq!(body["message"], "Profile picture updated");
        assert_eq!(body["profilePicture"], user.id.to_string());

        let uri = format!("/api/users/profilepicture/{}", user.id);
        let response = send(&app.router, request(Method::GET, &uri, None, None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.body, png);

        let response = send(&app.router, request(Method::GET, "/api/auth/me", Some(&token), None)).await;
        assert_eq!(response.json()["profilePicture"], user.id.to_string());
    }

    #[tokio::test]
    async fn picture_upload_rejections() {
        let mut config = test_config();
        config.uploads.max_profile_picture_bytes = 16;
        let app = TestApp::with_config(config);
        let (user, token) = app.user("Ada", "ada@example.com", Role::Vendor).await;

        let response = send(&app.router, upload(&token, PICTURE_FIELD, "me.gif", "image/gif", b"GIF89a")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "Images Only!");

        let response = send(&app.router, upload(&token, "avatar", "me.png", "image/png", b"png")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "No file uploaded");

        let response = send(&app.router, upload(&token, PICTURE_FIELD, "me.png", "image/png", &[7; 32])).await;
        assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);

        let uri = format!("/api/users/profilepicture/{}", user.id);
        let response = send(&app.router, request(Method::GET, &uri, None, None)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = send(&app.router, request(Method::GET, "/api/users/profilepicture/not-an-id", None, None)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_updates_follow_role_rules() {
        let app = TestApp::new();
        let (vendor, vendor_token) = app.user("Vendor", "vendor@example.com", Role::Vendor).await;
        let (other, _) = app.user("Other", "other@example.com", Role::Vendor).await;
        let (_, super_token) = app.user("Root", "root@example.com", Role::SuperAdmin).await;

        let own = format!("/api/users/{}", vendor.id);
        let response = send(
            &app.router,
            request(Method::PUT, &own, Some(&vendor_token), Some(json!({ "name": "Renamed" }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["name"], "Renamed");
        assert_eq!(response.json()["email"], "vendor@example.com");

        let response = send(
            &app.router,
            request(Method::PUT, &own, Some(&vendor_token), Some(json!({ "role": "admin" }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "Not authorized to change role");

        let response = send(
            &app.router,
            request(Method::PUT, &own, Some(&vendor_token), Some(json!({ "company": "Company Z" }))),
        )
        .await;
        assert_eq!(response.json()["message"], "Not authorized to change company");

        let response = send(
            &app.router,
            request(Method::PUT, &own, Some(&vendor_token), Some(json!({ "email": "other@example.com" }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let theirs = format!("/api/users/{}", other.id);
        let response = send(
            &app.router,
            request(Method::PUT, &theirs, Some(&vendor_token), Some(json!({ "name": "Hijacked" }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.json()["message"], "Not authorized to update this user");

        let response = send(
            &app.router,
            request(
                Method::PUT,
                &theirs,
                Some(&super_token),
                Some(json!({ "role": "market_manager", "company": "Company B" })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["role"], "market_manager");
        assert_eq!(response.json()["company"], "Company B");

        let response = send(
            &app.router,
            request(Method::PUT, "/api/users/nope", Some(&super_token), Some(json!({}))),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "Invalid id");
    }

    #[tokio::test]
    async fn admin_endpoints_require_admin_roles() {
        let app = TestApp::new();
        let (admin, admin_token) = app.user("Admin", "admin@example.com", Role::Admin).await;
        let (vendor, vendor_token) = app.user("Vendor", "vendor@example.com", Role::Vendor).await;

        let response = send(&app.router, request(Method::GET, "/api/users", Some(&vendor_token), None)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            response.json()["message"],
            "User role vendor is not authorized to access this route. Required roles: admin, super_admin"
        );

        let response = send(&app.router, request(Method::GET, "/api/users", Some(&admin_token), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        let users = response.json();
        assert_eq!(users.as_array().unwrap().len(), 2);
        assert!(users[0].get("passwordHash").is_none());

        let company = format!("/api/users/{}/company", vendor.id);
        let response = send(
            &app.router,
            request(Method::PUT, &company, Some(&admin_token), Some(json!({ "company": "" }))),
        )
        .await;
        assert_eq!(response.json()["message"], "Company is required");
        let response = send(
            &app.router,
            request(Method::PUT, &company, Some(&admin_token), Some(json!({ "company": "Company B" }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["company"], "Company B");

        let graphs = format!("/api/users/{}/graphs", vendor.id);
        let response = send(
            &app.router,
            request(Method::PUT, &graphs, Some(&admin_token), Some(json!({ "enabledGraphs": true }))),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "enabledGraphs object is required");
        let response = send(
            &app.router,
            request(
                Method::PUT,
                &graphs,
                Some(&admin_token),
                Some(json!({ "enabledGraphs": { "heatMap": false } })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        let enabled = &response.json()["enabledGraphs"];
        assert_eq!(enabled["heatMap"], false);
        assert_eq!(enabled["trafficChart"], true);

        let own = format!("/api/users/{}", admin.id);
        let response = send(&app.router, request(Method::DELETE, &own, Some(&admin_token), None)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "Cannot delete your own account");

        let target = format!("/api/users/{}", vendor.id);
        let response = send(&app.router, request(Method::DELETE, &target, Some(&admin_token), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["message"], "User deleted successfully");

        let response = send(&app.router, request(Method::DELETE, &target, Some(&admin_token), None)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
