//! Helpers for driving the router in tests.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use market_store::{
    MarketStore, NewUser, NewVendor, Role, SqliteStore, User, Vendor, VendorCategory,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::Config;
use crate::state::AppState;
use crate::build_router;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.path = PathBuf::from(":memory:");
    config.auth.jwt_secret = "test-secret".to_string();
    config.auth.hash_iterations = 1_000;
    config
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store: Arc<dyn MarketStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let state = AppState::new(config, store).unwrap();
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Creates an account directly in the store and returns it with a token.
    pub async fn user(&self, name: &str, email: &str, role: Role) -> (User, String) {
        self.user_in(name, email, role, "Company A").await
    }

    pub async fn user_in(&self, name: &str, email: &str, role: Role, company: &str) -> (User, String) {
        let password_hash = self.state.auth.hash_password("password123").unwrap();
        let user = self
            .state
            .store
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role,
                company: company.to_string(),
                vendor_id: None,
            })
            .await
            .unwrap();
        let token = self.state.auth.issue_token(&user).unwrap();
        (user, token)
    }

    pub async fn vendor(&self, name: &str, booth_number: &str, is_active: bool) -> Vendor {
        self.state
            .store
            .create_vendor(NewVendor {
                name: name.to_string(),
                company: "Company A".to_string(),
                category: VendorCategory::Produce,
                booth_number: booth_number.to_string(),
                location: None,
                owner: None,
                products: Vec::new(),
                market_days: Vec::new(),
                is_active,
            })
            .await
            .unwrap()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
