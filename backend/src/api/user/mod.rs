//! Module for user profile and management API endpoints.
//!
//! This module handles functionality related to user information that is
//! distinct from the core authentication process: profile pictures, profile
//! edits and the administrator's account management.

pub mod handlers;
pub mod routes;

use chrono::{DateTime, Utc};
use market_store::{EnabledGraphs, Role, User};
use serde::Serialize;
use uuid::Uuid;

/// Public view of an account.
///
/// `profilePicture` is the id to fetch the picture with, or null when the
/// user has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub vendor_id: Option<Uuid>,
    pub company: String,
    pub profile_picture: Option<String>,
    pub enabled_graphs: EnabledGraphs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            vendor_id: user.vendor_id,
            company: user.company.clone(),
            profile_picture: user.has_profile_picture().then(|| user.id.to_string()),
            enabled_graphs: user.enabled_graphs,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
