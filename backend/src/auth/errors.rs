//! Custom error types specific to authentication failures.
//!
//! This module defines the errors that can occur while hashing passwords,
//! issuing or validating tokens, and checking role permissions. Their display
//! strings are the messages returned to API clients.

use market_store::Role;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized, no token")]
    MissingToken,

    /// The token is malformed, forged, expired, or names a deleted user.
    #[error("Not authorized, token failed")]
    InvalidToken { reason: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(
        "User role {role} is not authorized to access this route. Required roles: {}",
        format_roles(required)
    )]
    Forbidden { role: Role, required: Vec<Role> },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token encoding failed: {0}")]
    TokenEncoding(String),
}

impl AuthError {
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_hides_the_reason() {
        let err = AuthError::invalid_token("signature mismatch");
        assert_eq!(err.to_string(), "Not authorized, token failed");
        assert!(matches!(err, AuthError::InvalidToken { ref reason } if reason == "signature mismatch"));
    }

    #[test]
    fn forbidden_lists_required_roles() {
        let err = AuthError::Forbidden {
            role: Role::MarketManager,
            required: vec![Role::SuperAdmin],
        };
        assert_eq!(
            err.to_string(),
            "User role market_manager is not authorized to access this route. Required roles: super_admin"
        );
    }
}
