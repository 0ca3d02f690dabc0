//! Middleware for protecting authenticated routes and handling authorization.
//!
//! [`AuthUser`] is an extractor: adding it to a handler's arguments makes the
//! route require a valid bearer token. The account is re-read from the store on
//! every request, so deleted users lose access immediately and role changes
//! apply without reissuing tokens.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use market_store::{Role, User};
use tracing::debug;

use super::errors::AuthError;
use crate::errors::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.auth.verify_token(token)?;

        match state.store.find_user(claims.id).await? {
            Some(user) => {
                debug!(user_id = %user.id, role = %user.role, "authenticated request");
                Ok(Self(user))
            }
            None => Err(AuthError::invalid_token("user no longer exists").into()),
        }
    }
}

impl AuthUser {
    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        require_role(&self.0, roles)
    }
}

pub fn require_role(user: &User, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            role: user.role,
            required: roles.to_vec(),
        }
        .into())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer")
        .ok_or(AuthError::MissingToken)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::invalid_token("empty bearer token"));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
        assert!(matches!(bearer_token(&parts(None)), Err(AuthError::MissingToken)));
        assert!(matches!(
            bearer_token(&parts(Some("Basic dXNlcg=="))),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&parts(Some("Bearer "))),
            Err(AuthError::InvalidToken { .. })
        ));
    }
}
