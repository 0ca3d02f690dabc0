//! Core business logic for the authentication system.
//!
//! This service handles password hashing, token issuance and validation, and
//! the registration and login flows. It orchestrates interactions between the
//! handlers and the store.
//!
//! Passwords are stored as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.
//! Tokens are compact HS256 JWTs signed with the configured secret.

use std::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use market_store::{MarketStore, NewUser, Role, User, DEFAULT_COMPANY};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{hmac, pbkdf2};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::models::{non_blank, normalize_email, AuthResponse, Claims, LoginRequest, RegisterRequest};
use crate::config::AuthConfig;
use crate::errors::{ApiError, ApiResult};

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = ring::digest::SHA256_OUTPUT_LEN;
const TOKEN_HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

#[derive(Clone)]
pub struct AuthService {
    key: hmac::Key,
    token_ttl: Duration,
    iterations: NonZeroU32,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("token_ttl", &self.token_ttl)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Builds the service from validated configuration.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let iterations = NonZeroU32::new(config.hash_iterations)
            .ok_or_else(|| AuthError::Hashing("hash iterations must be non-zero".to_string()))?;
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, config.jwt_secret.as_bytes()),
            token_ttl: Duration::days(i64::from(config.token_ttl_days)),
            iterations,
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| AuthError::Hashing("failed to generate salt".to_string()))?;

        let mut hash = [0u8; CREDENTIAL_LEN];
        pbkdf2::derive(PBKDF2_ALG, self.iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(hash)
        ))
    }

    /// Checks `password` against a stored hash. Malformed hashes never match.
    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        if scheme != HASH_SCHEME {
            return false;
        }
        let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(hash)) = (hex::decode(salt), hex::decode(hash)) else {
            return false;
        };
        pbkdf2::verify(PBKDF2_ALG, iterations, &salt, password.as_bytes(), &hash).is_ok()
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        self.issue_token_at(user, Utc::now())
    }

    pub fn issue_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            id: user.id,
            role: user.role,
            email: user.email.clone(),
            company: user.company.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        let payload =
            serde_json::to_vec(&claims).map_err(|e| AuthError::TokenEncoding(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(TOKEN_HEADER),
            BASE64URL_NOPAD.encode(&payload)
        );
        let signature = hmac::sign(&self.key, signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            BASE64URL_NOPAD.encode(signature.as_ref())
        ))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_token_at(token, Utc::now())
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::invalid_token("token must have three segments"));
        };

        let header_bytes = decode_segment(header)?;
        let header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| AuthError::invalid_token(format!("bad header: {e}")))?;
        if header.alg != "HS256" {
            return Err(AuthError::invalid_token(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }

        let signature = decode_segment(signature)?;
        let signing_input = &token[..header_segment_len(token)];
        hmac::verify(&self.key, signing_input.as_bytes(), &signature)
            .map_err(|_| AuthError::invalid_token("signature mismatch"))?;

        let claims: Claims = serde_json::from_slice(&decode_segment(payload)?)
            .map_err(|e| AuthError::invalid_token(format!("bad claims: {e}")))?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::invalid_token("token expired"));
        }
        Ok(claims)
    }

    /// Creates an account and returns it with a fresh token.
    ///
    /// Privileged roles cannot be chosen at registration.
    pub async fn register(
        &self,
        store: &dyn MarketStore,
        request: RegisterRequest,
    ) -> ApiResult<AuthResponse> {
        let (Some(name), Some(email), Some(password)) = (
            non_blank(request.name),
            non_blank(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(ApiError::bad_request("Invalid user data"));
        };
        let email = normalize_email(&email);

        let role = request.role.unwrap_or_default();
        if !Self::self_assignable(role) {
            warn!(%email, %role, "registration attempted with privileged role");
            return Err(ApiError::forbidden(format!(
                "Role {role} cannot be assigned at registration"
            )));
        }

        if store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::bad_request("User already exists"));
        }

        let password_hash = self.hash_password_blocking(password).await?;
        let user = store
            .create_user(NewUser {
                name,
                email,
                password_hash,
                role,
                company: non_blank(request.company).unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
                vendor_id: None,
            })
            .await?;
        info!(user_id = %user.id, role = %user.role, "registered user");

        let token = self.issue_token(&user)?;
        Ok(AuthResponse::new(&user, token))
    }

    pub async fn login(
        &self,
        store: &dyn MarketStore,
        request: LoginRequest,
    ) -> ApiResult<AuthResponse> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(AuthError::InvalidCredentials.into());
        };
        let email = normalize_email(&email);

        let Some(user) = store.find_user_by_email(&email).await? else {
            debug!(%email, "login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.verify_password_blocking(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        info!(user_id = %user.id, "user logged in");
        let token = self.issue_token(&user)?;
        Ok(AuthResponse::new(&user, token))
    }

    /// Hashes on the blocking pool; PBKDF2 at full strength takes tens of
    /// milliseconds.
    pub async fn hash_password_blocking(&self, password: String) -> ApiResult<String> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .map_err(ApiError::from)
    }

    async fn verify_password_blocking(&self, password: String, stored: String) -> ApiResult<bool> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &stored))
            .await
            .map_err(|e| ApiError::internal(e.to_string()))
    }

    /// Whether `role` may be granted through the registration endpoint.
    #[must_use]
    pub fn self_assignable(role: Role) -> bool {
        !role.is_privileged()
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    BASE64URL_NOPAD
        .decode(segment.as_bytes())
        .map_err(|e| AuthError::invalid_token(format!("bad encoding: {e}")))
}

/// Length of the `header.payload` prefix that the signature covers.
fn header_segment_len(token: &str) -> usize {
    token.rfind('.').unwrap_or(0)
}
