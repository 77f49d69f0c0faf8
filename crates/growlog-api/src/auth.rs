//! API authentication via bearer tokens.
//!
//! Provides JWT issuance and verification, password hashing, and the
//! middleware that guards protected routes. Verification itself is the pure
//! function [`verify_bearer`]; the middleware and extractors only adapt it
//! to axum.

use std::convert::Infallible;
use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use growlog_core::error::GrowlogError;
use growlog_core::types::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Generate a random 64-character hex secret.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// The verified identity attached to a request by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Why a bearer credential was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header encoding")]
    InvalidEncoding,
    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid bearer token")]
    InvalidToken,
}

/// HS256 signing and verification keys plus the token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token for the user, valid from now for the configured TTL.
    pub fn issue(&self, user: &User) -> Result<String, GrowlogError> {
        let now = Utc::now().timestamp().max(0) as u64;
        self.issue_at(user, now)
    }

    /// Issue a token as if the current time were `issued_at` (epoch seconds).
    pub fn issue_at(&self, user: &User, issued_at: u64) -> Result<String, GrowlogError> {
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl_secs),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| GrowlogError::Auth(format!("Failed to sign token: {}", e)))
    }

    /// Verify a raw token and return its identity.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            email: data.claims.email,
        })
    }
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

/// Decide whether an `Authorization` header carries a valid bearer token.
pub fn verify_bearer(
    header: Option<&HeaderValue>,
    keys: &TokenKeys,
) -> Result<AuthUser, AuthError> {
    let value = header.ok_or(AuthError::MissingHeader)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidEncoding)?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidScheme)?;
    keys.verify(token)
}

// =============================================================================
// Middleware and extractors
// =============================================================================

/// Path prefixes where every request, routed or not, needs a bearer token.
pub const PROTECTED_PREFIXES: &[&str] = &["/todos", "/emotions", "/daily"];

/// Whether `path` sits under a protected prefix. Matches whole segments:
/// `/todos` and `/todos/x` are protected, `/todosx` is not.
pub fn is_protected_path(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Middleware that validates Bearer token authentication.
///
/// Runs ahead of routing, so unmatched paths under [`PROTECTED_PREFIXES`]
/// are rejected too. Other paths pass straight through. On success the
/// verified [`AuthUser`] is inserted as a request extension; a missing
/// header or invalid token is a 401.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if !is_protected_path(req.uri().path()) {
        return next.run(req).await;
    }
    match verify_bearer(req.headers().get(AUTHORIZATION), &state.keys) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(reason = %err, path = %req.uri().path(), "Rejected request");
            ApiError::from(err).into_response()
        }
    }
}

/// Identity if the request happens to carry a valid bearer token.
///
/// Never rejects: a missing or invalid token yields `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION);
        if header.is_none() {
            return Ok(MaybeAuthUser(None));
        }
        Ok(MaybeAuthUser(verify_bearer(header, &state.keys).ok()))
    }
}

// =============================================================================
// Passwords
// =============================================================================

/// Argon2id password hashing.
#[derive(Clone)]
pub struct Passwords {
    argon2: Argon2<'static>,
}

impl Passwords {
    /// Hasher with the argon2 crate's default parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hasher with explicit cost parameters (memory in KiB, iterations).
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, GrowlogError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| GrowlogError::Config(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, GrowlogError> {
        let salt_bytes: [u8; 16] = rand::rng().random();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| GrowlogError::Auth(format!("Failed to encode salt: {}", e)))?;
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| GrowlogError::Auth(format!("Failed to hash password: {}", e)))
    }

    /// Returns `Ok(false)` on mismatch; errors only on a corrupt stored hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, GrowlogError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| GrowlogError::Storage(format!("Invalid password hash: {}", e)))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Verify against a stored hash that may not exist. With no account the
    /// password is hashed anyway and the result is `false`, so both paths
    /// cost one Argon2 run.
    pub fn verify_or_burn(&self, password: &str, stored: Option<&str>) -> Result<bool, GrowlogError> {
        match stored {
            Some(hash) => self.verify(password, hash),
            None => self.hash(password).map(|_| false),
        }
    }

    /// [`Passwords::hash`] on the blocking pool.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, ApiError> {
        let passwords = self.clone();
        let password = password.to_string();
        run_blocking(move || passwords.hash(&password)).await
    }

    /// [`Passwords::verify_or_burn`] on the blocking pool.
    pub async fn verify_blocking(
        &self,
        password: &str,
        stored: Option<&str>,
    ) -> Result<bool, ApiError> {
        let passwords = self.clone();
        let password = password.to_string();
        let stored = stored.map(str::to_string);
        run_blocking(move || passwords.verify_or_burn(&password, stored.as_deref())).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, GrowlogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Password task failed: {}", e)))?
        .map_err(ApiError::from)
}

impl fmt::Debug for Passwords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passwords").finish_non_exhaustive()
    }
}

impl Default for Passwords {
    fn default() -> Self {
        Self::new()
    }
}
