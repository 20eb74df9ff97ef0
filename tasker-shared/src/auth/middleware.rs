/// Bearer-token authentication
///
/// The HTTP layer calls [`authenticate`] on each protected request and stores
/// the resulting [`AuthContext`] in the request extensions. Handlers then
/// extract it with `Extension<AuthContext>` and treat `user_id` as the acting
/// principal.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::error::{DomainError, ErrorCode, ErrorKind};

/// Identity of the caller for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("You must be logged in")]
    MissingCredentials,

    #[error("Expected a Bearer token")]
    InvalidFormat,

    #[error("Session has expired, please log in again")]
    Expired,

    #[error("Invalid session token")]
    InvalidToken,
}

impl DomainError for AuthError {
    fn code(&self) -> ErrorCode {
        let reason = match self {
            AuthError::MissingCredentials => "notLoggedIn",
            AuthError::InvalidFormat => "invalidFormat",
            AuthError::Expired => "sessionExpired",
            AuthError::InvalidToken => "invalidToken",
        };
        ErrorCode::new("auth", reason)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthenticated
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            _ => AuthError::InvalidToken,
        }
    }
}

/// Extracts the raw token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Validates the bearer token and builds the caller's context
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;

    Ok(AuthContext { user_id: claims.sub })
}
