/// Session tokens
///
/// A session token is an HS256-signed JWT whose subject is the user ID. It is
/// issued at signup and login and presented as `Authorization: Bearer <token>`
/// on every authenticated request.
///
/// # Claims
///
/// - `sub`: user ID
/// - `iss`: always `"tasker"`
/// - `iat` / `nbf`: issue time
/// - `exp`: expiry (48 hours after issue by default)
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use tasker_shared::auth::jwt::{SessionKeys, validate_token};
/// use uuid::Uuid;
///
/// let keys = SessionKeys::new("a-secret-that-is-at-least-32-bytes!!", Duration::hours(1));
/// let user_id = Uuid::new_v4();
///
/// let token = keys.issue(user_id).unwrap();
/// let claims = validate_token(&token, keys.secret()).unwrap();
/// assert_eq!(claims.sub, user_id);
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "tasker";

/// Default session lifetime
pub const DEFAULT_SESSION_HOURS: i64 = 48;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token issuer")]
    InvalidIssuer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signing secret plus session lifetime
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    expires_in: Duration,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Issues a session token for a user
    pub fn issue(&self, user_id: Uuid) -> Result<String, JwtError> {
        create_token(&Claims::new(user_id, self.expires_in), &self.secret)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Validates signature, issuer, expiry and not-before
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(data.claims)
}
