/// Identity and session operations
///
/// Signup and login return a session token; everything else works on the
/// public view of a user. Emails are validated syntactically here and kept
/// unique by the CITEXT column (so uniqueness is case-insensitive).

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::{
    jwt::{JwtError, SessionKeys},
    password::{self, PasswordError},
};
use crate::error::{DomainError, ErrorCode, ErrorKind};
use crate::models::{
    is_unique_violation,
    user::{CreateUser, PublicUser, UpdateUser, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOp {
    Signup,
    Login,
    Details,
    Update,
    Stats,
}

impl UserOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserOp::Signup => "signup",
            UserOp::Login => "login",
            UserOp::Details => "userDetails",
            UserOp::Update => "updateUser",
            UserOp::Stats => "userStats",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Email address is not valid")]
    InvalidEmail(UserOp),

    #[error("Password must be at least {} characters", password::MIN_PASSWORD_LENGTH)]
    WeakPassword(UserOp),

    #[error("An account with that email already exists")]
    EmailExists(UserOp),

    #[error("User does not exist")]
    NoUser(UserOp),

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("No changes were provided")]
    NoChanges,

    #[error("You do not have permission to do that")]
    NoPermission(UserOp),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),

    #[error("Session token error: {0}")]
    Jwt(#[from] JwtError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError for UserError {
    fn code(&self) -> ErrorCode {
        let (op, reason) = match self {
            UserError::InvalidEmail(op) => (*op, "invalidEmail"),
            UserError::WeakPassword(op) => (*op, "weakPassword"),
            UserError::EmailExists(op) => (*op, "emailExists"),
            UserError::NoUser(op) => (*op, "noUser"),
            UserError::IncorrectPassword => (UserOp::Login, "incorrectPassword"),
            UserError::NoChanges => (UserOp::Update, "noChanges"),
            UserError::NoPermission(op) => (*op, "noPermission"),
            UserError::Password(_) | UserError::Jwt(_) => {
                return ErrorCode::new("internal", "session")
            }
            UserError::Database(_) => return ErrorCode::DATABASE,
        };
        ErrorCode::new(op.as_str(), reason)
    }

    fn kind(&self) -> ErrorKind {
        match self {
            UserError::InvalidEmail(_) | UserError::WeakPassword(_) | UserError::NoChanges => {
                ErrorKind::Validation
            }
            UserError::EmailExists(_) => ErrorKind::Conflict,
            UserError::NoUser(UserOp::Login) | UserError::IncorrectPassword => {
                ErrorKind::Unauthenticated
            }
            UserError::NoUser(_) => ErrorKind::NotFound,
            UserError::NoPermission(_) => ErrorKind::Forbidden,
            UserError::Password(_) | UserError::Jwt(_) | UserError::Database(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Token plus the user it was issued for
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
}

/// Profile changes; `password` is plaintext and hashed here
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

/// Normalizes and validates an email address
pub fn normalize_email(op: UserOp, email: &str) -> Result<String, UserError> {
    let trimmed = email.trim().to_string();
    if !trimmed.validate_email() {
        return Err(UserError::InvalidEmail(op));
    }
    Ok(trimmed)
}

/// Creates an account and logs it in
pub async fn signup(pool: &PgPool, keys: &SessionKeys, input: Signup) -> Result<Session, UserError> {
    let op = UserOp::Signup;
    let email = normalize_email(op, &input.email)?;
    if !password::is_acceptable_password(&input.password) {
        return Err(UserError::WeakPassword(op));
    }

    if User::email_taken(pool, &email, None).await? {
        return Err(UserError::EmailExists(op));
    }

    let password_hash = password::hash_password(&input.password)?;

    let user = User::create(
        pool,
        CreateUser {
            email,
            password_hash,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            bio: input.bio,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            UserError::EmailExists(op)
        } else {
            UserError::Database(e)
        }
    })?;

    info!(user_id = %user.id, "User signed up");

    Ok(Session {
        token: keys.issue(user.id)?,
        user: user.into(),
    })
}

/// Checks credentials and issues a session token
pub async fn login(
    pool: &PgPool,
    keys: &SessionKeys,
    email: &str,
    password: &str,
) -> Result<Session, UserError> {
    let op = UserOp::Login;
    let email = normalize_email(op, email)?;

    let user = User::find_by_email(pool, &email)
        .await?
        .ok_or(UserError::NoUser(op))?;

    if !password::verify_password(password, &user.password_hash)? {
        return Err(UserError::IncorrectPassword);
    }

    info!(user_id = %user.id, "User logged in");

    Ok(Session {
        token: keys.issue(user.id)?,
        user: user.into(),
    })
}

pub async fn user_details(pool: &PgPool, user_id: Uuid) -> Result<PublicUser, UserError> {
    PublicUser::find_by_id(pool, user_id)
        .await?
        .ok_or(UserError::NoUser(UserOp::Details))
}

/// Applies profile changes to `user_id`
pub async fn update_user(
    pool: &PgPool,
    user_id: Uuid,
    changes: ProfileChanges,
) -> Result<PublicUser, UserError> {
    let op = UserOp::Update;
    if changes.is_empty() {
        return Err(UserError::NoChanges);
    }

    let email = changes
        .email
        .as_deref()
        .map(|e| normalize_email(op, e))
        .transpose()?;

    if let Some(email) = email.as_deref() {
        if User::email_taken(pool, email, Some(user_id)).await? {
            return Err(UserError::EmailExists(op));
        }
    }

    let password_hash = match changes.password.as_deref() {
        Some(p) if !password::is_acceptable_password(p) => return Err(UserError::WeakPassword(op)),
        Some(p) => Some(password::hash_password(p)?),
        None => None,
    };

    let update = UpdateUser {
        email,
        password_hash,
        first_name: changes.first_name,
        last_name: changes.last_name,
        bio: changes.bio,
        avatar_url: changes.avatar_url,
    };

    let user = User::update(pool, user_id, update)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UserError::EmailExists(op)
            } else {
                UserError::Database(e)
            }
        })?
        .ok_or(UserError::NoUser(op))?;

    info!(user_id = %user_id, "User profile updated");
    Ok(user.into())
}

/// Looks a user up by email; malformed addresses simply match nobody
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<PublicUser>, UserError> {
    let Ok(email) = normalize_email(UserOp::Details, email) else {
        return Ok(None);
    };

    Ok(User::find_by_email(pool, &email).await?.map(PublicUser::from))
}
