/// Authentication endpoints
///
/// - `POST /v1/users/signup` - Create an account and start a session
/// - `POST /v1/users/login` - Start a session
///
/// Both answer with `{ "token": "...", "user": { ... } }`. Email syntax and
/// password strength are checked by the user service so that failures carry
/// `signup.invalidEmail` / `signup.weakPassword` codes.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tasker_shared::services::users::{self, Session, Signup};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    #[serde(default)]
    pub bio: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Creates an account
///
/// # Errors
///
/// - `400 request.validation`: name or bio out of range
/// - `400 signup.invalidEmail`, `400 signup.weakPassword`
/// - `409 signup.emailExists`
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    req.validate()?;

    let session = users::signup(
        &state.db,
        &state.keys,
        Signup {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Logs in with email and password
///
/// # Errors
///
/// - `400 login.invalidEmail`
/// - `401 login.noUser`, `401 login.incorrectPassword`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Session>> {
    let session = users::login(&state.db, &state.keys, &req.email, &req.password).await?;
    Ok(Json(session))
}
