/// User profile endpoints
///
/// - `GET  /v1/users/details/:id` - public profile (no auth)
/// - `GET  /v1/users/me` - the caller's profile
/// - `POST /v1/users/update` - change the caller's profile
/// - `POST /v1/users/by-email` - look a user up by email
/// - `GET  /v1/users/:id/stats` - weekly workload statistics

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Deserializer};
use tasker_shared::{
    auth::middleware::AuthContext,
    models::user::PublicUser,
    services::{
        stats::{self, UserStats},
        users::{self, ProfileChanges},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Profile update request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub email: Option<String>,

    pub password: Option<String>,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    /// `null` clears the avatar
    #[serde(default, deserialize_with = "present")]
    pub avatar_url: Option<Option<String>>,
}

/// Maps a present field (even `null`) to `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateUserRequest> for ProfileChanges {
    fn from(req: UpdateUserRequest) -> Self {
        ProfileChanges {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailLookupRequest {
    pub email: String,
}

pub async fn user_details(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(users::user_details(&state.db, user_id).await?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(users::user_details(&state.db, auth.user_id).await?))
}

/// # Errors
///
/// - `400 updateUser.noChanges`, `400 updateUser.invalidEmail`,
///   `400 updateUser.weakPassword`
/// - `409 updateUser.emailExists`
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    req.validate()?;

    let user = users::update_user(&state.db, auth.user_id, req.into()).await?;
    Ok(Json(user))
}

/// Answers `null` when nobody has that address
pub async fn find_by_email(
    State(state): State<AppState>,
    Json(req): Json<EmailLookupRequest>,
) -> ApiResult<Json<Option<PublicUser>>> {
    Ok(Json(users::find_by_email(&state.db, &req.email).await?))
}

/// # Errors
///
/// - `403 userStats.noPermission`: caller is neither the user nor connected
pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserStats>> {
    Ok(Json(stats::user_stats(&state.db, auth.user_id, user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_null_clears_and_absent_keeps() {
        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"avatar_url": null}"#).unwrap();
        assert_eq!(cleared.avatar_url, Some(None));

        let kept: UpdateUserRequest = serde_json::from_str(r#"{"bio": "hi"}"#).unwrap();
        assert_eq!(kept.avatar_url, None);
    }

    #[test]
    fn test_empty_first_name_fails_validation() {
        let req = UpdateUserRequest {
            first_name: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
