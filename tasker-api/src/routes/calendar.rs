/// Google Calendar endpoints
///
/// Every route answers `503 <operation>.notConfigured` when the server has no
/// Google OAuth client.
///
/// - `GET    /v1/calendar/auth-url` - consent-screen URL
/// - `POST   /v1/calendar/tokens` - exchange `{ "code": "..." }` and link
/// - `GET    /v1/calendar/tokens` - `{ "linked": bool }`
/// - `DELETE /v1/calendar/tokens` - unlink
/// - `POST   /v1/calendar/sync/:task_id` - push one task into the caller's calendar

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasker_shared::{
    auth::middleware::AuthContext,
    calendar::{self, google::GoogleCalendar, CalendarError, CalendarOp},
    models::calendar_credential::CalendarCredential,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveTokensRequest {
    /// Authorization code from the OAuth redirect
    #[validate(length(min = 1, message = "Authorization code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkStatus {
    pub linked: bool,
}

fn google(state: &AppState, op: CalendarOp) -> Result<Arc<GoogleCalendar>, CalendarError> {
    state.google.clone().ok_or(CalendarError::NotConfigured(op))
}

pub async fn authorization_url(State(state): State<AppState>) -> ApiResult<Json<AuthUrlResponse>> {
    let url = google(&state, CalendarOp::AuthUrl)?.authorization_url()?;
    Ok(Json(AuthUrlResponse { url }))
}

/// # Errors
///
/// - `409 saveCalendarTokens.credentialExists`
/// - `400 saveCalendarTokens.missingRefreshToken`
pub async fn save_tokens(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaveTokensRequest>,
) -> ApiResult<(StatusCode, Json<LinkStatus>)> {
    req.validate()?;
    let google = google(&state, CalendarOp::SaveTokens)?;

    calendar::link_account(&state.db, &google, auth.user_id, &req.code).await?;
    Ok((StatusCode::CREATED, Json(LinkStatus { linked: true })))
}

pub async fn check_tokens(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<LinkStatus>> {
    google(&state, CalendarOp::CheckTokens)?;

    let linked = CalendarCredential::exists(&state.db, auth.user_id)
        .await
        .map_err(CalendarError::from)?;
    Ok(Json(LinkStatus { linked }))
}

pub async fn clear_tokens(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    google(&state, CalendarOp::ClearTokens)?;

    calendar::unlink_account(&state.db, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// - `404 syncCalendar.taskNotFound`, `404 syncCalendar.notLinked`
/// - `403 syncCalendar.noPermission`
pub async fn sync_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    google(&state, CalendarOp::Sync)?;

    calendar::sync_task_for_user(&state.db, state.calendar.as_ref(), auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
