/// Connection endpoints
///
/// Mutations take `{ "id": "<other user>" }` in the body; the caller is the
/// other side.
///
/// - `POST /v1/connections/create` - request a connection to `id`
/// - `POST /v1/connections/delete` - remove the relationship with `id`
/// - `POST /v1/connections/accept` - accept `id`'s request to the caller
/// - `POST /v1/connections/decline` - decline `id`'s request to the caller
/// - `GET  /v1/connections/status/:id` - `unconnected` | `requested` | `connected`
/// - `GET  /v1/connections/incoming|outgoing|accepted` - user lists

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tasker_shared::{
    auth::middleware::AuthContext,
    models::user::PublicUser,
    services::connections::{self, ConnectionState},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    /// The other user
    pub id: Uuid,
}

pub async fn create_connection(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ConnectionRequest>,
) -> ApiResult<StatusCode> {
    connections::create_connection(&state.db, auth.user_id, req.id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ConnectionRequest>,
) -> ApiResult<StatusCode> {
    connections::delete_connection(&state.db, auth.user_id, req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ConnectionRequest>,
) -> ApiResult<StatusCode> {
    connections::accept_request(&state.db, auth.user_id, req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ConnectionRequest>,
) -> ApiResult<StatusCode> {
    connections::decline_request(&state.db, auth.user_id, req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn connection_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(other): Path<Uuid>,
) -> ApiResult<Json<ConnectionState>> {
    let status = connections::connection_status(&state.db, auth.user_id, other).await?;
    Ok(Json(ConnectionState {
        user_id: other,
        status,
    }))
}

/// Users who asked to connect with the caller
pub async fn incoming_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(connections::incoming_requests(&state.db, auth.user_id).await?))
}

/// Users the caller asked to connect with
pub async fn outgoing_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(connections::outgoing_requests(&state.db, auth.user_id).await?))
}

pub async fn accepted_connections(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(connections::accepted_connections(&state.db, auth.user_id).await?))
}
