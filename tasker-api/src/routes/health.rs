/// Health check endpoint
///
/// Reports whether the server can reach PostgreSQL and whether the schema is
/// at the latest embedded migration.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "migrations": "current"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tasker_shared::db::{migrations, pool};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// `current`, `pending` or `unknown`
    pub migrations: String,
}

/// Health check handler
///
/// Always answers 200; a broken database shows up as `degraded`.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = pool::health_check(&state.db).await.is_ok();

    let migrations = if connected {
        match migrations::get_migration_status(&state.db).await {
            Ok(status) if status.is_up_to_date => "current",
            Ok(_) => "pending",
            Err(_) => "unknown",
        }
    } else {
        "unknown"
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        migrations: migrations.to_string(),
    }))
}
