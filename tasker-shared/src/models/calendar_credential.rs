/// Calendar credential store
///
/// One row per user holding the OAuth tokens for their external calendar.
/// Task operations only look at whether credentials exist for an assignee
/// before attempting a sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CalendarCredential {
    pub user_id: Uuid,

    #[serde(skip_serializing)]
    pub access_token: String,

    #[serde(skip_serializing)]
    pub refresh_token: String,

    pub created_at: DateTime<Utc>,
}

impl CalendarCredential {
    /// Stores credentials for a user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the user already has credentials.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CalendarCredential>(
            r#"
            INSERT INTO calendar_credentials (user_id, access_token, refresh_token)
            VALUES ($1, $2, $3)
            RETURNING user_id, access_token, refresh_token, created_at
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .fetch_one(executor)
        .await
    }

    pub async fn find(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CalendarCredential>(
            r#"
            SELECT user_id, access_token, refresh_token, created_at
            FROM calendar_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM calendar_credentials WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    /// Credentials of every listed user that has some
    pub async fn find_for_users(
        executor: impl PgExecutor<'_>,
        user_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CalendarCredential>(
            r#"
            SELECT user_id, access_token, refresh_token, created_at
            FROM calendar_credentials
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(executor)
        .await
    }

    pub async fn delete(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM calendar_credentials WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
