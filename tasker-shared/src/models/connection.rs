/// Connection model and database operations
///
/// A connection row is a directed request from `requester` to `requestee`.
/// It starts pending (`accepted = false`) and becomes a symmetric connection
/// once the requestee accepts it. Declining or cancelling deletes the row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE connections (
///     requester UUID NOT NULL REFERENCES users(id),
///     requestee UUID NOT NULL REFERENCES users(id),
///     accepted BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (requester, requestee),
///     CHECK (requester <> requestee)
/// );
///
/// -- at most one row per unordered pair
/// CREATE UNIQUE INDEX connections_unordered_pair_idx
///     ON connections (LEAST(requester, requestee), GREATEST(requester, requestee));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::PublicUser;

/// Relationship between two users as seen from either side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No row in either direction
    Unconnected,

    /// A pending row exists, in either direction
    Requested,

    /// An accepted row exists
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Unconnected => "unconnected",
            ConnectionStatus::Requested => "requested",
            ConnectionStatus::Connected => "connected",
        }
    }

    /// Derives the status from the `accepted` flag of the pair's row, if any
    pub fn from_accepted(accepted: Option<bool>) -> Self {
        match accepted {
            None => ConnectionStatus::Unconnected,
            Some(false) => ConnectionStatus::Requested,
            Some(true) => ConnectionStatus::Connected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connection {
    pub requester: Uuid,

    pub requestee: Uuid,

    pub accepted: bool,

    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Inserts a pending request from `requester` to `requestee`
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if a row already exists for the pair in
    /// either direction, and with a check violation for self-connections.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        requester: Uuid,
        requestee: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connections (requester, requestee)
            VALUES ($1, $2)
            RETURNING requester, requestee, accepted, created_at
            "#,
        )
        .bind(requester)
        .bind(requestee)
        .fetch_one(executor)
        .await
    }

    /// Finds the row with exactly this direction
    pub async fn find_directed(
        executor: impl PgExecutor<'_>,
        requester: Uuid,
        requestee: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connection>(
            r#"
            SELECT requester, requestee, accepted, created_at
            FROM connections
            WHERE requester = $1 AND requestee = $2
            "#,
        )
        .bind(requester)
        .bind(requestee)
        .fetch_optional(executor)
        .await
    }

    /// Finds the row for the unordered pair `{a, b}`
    pub async fn find_between(
        executor: impl PgExecutor<'_>,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connection>(
            r#"
            SELECT requester, requestee, accepted, created_at
            FROM connections
            WHERE (requester = $1 AND requestee = $2)
               OR (requester = $2 AND requestee = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(executor)
        .await
    }

    /// Status of the unordered pair `{a, b}`
    ///
    /// Symmetric: `status(a, b) == status(b, a)`.
    pub async fn status(
        executor: impl PgExecutor<'_>,
        a: Uuid,
        b: Uuid,
    ) -> Result<ConnectionStatus, sqlx::Error> {
        if a == b {
            return Ok(ConnectionStatus::Unconnected);
        }

        let accepted: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT accepted
            FROM connections
            WHERE (requester = $1 AND requestee = $2)
               OR (requester = $2 AND requestee = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(executor)
        .await?;

        Ok(ConnectionStatus::from_accepted(accepted))
    }

    /// Marks the directed request as accepted
    ///
    /// # Returns
    ///
    /// True if a row was updated
    pub async fn accept(
        executor: impl PgExecutor<'_>,
        requester: Uuid,
        requestee: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET accepted = TRUE
            WHERE requester = $1 AND requestee = $2
            "#,
        )
        .bind(requester)
        .bind(requestee)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the pending directed request
    ///
    /// Accepted rows are left untouched.
    pub async fn delete_pending(
        executor: impl PgExecutor<'_>,
        requester: Uuid,
        requestee: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM connections
            WHERE requester = $1 AND requestee = $2 AND accepted = FALSE
            "#,
        )
        .bind(requester)
        .bind(requestee)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the row for the unordered pair, whatever its state
    pub async fn delete_between(
        executor: impl PgExecutor<'_>,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM connections
            WHERE (requester = $1 AND requestee = $2)
               OR (requester = $2 AND requestee = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users who sent `user` a request that is still pending
    pub async fn list_incoming(
        executor: impl PgExecutor<'_>,
        user: Uuid,
    ) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.bio, u.avatar_url
            FROM connections c
            JOIN users u ON u.id = c.requester
            WHERE c.requestee = $1 AND c.accepted = FALSE
            ORDER BY c.created_at
            "#,
        )
        .bind(user)
        .fetch_all(executor)
        .await
    }

    /// Users `user` sent a request to that is still pending
    pub async fn list_outgoing(
        executor: impl PgExecutor<'_>,
        user: Uuid,
    ) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.bio, u.avatar_url
            FROM connections c
            JOIN users u ON u.id = c.requestee
            WHERE c.requester = $1 AND c.accepted = FALSE
            ORDER BY c.created_at
            "#,
        )
        .bind(user)
        .fetch_all(executor)
        .await
    }

    /// Users connected to `user`, in either direction
    pub async fn list_accepted(
        executor: impl PgExecutor<'_>,
        user: Uuid,
    ) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.bio, u.avatar_url
            FROM connections c
            JOIN users u
              ON u.id = CASE WHEN c.requester = $1 THEN c.requestee ELSE c.requester END
            WHERE (c.requester = $1 OR c.requestee = $1) AND c.accepted = TRUE
            ORDER BY u.first_name, u.last_name
            "#,
        )
        .bind(user)
        .fetch_all(executor)
        .await
    }

    /// IDs from `candidates` that are connected to `user`
    pub async fn connected_subset(
        executor: impl PgExecutor<'_>,
        user: Uuid,
        candidates: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT CASE WHEN c.requester = $1 THEN c.requestee ELSE c.requester END
            FROM connections c
            WHERE c.accepted = TRUE
              AND ((c.requester = $1 AND c.requestee = ANY($2))
                OR (c.requestee = $1 AND c.requester = ANY($2)))
            "#,
        )
        .bind(user)
        .bind(candidates)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_accepted() {
        assert_eq!(
            ConnectionStatus::from_accepted(None),
            ConnectionStatus::Unconnected
        );
        assert_eq!(
            ConnectionStatus::from_accepted(Some(false)),
            ConnectionStatus::Requested
        );
        assert_eq!(
            ConnectionStatus::from_accepted(Some(true)),
            ConnectionStatus::Connected
        );
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ConnectionStatus::Requested).unwrap();
        assert_eq!(json, "\"requested\"");
        assert_eq!(ConnectionStatus::Connected.as_str(), "connected");
    }
}
