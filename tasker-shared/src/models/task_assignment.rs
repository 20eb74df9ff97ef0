/// Task assignment model
///
/// Links a task to a user (or to a group label; group assignment is stored
/// but not otherwise interpreted).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_assignments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_assignee UUID REFERENCES users(id),
///     group_assignee TEXT
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::PublicUser;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskAssignment {
    pub id: Uuid,

    pub task_id: Uuid,

    pub user_assignee: Option<Uuid>,

    pub group_assignee: Option<String>,
}

/// An assignee joined with the task it belongs to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssigneeRow {
    pub task_id: Uuid,

    #[sqlx(flatten)]
    pub user: PublicUser,
}

impl TaskAssignment {
    /// Assigns several users to a task in one statement
    ///
    /// Users already assigned are skipped.
    pub async fn assign_users(
        executor: impl PgExecutor<'_>,
        task_id: Uuid,
        users: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if users.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO task_assignments (task_id, user_assignee)
            SELECT $1, u FROM UNNEST($2::UUID[]) AS u
            ON CONFLICT (task_id, user_assignee) WHERE user_assignee IS NOT NULL DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(users)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes several user assignments from a task
    pub async fn unassign_users(
        executor: impl PgExecutor<'_>,
        task_id: Uuid,
        users: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if users.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM task_assignments WHERE task_id = $1 AND user_assignee = ANY($2)",
        )
        .bind(task_id)
        .bind(users)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes every assignment of a task, group assignments included
    pub async fn unassign_all(
        executor: impl PgExecutor<'_>,
        task_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// IDs of users currently assigned to a task
    pub async fn assignee_ids(
        executor: impl PgExecutor<'_>,
        task_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT user_assignee
            FROM task_assignments
            WHERE task_id = $1 AND user_assignee IS NOT NULL
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    /// Assignees of several tasks at once, ordered by name
    pub async fn assignees_for_tasks(
        executor: impl PgExecutor<'_>,
        task_ids: &[Uuid],
    ) -> Result<Vec<AssigneeRow>, sqlx::Error> {
        sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT ta.task_id, u.id, u.email, u.first_name, u.last_name, u.bio, u.avatar_url
            FROM task_assignments ta
            JOIN users u ON u.id = ta.user_assignee
            WHERE ta.task_id = ANY($1)
            ORDER BY u.first_name, u.last_name, u.id
            "#,
        )
        .bind(task_ids)
        .fetch_all(executor)
        .await
    }
}
