/// Task model and database operations
///
/// A task is owned by its creator, who is the only user allowed to edit or
/// delete it. Assignees live in the `task_assignments` table (see
/// [`super::task_assignment`]); every committed task has at least one.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TO_DO', 'IN_PROGRESS', 'BLOCKED', 'DONE');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     creator UUID NOT NULL REFERENCES users(id),
///     title TEXT NOT NULL,
///     description TEXT,
///     deadline TIMESTAMPTZ NOT NULL,
///     status task_status NOT NULL DEFAULT 'TO_DO',
///     estimated_days REAL CHECK (estimated_days IS NULL OR estimated_days >= 0),
///     project TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::user::PublicUser;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    ToDo,

    InProgress,

    Blocked,

    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "TO_DO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four status names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownTaskStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owner; immutable after creation
    pub creator: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub deadline: DateTime<Utc>,

    pub status: TaskStatus,

    /// Non-negative estimate in days
    pub estimated_days: Option<f32>,

    /// Free-form project label
    pub project: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub creator: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub deadline: DateTime<Utc>,

    pub status: TaskStatus,

    pub estimated_days: Option<f32>,

    pub project: Option<String>,
}

/// Field changes for a task; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,

    pub description: Option<String>,

    pub deadline: Option<DateTime<Utc>>,

    pub status: Option<TaskStatus>,

    pub estimated_days: Option<f32>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
            && self.estimated_days.is_none()
    }
}

/// Read model returned to callers: a task with its creator and assignees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub deadline: DateTime<Utc>,

    pub status: TaskStatus,

    pub estimated_days: Option<f32>,

    pub project: Option<String>,

    pub creator: PublicUser,

    pub assignees: Vec<PublicUser>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TaskDetails {
    pub fn new(task: Task, creator: PublicUser, assignees: Vec<PublicUser>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            deadline: task.deadline,
            status: task.status,
            estimated_days: task.estimated_days,
            project: task.project,
            creator,
            assignees,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

pub(crate) const TASK_COLUMNS: &str = "t.id, t.creator, t.title, t.description, t.deadline, \
     t.status, t.estimated_days, t.project, t.created_at, t.updated_at";

impl Task {
    /// Inserts a task row (assignments are created separately)
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks AS t (creator, title, description, deadline, status, estimated_days, project)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING t.id, t.creator, t.title, t.description, t.deadline,
                      t.status, t.estimated_days, t.project, t.created_at, t.updated_at
            "#,
        )
        .bind(data.creator)
        .bind(data.title)
        .bind(data.description)
        .bind(data.deadline)
        .bind(data.status)
        .bind(data.estimated_days)
        .bind(data.project)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Updates the `Some` fields of a task
    ///
    /// # Returns
    ///
    /// The updated task, or `None` if it does not exist
    pub async fn update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks AS t SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.deadline.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deadline = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.estimated_days.is_some() {
            bind_count += 1;
            query.push_str(&format!(", estimated_days = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE t.id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(deadline) = data.deadline {
            q = q.bind(deadline);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(estimated_days) = data.estimated_days {
            q = q.bind(estimated_days);
        }

        q.fetch_optional(executor).await
    }

    /// Deletes a task; its assignments go with it (ON DELETE CASCADE)
    pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tasks assigned to `user`, by deadline then title
    pub async fn list_assigned_to(
        executor: impl PgExecutor<'_>,
        user: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE EXISTS (
                SELECT 1 FROM task_assignments ta
                WHERE ta.task_id = t.id AND ta.user_assignee = $1
            )
            ORDER BY t.deadline ASC, t.title ASC
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user)
            .fetch_all(executor)
            .await
    }
}
