/// Task search
///
/// The result set is the union of tasks the viewer created and tasks
/// assigned to the viewer (or to any extra assignee the viewer may see),
/// narrowed by the filter and sorted by deadline, then title. A task that is
/// both created by and assigned to the viewer appears once.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use tracing::debug;
use uuid::Uuid;

use super::tasks::{load_details, TaskError};
use crate::models::{
    connection::Connection,
    task::{Task, TaskDetails, TaskStatus, TASK_COLUMNS},
};

/// Search criteria; every `Some` field narrows the result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,

    /// Case-insensitive substring of the description
    pub description: Option<String>,

    /// Exact project label
    pub project: Option<String>,

    /// Exact creator
    pub creator: Option<Uuid>,

    /// Deadline at or before this instant
    pub deadline: Option<DateTime<Utc>>,

    /// Raw status name; anything outside the four statuses matches nothing
    pub status: Option<String>,

    /// Exact estimate
    pub estimated_days: Option<f32>,

    /// Extra users whose assigned tasks widen the visible set
    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(input: &str) -> String {
    format!("%{}%", escape_like(input))
}

/// Builds the search SQL; `$1` is the viewer, `$2` the visible assignee set
fn build_query(filter: &TaskFilter) -> String {
    let mut query = format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks t
        WHERE (t.creator = $1 OR EXISTS (
            SELECT 1 FROM task_assignments ta
            WHERE ta.task_id = t.id AND ta.user_assignee = ANY($2)
        ))"#
    );
    let mut bind_count = 2;

    if filter.title.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.title ILIKE ${} ESCAPE '\\'", bind_count));
    }
    if filter.description.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.description ILIKE ${} ESCAPE '\\'", bind_count));
    }
    if filter.project.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.project = ${}", bind_count));
    }
    if filter.creator.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.creator = ${}", bind_count));
    }
    if filter.deadline.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.deadline <= ${}", bind_count));
    }
    if filter.status.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.status = ${}", bind_count));
    }
    if filter.estimated_days.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND t.estimated_days = ${}", bind_count));
    }

    query.push_str(" ORDER BY t.deadline ASC, t.title ASC");
    query
}

/// Searches the tasks visible to `viewer`
pub async fn search_tasks(
    pool: &PgPool,
    viewer: Uuid,
    filter: TaskFilter,
) -> Result<Vec<TaskDetails>, TaskError> {
    let status = match filter.status.as_deref().map(str::parse::<TaskStatus>) {
        Some(Err(_)) => {
            debug!(user_id = %viewer, "Unknown status filter, returning no tasks");
            return Ok(Vec::new());
        }
        Some(Ok(status)) => Some(status),
        None => None,
    };

    let extras: Vec<Uuid> = filter
        .assignees
        .iter()
        .copied()
        .filter(|id| *id != viewer)
        .collect();
    let mut visible = if extras.is_empty() {
        Vec::new()
    } else {
        Connection::connected_subset(pool, viewer, &extras).await?
    };
    visible.push(viewer);

    let query = build_query(&filter);
    let mut q = sqlx::query_as::<Postgres, Task>(&query)
        .bind(viewer)
        .bind(visible);

    if let Some(title) = filter.title.as_deref() {
        q = q.bind(contains_pattern(title));
    }
    if let Some(description) = filter.description.as_deref() {
        q = q.bind(contains_pattern(description));
    }
    if let Some(project) = filter.project {
        q = q.bind(project);
    }
    if let Some(creator) = filter.creator {
        q = q.bind(creator);
    }
    if let Some(deadline) = filter.deadline {
        q = q.bind(deadline);
    }
    if let Some(status) = status {
        q = q.bind(status);
    }
    if let Some(estimated_days) = filter.estimated_days {
        q = q.bind(estimated_days);
    }

    let tasks = q.fetch_all(pool).await?;
    Ok(load_details(pool, tasks).await?)
}
