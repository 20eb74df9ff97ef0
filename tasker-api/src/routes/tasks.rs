/// Task endpoints
///
/// - `GET    /v1/tasks` - search the caller's visible tasks
/// - `POST   /v1/tasks` - create a task
/// - `GET    /v1/tasks/:id` - one task with creator and assignees
/// - `POST   /v1/tasks/:id/edit` - change fields and assignees
/// - `DELETE /v1/tasks/:id` - delete (creator only)
/// - `GET    /v1/users/:id/tasks` - tasks assigned to a user
///
/// Deadlines travel as RFC 3339 strings and statuses as `TO_DO`,
/// `IN_PROGRESS`, `BLOCKED` or `DONE`. Both are parsed here so that malformed
/// values report the operation's `invalidDeadline` / `invalidStatus` code.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tasker_shared::{
    auth::middleware::AuthContext,
    models::task::TaskDetails,
    services::{
        search::{self, TaskFilter},
        tasks::{self, parse_deadline, parse_status, NewTask, TaskChanges, TaskOp},
    },
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,

    pub deadline: String,

    /// Defaults to `TO_DO`
    pub status: Option<String>,

    /// Empty assigns the task to the creator
    #[serde(default)]
    pub assignees: Vec<Uuid>,

    pub project: Option<String>,

    pub description: Option<String>,

    pub estimated_days: Option<f32>,
}

impl CreateTaskRequest {
    fn into_new_task(self) -> Result<NewTask, ApiError> {
        let op = TaskOp::Create;
        Ok(NewTask {
            deadline: parse_deadline(op, &self.deadline)?,
            status: self
                .status
                .as_deref()
                .map(|s| parse_status(op, s))
                .transpose()?
                .unwrap_or_default(),
            title: self.title,
            assignees: self.assignees,
            project: self.project,
            description: self.description,
            estimated_days: self.estimated_days,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EditTaskRequest {
    pub title: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub add_assignees: Vec<Uuid>,
    #[serde(default)]
    pub remove_assignees: Vec<Uuid>,
    pub description: Option<String>,
    pub estimated_days: Option<f32>,
}

impl EditTaskRequest {
    fn into_changes(self) -> Result<TaskChanges, ApiError> {
        let op = TaskOp::Edit;
        Ok(TaskChanges {
            deadline: self
                .deadline
                .as_deref()
                .map(|d| parse_deadline(op, d))
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(|s| parse_status(op, s))
                .transpose()?,
            title: self.title,
            add_assignees: self.add_assignees,
            remove_assignees: self.remove_assignees,
            description: self.description,
            estimated_days: self.estimated_days,
        })
    }
}

/// Query string of `GET /v1/tasks`
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub creator: Option<Uuid>,
    /// Inclusive upper bound, RFC 3339
    pub deadline: Option<String>,
    pub status: Option<String>,
    pub estimated_days: Option<f32>,
    /// Comma-separated user ids
    pub assignees: Option<String>,
}

/// Parses a comma-separated id list, ignoring blanks
pub fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            Uuid::parse_str(id).map_err(|_| {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "assignees".to_string(),
                    message: format!("'{id}' is not a valid user id"),
                }])
            })
        })
        .collect()
}

impl SearchQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        Ok(TaskFilter {
            deadline: self
                .deadline
                .as_deref()
                .map(|d| parse_deadline(TaskOp::Search, d))
                .transpose()?,
            assignees: match self.assignees.as_deref() {
                Some(raw) => parse_id_list(raw)?,
                None => Vec::new(),
            },
            title: self.title,
            description: self.description,
            project: self.project,
            creator: self.creator,
            status: self.status,
            estimated_days: self.estimated_days,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: Uuid,
}

/// # Errors
///
/// - `400 createTask.invalidTitle|invalidDeadline|invalidStatus|invalidEstimatedDays`
/// - `400 createTask.invalidAssignees`: an assignee is not the caller or a connection
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreatedTask>)> {
    let input = req.into_new_task()?;
    let id = tasks::create_task(&state.db, state.calendar.as_ref(), auth.user_id, input).await?;

    Ok((StatusCode::CREATED, Json(CreatedTask { id })))
}

/// Applies the edit and answers with the updated task
pub async fn edit_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<EditTaskRequest>,
) -> ApiResult<Json<TaskDetails>> {
    let changes = req.into_changes()?;
    tasks::edit_task(&state.db, state.calendar.as_ref(), task_id, auth.user_id, changes).await?;

    Ok(Json(tasks::get_task(&state.db, auth.user_id, task_id).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tasks::delete_task(&state.db, state.calendar.as_ref(), auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskDetails>> {
    Ok(Json(tasks::get_task(&state.db, auth.user_id, task_id).await?))
}

pub async fn profile_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskDetails>>> {
    Ok(Json(
        tasks::get_profile_tasks(&state.db, auth.user_id, user_id).await?,
    ))
}

pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<TaskDetails>>> {
    let filter = query.into_filter()?;
    Ok(Json(search::search_tasks(&state.db, auth.user_id, filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasker_shared::models::task::TaskStatus;

    #[test]
    fn test_create_request_defaults_status() {
        let req: CreateTaskRequest = serde_json::from_str(
            r#"{"title": "Write report", "deadline": "2031-01-01T09:00:00Z"}"#,
        )
        .unwrap();
        let task = req.into_new_task().unwrap();

        assert_eq!(task.status, TaskStatus::ToDo);
        assert!(task.assignees.is_empty());
    }

    #[test]
    fn test_create_request_rejects_bad_status() {
        let req = CreateTaskRequest {
            title: "t".to_string(),
            deadline: "2031-01-01T09:00:00Z".to_string(),
            status: Some("WAITING".to_string()),
            assignees: Vec::new(),
            project: None,
            description: None,
            estimated_days: None,
        };

        let err = req.into_new_task().unwrap_err();
        assert!(err.to_string().starts_with("createTask.invalidStatus"));
    }

    #[test]
    fn test_edit_request_rejects_unparsable_deadline() {
        let req = EditTaskRequest {
            deadline: Some("next tuesday".to_string()),
            ..Default::default()
        };

        let err = req.into_changes().unwrap_err();
        assert!(err.to_string().starts_with("editTask.invalidDeadline"));
    }

    #[test]
    fn test_parse_id_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(parse_id_list(&format!("{a}, {b},")).unwrap(), vec![a, b]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("not-a-uuid").is_err());
    }

    #[test]
    fn test_search_query_builds_filter() {
        let query = SearchQuery {
            title: Some("report".to_string()),
            deadline: Some("2031-01-01T00:00:00+02:00".to_string()),
            status: Some("DONE".to_string()),
            ..Default::default()
        };

        let filter = query.into_filter().unwrap();
        assert_eq!(filter.title.as_deref(), Some("report"));
        assert_eq!(filter.status.as_deref(), Some("DONE"));
        assert_eq!(
            filter.deadline.map(|d| d.to_rfc3339()),
            Some("2030-12-31T22:00:00+00:00".to_string())
        );
    }
}
