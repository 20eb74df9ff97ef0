/// Task and assignment operations
///
/// Every mutation runs in a single transaction: a task is never visible
/// without its assignments, and a failed edit leaves neither the field
/// changes nor the assignment diff behind. Calendar sync runs only after
/// the commit and cannot fail the operation.
///
/// Invariants maintained here:
///
/// - every committed task has at least one user assignment
/// - only the creator may edit or delete a task
/// - a deadline is strictly in the future whenever it is set
/// - assignees are the actor or users connected to the actor

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization;
use crate::calendar::{self, CalendarSync};
use crate::error::{DomainError, ErrorCode, ErrorKind};
use crate::models::{
    task::{CreateTask, Task, TaskDetails, TaskStatus, UpdateTask},
    task_assignment::TaskAssignment,
    user::{PublicUser, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOp {
    Create,
    Edit,
    Delete,
    Get,
    ProfileTasks,
    Search,
}

impl TaskOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOp::Create => "createTask",
            TaskOp::Edit => "editTask",
            TaskOp::Delete => "deleteTask",
            TaskOp::Get => "getTask",
            TaskOp::ProfileTasks => "getProfileTasks",
            TaskOp::Search => "searchTasks",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task creator does not exist")]
    InvalidCreator,

    #[error("Title must not be empty")]
    InvalidTitle(TaskOp),

    #[error("Deadline must be a valid time in the future")]
    InvalidDeadline(TaskOp),

    #[error("Status must be one of TO_DO, IN_PROGRESS, BLOCKED, DONE")]
    InvalidStatus(TaskOp),

    #[error("Estimated days must be a non-negative number")]
    InvalidEstimatedDays(TaskOp),

    #[error("Tasks can only be assigned to yourself or your connections")]
    InvalidAssignees,

    #[error("No changes were provided")]
    BadParams,

    #[error("Added assignees must be yourself or your connections")]
    InvalidAddAssignees,

    #[error("Removed assignees must currently be assigned to the task")]
    InvalidRemoveAssignees,

    #[error("Task does not exist")]
    TaskNotFound(TaskOp),

    #[error("You do not have permission to do that")]
    NoPermission(TaskOp),

    #[error("Only the creator of a task can delete it")]
    InvalidDelete,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError for TaskError {
    fn code(&self) -> ErrorCode {
        let (op, reason) = match self {
            TaskError::InvalidCreator => (TaskOp::Create, "invalidCreator"),
            TaskError::InvalidTitle(op) => (*op, "invalidTitle"),
            TaskError::InvalidDeadline(op) => (*op, "invalidDeadline"),
            TaskError::InvalidStatus(op) => (*op, "invalidStatus"),
            TaskError::InvalidEstimatedDays(op) => (*op, "invalidEstimatedDays"),
            TaskError::InvalidAssignees => (TaskOp::Create, "invalidAssignees"),
            TaskError::BadParams => (TaskOp::Edit, "badParams"),
            TaskError::InvalidAddAssignees => (TaskOp::Edit, "invalidAddAssignees"),
            TaskError::InvalidRemoveAssignees => (TaskOp::Edit, "invalidRemoveAssignees"),
            TaskError::TaskNotFound(op) => (*op, "taskNotFound"),
            TaskError::NoPermission(op) => (*op, "noPermission"),
            TaskError::InvalidDelete => (TaskOp::Delete, "invalidDelete"),
            TaskError::Database(_) => return ErrorCode::DATABASE,
        };
        ErrorCode::new(op.as_str(), reason)
    }

    fn kind(&self) -> ErrorKind {
        match self {
            TaskError::TaskNotFound(_) => ErrorKind::NotFound,
            TaskError::NoPermission(_) | TaskError::InvalidDelete => ErrorKind::Forbidden,
            TaskError::Database(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }
}

/// Parses a wire status name
pub fn parse_status(op: TaskOp, raw: &str) -> Result<TaskStatus, TaskError> {
    raw.parse().map_err(|_| TaskError::InvalidStatus(op))
}

/// Parses an RFC 3339 deadline
pub fn parse_deadline(op: TaskOp, raw: &str) -> Result<DateTime<Utc>, TaskError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| TaskError::InvalidDeadline(op))
}

/// Trims the title and rejects blank ones
pub fn validate_title(op: TaskOp, title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::InvalidTitle(op));
    }
    Ok(trimmed.to_string())
}

pub fn validate_deadline(
    op: TaskOp,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TaskError> {
    if deadline <= now {
        return Err(TaskError::InvalidDeadline(op));
    }
    Ok(())
}

pub fn validate_estimated_days(op: TaskOp, days: Option<f32>) -> Result<(), TaskError> {
    match days {
        Some(d) if !d.is_finite() || d < 0.0 => Err(TaskError::InvalidEstimatedDays(op)),
        _ => Ok(()),
    }
}

/// Removes duplicates, keeping first occurrences in order
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
    /// Empty means "assign to the creator"
    pub assignees: Vec<Uuid>,
    pub project: Option<String>,
    pub description: Option<String>,
    pub estimated_days: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub add_assignees: Vec<Uuid>,
    pub remove_assignees: Vec<Uuid>,
    pub description: Option<String>,
    pub estimated_days: Option<f32>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
            && self.add_assignees.is_empty()
            && self.remove_assignees.is_empty()
            && self.description.is_none()
            && self.estimated_days.is_none()
    }
}

/// Rows to insert and delete to apply an assignee edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub insert: Vec<Uuid>,
    pub delete: Vec<Uuid>,
}

impl AssignmentPlan {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

/// Diffs an add/remove request against the current assignee set
///
/// Additions already present and removals of absent users are dropped
/// (absent removals are rejected beforehand). If the result would leave the
/// task with no assignee, the editor stays or becomes the sole assignee.
pub fn plan_assignment_changes(
    current: &[Uuid],
    add: &[Uuid],
    remove: &[Uuid],
    editor: Uuid,
) -> Result<AssignmentPlan, TaskError> {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();

    if remove.iter().any(|id| !current_set.contains(id)) {
        return Err(TaskError::InvalidRemoveAssignees);
    }

    let mut plan = AssignmentPlan {
        insert: dedup(add)
            .into_iter()
            .filter(|id| !current_set.contains(id))
            .collect(),
        delete: dedup(remove),
    };

    let remaining = current_set
        .iter()
        .filter(|id| !plan.delete.contains(id))
        .count()
        + plan.insert.len();

    if remaining == 0 {
        if plan.delete.contains(&editor) {
            plan.delete.retain(|id| *id != editor);
        } else {
            plan.insert.push(editor);
        }
    }

    Ok(plan)
}

/// Attaches creators and assignees to a batch of tasks, preserving order
pub async fn load_details(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<TaskDetails>, sqlx::Error> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let creator_ids = dedup(&tasks.iter().map(|t| t.creator).collect::<Vec<_>>());

    let mut assignees: HashMap<Uuid, Vec<PublicUser>> = HashMap::new();
    for row in TaskAssignment::assignees_for_tasks(pool, &task_ids).await? {
        assignees.entry(row.task_id).or_default().push(row.user);
    }

    let creators: HashMap<Uuid, PublicUser> = PublicUser::find_many(pool, &creator_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(tasks
        .into_iter()
        .filter_map(|task| {
            let creator = creators.get(&task.creator)?.clone();
            let task_assignees = assignees.remove(&task.id).unwrap_or_default();
            Some(TaskDetails::new(task, creator, task_assignees))
        })
        .collect())
}

/// Creates a task and its assignments
///
/// # Returns
///
/// The new task's ID
pub async fn create_task(
    pool: &PgPool,
    calendar: &dyn CalendarSync,
    creator: Uuid,
    input: NewTask,
) -> Result<Uuid, TaskError> {
    let op = TaskOp::Create;
    let title = validate_title(op, &input.title)?;
    validate_deadline(op, input.deadline, Utc::now())?;
    validate_estimated_days(op, input.estimated_days)?;

    if !User::exists(pool, creator).await? {
        return Err(TaskError::InvalidCreator);
    }

    let assignees = if input.assignees.is_empty() {
        vec![creator]
    } else {
        dedup(&input.assignees)
    };

    if !authorization::unassignable(pool, creator, &assignees).await?.is_empty() {
        return Err(TaskError::InvalidAssignees);
    }

    let mut tx = pool.begin().await?;

    let task = Task::create(
        &mut *tx,
        CreateTask {
            creator,
            title,
            description: input.description,
            deadline: input.deadline,
            status: input.status,
            estimated_days: input.estimated_days,
            project: input.project,
        },
    )
    .await?;
    TaskAssignment::assign_users(&mut *tx, task.id, &assignees).await?;

    tx.commit().await?;

    info!(task_id = %task.id, user_id = %creator, assignees = assignees.len(), "Task created");

    calendar::sync_task_best_effort(pool, calendar, &task).await;

    Ok(task.id)
}

/// Edits a task's fields and assignee set
pub async fn edit_task(
    pool: &PgPool,
    calendar: &dyn CalendarSync,
    task_id: Uuid,
    editor: Uuid,
    changes: TaskChanges,
) -> Result<(), TaskError> {
    let op = TaskOp::Edit;
    if changes.is_empty() {
        return Err(TaskError::BadParams);
    }

    let title = changes
        .title
        .as_deref()
        .map(|t| validate_title(op, t))
        .transpose()?;
    if let Some(deadline) = changes.deadline {
        validate_deadline(op, deadline, Utc::now())?;
    }
    validate_estimated_days(op, changes.estimated_days)?;

    let mut tx = pool.begin().await?;

    let task = Task::find_by_id(&mut *tx, task_id)
        .await?
        .ok_or(TaskError::TaskNotFound(op))?;

    if task.creator != editor {
        return Err(TaskError::NoPermission(op));
    }

    let add = dedup(&changes.add_assignees);
    if !authorization::unassignable(&mut *tx, editor, &add).await?.is_empty() {
        return Err(TaskError::InvalidAddAssignees);
    }

    let current = TaskAssignment::assignee_ids(&mut *tx, task_id).await?;
    let plan = plan_assignment_changes(&current, &add, &changes.remove_assignees, editor)?;

    let fields = UpdateTask {
        title,
        description: changes.description,
        deadline: changes.deadline,
        status: changes.status,
        estimated_days: changes.estimated_days,
    };

    let task = if fields.is_empty() {
        task
    } else {
        Task::update(&mut *tx, task_id, fields)
            .await?
            .ok_or(TaskError::TaskNotFound(op))?
    };

    TaskAssignment::assign_users(&mut *tx, task_id, &plan.insert).await?;
    TaskAssignment::unassign_users(&mut *tx, task_id, &plan.delete).await?;

    let unassigned_credentials = calendar::credentials_of(pool, task_id, &plan.delete).await;

    tx.commit().await?;

    info!(
        task_id = %task_id,
        user_id = %editor,
        added = plan.insert.len(),
        removed = plan.delete.len(),
        "Task edited"
    );

    calendar::sync_task_best_effort(pool, calendar, &task).await;
    calendar::remove_task_best_effort(calendar, task_id, &unassigned_credentials).await;

    Ok(())
}

/// Deletes a task and its assignments
pub async fn delete_task(
    pool: &PgPool,
    calendar: &dyn CalendarSync,
    deletor: Uuid,
    task_id: Uuid,
) -> Result<(), TaskError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(TaskError::TaskNotFound(TaskOp::Delete))?;

    if task.creator != deletor {
        return Err(TaskError::InvalidDelete);
    }

    let credentials = calendar::credentials_for_removal(pool, task_id).await;

    let mut tx = pool.begin().await?;
    TaskAssignment::unassign_all(&mut *tx, task_id).await?;
    if !Task::delete(&mut *tx, task_id).await? {
        return Err(TaskError::TaskNotFound(TaskOp::Delete));
    }
    tx.commit().await?;

    info!(task_id = %task_id, user_id = %deletor, "Task deleted");

    calendar::remove_task_best_effort(calendar, task_id, &credentials).await;

    Ok(())
}

/// Fetches a task with its assignees, if `viewer` may see it
pub async fn get_task(pool: &PgPool, viewer: Uuid, task_id: Uuid) -> Result<TaskDetails, TaskError> {
    let op = TaskOp::Get;
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(TaskError::TaskNotFound(op))?;

    if !authorization::can_view(pool, viewer, &task).await? {
        return Err(TaskError::NoPermission(op));
    }

    load_details(pool, vec![task])
        .await?
        .pop()
        .ok_or(TaskError::TaskNotFound(op))
}

/// Tasks assigned to `profile_user`, sorted by deadline then title
///
/// Visible to the user themselves and to their connections only.
pub async fn get_profile_tasks(
    pool: &PgPool,
    viewer: Uuid,
    profile_user: Uuid,
) -> Result<Vec<TaskDetails>, TaskError> {
    if !authorization::can_see_profile(pool, viewer, profile_user).await? {
        return Err(TaskError::NoPermission(TaskOp::ProfileTasks));
    }

    let tasks = Task::list_assigned_to(pool, profile_user).await?;
    Ok(load_details(pool, tasks).await?)
}
