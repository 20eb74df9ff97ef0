/// External calendar sync
///
/// After a task is created, edited or deleted, the task services push the
/// change to the calendars of assignees who have linked one. The sync is
/// best-effort: it runs after the database commit and its failures are
/// logged and discarded, never returned to the caller.
///
/// - [`CalendarSync`]: the collaborator the task services talk to
/// - [`google::GoogleCalendar`]: Google Calendar implementation
/// - [`NoopCalendar`]: used when no calendar provider is configured
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasker_shared::calendar::{self, CalendarSync, NoopCalendar};
/// use tasker_shared::models::task::Task;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, task: Task) {
/// let calendar: Arc<dyn CalendarSync> = Arc::new(NoopCalendar);
/// calendar::sync_task_best_effort(&pool, calendar.as_ref(), &task).await;
/// # }
/// ```

pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::authorization;
use crate::error::{DomainError, ErrorCode, ErrorKind};
use crate::models::{
    calendar_credential::CalendarCredential, is_unique_violation, task::Task,
    task_assignment::TaskAssignment,
};

/// Calendar operations exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOp {
    AuthUrl,
    SaveTokens,
    CheckTokens,
    ClearTokens,
    Sync,
}

impl CalendarOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarOp::AuthUrl => "calendarAuthUrl",
            CalendarOp::SaveTokens => "saveCalendarTokens",
            CalendarOp::CheckTokens => "checkCalendarTokens",
            CalendarOp::ClearTokens => "clearCalendarTokens",
            CalendarOp::Sync => "syncCalendar",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar integration is not configured")]
    NotConfigured(CalendarOp),

    #[error("Calendar credentials already exist for this user")]
    CredentialExists,

    #[error("No refresh token was returned by the calendar provider")]
    MissingRefreshToken,

    #[error("No calendar is linked to this account")]
    NotLinked(CalendarOp),

    #[error("Task does not exist")]
    TaskNotFound,

    #[error("You do not have permission to view this task")]
    NoPermission,

    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError for CalendarError {
    fn code(&self) -> ErrorCode {
        match self {
            CalendarError::NotConfigured(op) => ErrorCode::new(op.as_str(), "notConfigured"),
            CalendarError::CredentialExists => {
                ErrorCode::new(CalendarOp::SaveTokens.as_str(), "credentialExists")
            }
            CalendarError::MissingRefreshToken => {
                ErrorCode::new(CalendarOp::SaveTokens.as_str(), "missingRefreshToken")
            }
            CalendarError::NotLinked(op) => ErrorCode::new(op.as_str(), "notLinked"),
            CalendarError::TaskNotFound => ErrorCode::new(CalendarOp::Sync.as_str(), "taskNotFound"),
            CalendarError::NoPermission => ErrorCode::new(CalendarOp::Sync.as_str(), "noPermission"),
            CalendarError::Http(_) | CalendarError::Provider { .. } => {
                ErrorCode::new("calendar", "providerError")
            }
            CalendarError::Database(_) => ErrorCode::DATABASE,
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            CalendarError::NotConfigured(_) => ErrorKind::Unavailable,
            CalendarError::CredentialExists => ErrorKind::Conflict,
            CalendarError::MissingRefreshToken => ErrorKind::Validation,
            CalendarError::NotLinked(_) | CalendarError::TaskNotFound => ErrorKind::NotFound,
            CalendarError::NoPermission => ErrorKind::Forbidden,
            CalendarError::Http(_) | CalendarError::Provider { .. } | CalendarError::Database(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Pushes task changes to assignees' external calendars
#[async_trait]
pub trait CalendarSync: Send + Sync {
    /// Creates or updates the event for `task` in each credential's calendar
    async fn upsert_event(
        &self,
        task: &Task,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError>;

    /// Removes the event for `task_id` from each credential's calendar
    async fn delete_event(
        &self,
        task_id: Uuid,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError>;
}

/// Calendar that accepts every call and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCalendar;

#[async_trait]
impl CalendarSync for NoopCalendar {
    async fn upsert_event(
        &self,
        _task: &Task,
        _credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        Ok(())
    }

    async fn delete_event(
        &self,
        _task_id: Uuid,
        _credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        Ok(())
    }
}

/// Provider-side event ID for a task: the UUID without dashes
pub fn event_id(task_id: Uuid) -> String {
    task_id.simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOverride {
    pub method: &'static str,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

/// Calendar event derived from a task
///
/// The event ends at the deadline and starts `estimated_days` before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub reminders: Reminders,
}

impl CalendarEvent {
    pub fn from_task(task: &Task, time_zone: &str) -> Self {
        let start = event_start(task.deadline, task.estimated_days);
        let at = |instant: DateTime<Utc>| EventTime {
            date_time: instant.to_rfc3339(),
            time_zone: time_zone.to_string(),
        };

        Self {
            id: event_id(task.id),
            summary: task.title.clone(),
            description: task.description.clone(),
            start: at(start),
            end: at(task.deadline),
            reminders: Reminders {
                use_default: false,
                overrides: vec![
                    ReminderOverride {
                        method: "email",
                        minutes: 24 * 60,
                    },
                    ReminderOverride {
                        method: "popup",
                        minutes: 10,
                    },
                ],
            },
        }
    }
}

/// Out-of-range estimates collapse the event onto the deadline
fn event_start(deadline: DateTime<Utc>, estimated_days: Option<f32>) -> DateTime<Utc> {
    let days = estimated_days.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0);
    let seconds = (f64::from(days) * 86_400.0).round() as i64;

    Duration::try_seconds(seconds)
        .and_then(|span| deadline.checked_sub_signed(span))
        .unwrap_or(deadline)
}

async fn assignee_credentials(
    pool: &PgPool,
    task_id: Uuid,
) -> Result<Vec<CalendarCredential>, sqlx::Error> {
    let assignees = TaskAssignment::assignee_ids(pool, task_id).await?;
    CalendarCredential::find_for_users(pool, &assignees).await
}

/// Upserts the task's event for every assignee with linked credentials
///
/// Does nothing when no assignee has credentials. Errors are logged and
/// swallowed.
pub async fn sync_task_best_effort(pool: &PgPool, calendar: &dyn CalendarSync, task: &Task) {
    let credentials = match assignee_credentials(pool, task.id).await {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Could not load calendar credentials");
            return;
        }
    };

    if credentials.is_empty() {
        debug!(task_id = %task.id, "No linked calendars, skipping sync");
        return;
    }

    if let Err(e) = calendar.upsert_event(task, &credentials).await {
        warn!(task_id = %task.id, error = %e, "Calendar sync failed");
    }
}

/// Loads the credentials to use when the task is deleted
///
/// Must run before the assignment rows are removed.
pub async fn credentials_for_removal(pool: &PgPool, task_id: Uuid) -> Vec<CalendarCredential> {
    assignee_credentials(pool, task_id)
        .await
        .unwrap_or_else(|e| {
            warn!(task_id = %task_id, error = %e, "Could not load calendar credentials");
            Vec::new()
        })
}

/// Credentials of users being unassigned from `task_id`
pub async fn credentials_of(
    pool: &PgPool,
    task_id: Uuid,
    users: &[Uuid],
) -> Vec<CalendarCredential> {
    if users.is_empty() {
        return Vec::new();
    }

    CalendarCredential::find_for_users(pool, users)
        .await
        .unwrap_or_else(|e| {
            warn!(task_id = %task_id, error = %e, "Could not load calendar credentials");
            Vec::new()
        })
}

/// Deletes the task's event from the given calendars, swallowing errors
pub async fn remove_task_best_effort(
    calendar: &dyn CalendarSync,
    task_id: Uuid,
    credentials: &[CalendarCredential],
) {
    if credentials.is_empty() {
        return;
    }

    if let Err(e) = calendar.delete_event(task_id, credentials).await {
        warn!(task_id = %task_id, error = %e, "Calendar event removal failed");
    }
}

/// Exchanges an OAuth code and stores the resulting credentials for `user_id`
pub async fn link_account(
    pool: &PgPool,
    google: &google::GoogleCalendar,
    user_id: Uuid,
    code: &str,
) -> Result<CalendarCredential, CalendarError> {
    if CalendarCredential::exists(pool, user_id).await? {
        return Err(CalendarError::CredentialExists);
    }

    let tokens = google.exchange_code(code).await?;
    let refresh_token = tokens
        .refresh_token
        .ok_or(CalendarError::MissingRefreshToken)?;

    let credential = CalendarCredential::create(pool, user_id, &tokens.access_token, &refresh_token)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CalendarError::CredentialExists
            } else {
                CalendarError::Database(e)
            }
        })?;

    info!(user_id = %user_id, "Calendar linked");
    Ok(credential)
}

/// Forgets the user's calendar credentials
pub async fn unlink_account(pool: &PgPool, user_id: Uuid) -> Result<(), CalendarError> {
    if !CalendarCredential::delete(pool, user_id).await? {
        return Err(CalendarError::NotLinked(CalendarOp::ClearTokens));
    }

    info!(user_id = %user_id, "Calendar unlinked");
    Ok(())
}

/// Pushes a visible task into the caller's own calendar
///
/// Unlike the best-effort hooks, failures are returned.
pub async fn sync_task_for_user(
    pool: &PgPool,
    calendar: &dyn CalendarSync,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<(), CalendarError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(CalendarError::TaskNotFound)?;

    if !authorization::can_view(pool, user_id, &task).await? {
        return Err(CalendarError::NoPermission);
    }

    let credential = CalendarCredential::find(pool, user_id)
        .await?
        .ok_or(CalendarError::NotLinked(CalendarOp::Sync))?;

    calendar.upsert_event(&task, &[credential]).await
}
