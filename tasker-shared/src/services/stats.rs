/// Weekly workload statistics for a user's profile
///
/// "Business" expresses assigned effort as a percentage of a five-day working
/// week: `ceil(sum(estimated_days) / 5 * 100)`, where a task without an
/// estimate counts as one day. Windows are anchored at the start of the
/// current UTC day and are half-open, so a deadline at midnight belongs to
/// exactly one of them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::users::{UserError, UserOp};
use crate::auth::authorization;
use crate::models::task::TaskStatus;

/// Days assumed for a task with no estimate
pub const DEFAULT_ESTIMATE_DAYS: f64 = 1.0;

const WORKING_DAYS_PER_WEEK: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    /// Tasks due in the next seven days
    pub tasks_this_week: i64,

    /// Workload of those tasks, in percent of a working week
    pub business_this_week: i64,

    /// Tasks completed with a deadline in the past seven days
    pub tasks_last_week: i64,

    pub business_last_week: i64,
}

/// Percentage of a working week represented by `days` of effort
pub fn business_percentage(days: f64) -> i64 {
    (days / WORKING_DAYS_PER_WEEK * 100.0).ceil() as i64
}

/// `(last_week_start, today_start, next_week_end)` for an instant
pub fn week_windows(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);

    (today - Duration::weeks(1), today, today + Duration::weeks(1))
}

async fn workload(
    pool: &PgPool,
    user: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    status: Option<TaskStatus>,
) -> Result<(i64, f64), sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT COUNT(*)::BIGINT,
               COALESCE(SUM(COALESCE(t.estimated_days, $5)), 0)::DOUBLE PRECISION
        FROM tasks t
        JOIN task_assignments ta ON ta.task_id = t.id
        WHERE ta.user_assignee = $1
          AND t.deadline >= $2 AND t.deadline < $3
          AND ($4::task_status IS NULL OR t.status = $4)
        "#,
    )
    .bind(user)
    .bind(from)
    .bind(to)
    .bind(status)
    .bind(DEFAULT_ESTIMATE_DAYS as f32)
    .fetch_one(pool)
    .await
}

/// Statistics for `user`, visible to the user and their connections
pub async fn user_stats(pool: &PgPool, viewer: Uuid, user: Uuid) -> Result<UserStats, UserError> {
    if !authorization::can_see_profile(pool, viewer, user).await? {
        return Err(UserError::NoPermission(UserOp::Stats));
    }

    let (last_week, today, next_week) = week_windows(Utc::now());

    let (tasks_this_week, days_this_week) = workload(pool, user, today, next_week, None).await?;
    let (tasks_last_week, days_last_week) =
        workload(pool, user, last_week, today, Some(TaskStatus::Done)).await?;

    Ok(UserStats {
        tasks_this_week,
        business_this_week: business_percentage(days_this_week),
        tasks_last_week,
        business_last_week: business_percentage(days_last_week),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_business_percentage() {
        assert_eq!(business_percentage(0.0), 0);
        assert_eq!(business_percentage(5.0), 100);
        assert_eq!(business_percentage(1.0), 20);
        // rounds up
        assert_eq!(business_percentage(0.01), 1);
        assert_eq!(business_percentage(7.5), 150);
    }

    #[test]
    fn test_week_windows_anchor_at_midnight() {
        let now = Utc.with_ymd_and_hms(2030, 6, 12, 15, 30, 0).unwrap();
        let (last_week, today, next_week) = week_windows(now);

        assert_eq!(today, Utc.with_ymd_and_hms(2030, 6, 12, 0, 0, 0).unwrap());
        assert_eq!(last_week, Utc.with_ymd_and_hms(2030, 6, 5, 0, 0, 0).unwrap());
        assert_eq!(next_week, Utc.with_ymd_and_hms(2030, 6, 19, 0, 0, 0).unwrap());
    }
}
