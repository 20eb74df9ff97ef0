/// Authorization predicates over the connection graph
///
/// These decide who may be assigned a task, who may view a task, and whose
/// profile data a user may read. All of them reduce to "is this me, or is
/// this someone I am connected to (accepted connection)".
///
/// - [`can_assign`]: `candidate == actor` or connected
/// - [`can_view`]: viewer is the creator, an assignee, or connected to an
///   assignee
/// - [`can_see_profile`]: `viewer == profile` or connected

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{
    connection::{Connection, ConnectionStatus},
    task::Task,
};

/// May `actor` assign a task to `candidate`?
pub async fn can_assign(
    executor: impl PgExecutor<'_>,
    actor: Uuid,
    candidate: Uuid,
) -> Result<bool, sqlx::Error> {
    if actor == candidate {
        return Ok(true);
    }

    Ok(Connection::status(executor, actor, candidate).await? == ConnectionStatus::Connected)
}

/// Returns the candidates `actor` may NOT assign
///
/// Empty means every candidate is assignable.
pub async fn unassignable(
    executor: impl PgExecutor<'_>,
    actor: Uuid,
    candidates: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let others: Vec<Uuid> = candidates.iter().copied().filter(|c| *c != actor).collect();
    if others.is_empty() {
        return Ok(Vec::new());
    }

    let connected = Connection::connected_subset(executor, actor, &others).await?;

    Ok(others
        .into_iter()
        .filter(|candidate| !connected.contains(candidate))
        .collect())
}

/// May `viewer` see `task`?
///
/// True for the creator, for any assignee, and for anyone connected to at
/// least one current assignee.
pub async fn can_view(
    executor: impl PgExecutor<'_>,
    viewer: Uuid,
    task: &Task,
) -> Result<bool, sqlx::Error> {
    if viewer == task.creator {
        return Ok(true);
    }

    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM task_assignments ta
            WHERE ta.task_id = $2
              AND ta.user_assignee IS NOT NULL
              AND (
                  ta.user_assignee = $1
                  OR EXISTS (
                      SELECT 1 FROM connections c
                      WHERE c.accepted = TRUE
                        AND ((c.requester = $1 AND c.requestee = ta.user_assignee)
                          OR (c.requestee = $1 AND c.requester = ta.user_assignee))
                  )
              )
        )
        "#,
    )
    .bind(viewer)
    .bind(task.id)
    .fetch_one(executor)
    .await
}

/// May `viewer` read `profile`'s tasks and statistics?
pub async fn can_see_profile(
    executor: impl PgExecutor<'_>,
    viewer: Uuid,
    profile: Uuid,
) -> Result<bool, sqlx::Error> {
    if viewer == profile {
        return Ok(true);
    }

    Ok(Connection::status(executor, viewer, profile).await? == ConnectionStatus::Connected)
}
