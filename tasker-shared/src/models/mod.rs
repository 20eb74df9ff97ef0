/// Database models for Tasker
///
/// Each model owns its table's SQL. Every operation takes an executor
/// (`&PgPool` or `&mut *transaction`) so callers decide the transaction
/// boundary.
///
/// # Models
///
/// - `user`: user accounts
/// - `connection`: pairwise user connections and pending requests
/// - `task`: tasks and the `TaskDetails` read model
/// - `task_assignment`: task-to-user links
/// - `calendar_credential`: external calendar OAuth tokens
///
/// # Example
///
/// ```no_run
/// use tasker_shared::models::connection::{Connection, ConnectionStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, a: Uuid, b: Uuid) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// Connection::create(&mut *tx, a, b).await?;
/// tx.commit().await?;
///
/// assert_eq!(Connection::status(&pool, b, a).await?, ConnectionStatus::Requested);
/// # Ok(())
/// # }
/// ```

pub mod calendar_credential;
pub mod connection;
pub mod task;
pub mod task_assignment;
pub mod user;

/// True if the error is a PostgreSQL unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
