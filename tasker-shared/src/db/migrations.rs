/// Database migrations
///
/// The SQL files live in the workspace-level `migrations/` directory and are
/// embedded into the binary at compile time.

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{debug, info, warn};

/// Embedded migrations, also used by `#[sqlx::test]` fixtures
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        embedded = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations complete");
    Ok(())
}

/// Reports how many migrations are applied compared with those embedded
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: false,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = TRUE",
    )
    .fetch_one(pool)
    .await?;

    let embedded_latest = MIGRATOR.iter().map(|m| m.version).max();

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
        is_up_to_date: latest_version == embedded_latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
