//! # Schema Migrations
//!
//! SQL files in `migrations/sqlite/` are embedded at compile time and applied
//! in version order, each in its own transaction. sqlx records them in
//! `_sqlx_migrations`, so running again is a no-op.
//!
//! Applied files are never edited. A schema change is a new
//! `NNN_description.sql` with the next number.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let pending = pending_migrations(pool).await?;

    MIGRATOR.run(pool).await?;

    info!(
        applied = pending.len(),
        total = MIGRATOR.migrations.len(),
        "Checkout schema up to date"
    );
    Ok(())
}

/// Versions recorded as successfully applied. Empty on a fresh database.
pub async fn applied_versions(pool: &SqlitePool) -> DbResult<Vec<i64>> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    if tracked == 0 {
        return Ok(Vec::new());
    }

    let versions = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = 1 ORDER BY version",
    )
    .fetch_all(pool)
    .await?;
    Ok(versions)
}

/// Descriptions of embedded migrations that have not run yet.
pub async fn pending_migrations(pool: &SqlitePool) -> DbResult<Vec<String>> {
    let applied = applied_versions(pool).await?;

    Ok(MIGRATOR
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .map(|m| format!("{:03}_{}", m.version, m.description))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_has_pending_schema() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        assert!(applied_versions(db.pool()).await.unwrap().is_empty());
        let pending = pending_migrations(db.pool()).await.unwrap();
        assert_eq!(pending, vec!["001_initial schema".to_string()]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();

        assert_eq!(applied_versions(db.pool()).await.unwrap(), vec![1]);
        assert!(pending_migrations(db.pool()).await.unwrap().is_empty());
    }
}
