use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates the SQLite pool, creating the database file if it is missing.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Opening SQLite database {database_url}");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL '{database_url}'"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the candidates table and its index. Safe to run on every start.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id                      TEXT PRIMARY KEY,
            created_at              TEXT NOT NULL,
            full_name               TEXT NOT NULL,
            raw_summary             TEXT NOT NULL,
            retention_score         REAL NOT NULL,
            risk_factors            TEXT NOT NULL,
            vec_skills_count        INTEGER NOT NULL,
            vec_years_experience    REAL NOT NULL,
            vec_commute_minutes     INTEGER NOT NULL,
            vec_shift_preference    INTEGER NOT NULL,
            vec_salary_expectation  INTEGER NOT NULL,
            vec_has_certifications  INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create candidates table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_candidates_created_at ON candidates (created_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create candidates index")?;

    Ok(())
}

/// Private in-memory database. One connection that never expires, since every new
/// connection to `sqlite::memory:` would open an empty database.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = memory_pool().await;
        init_schema(&pool).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_create_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        let url = format!("sqlite://{}", path.display());
        let pool = create_pool(&url).await.unwrap();
        init_schema(&pool).await.unwrap();
        assert!(path.exists());
    }
}
