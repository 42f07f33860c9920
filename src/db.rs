//! Database module
//!
//! Schema setup and verification for the PostgreSQL store.

use sqlx::{Executor, PgPool};

/// Bundled schema; safe to apply repeatedly
const INITIAL_SCHEMA: &str = include_str!("../migrations/001_initial.sql");

/// Tables the store reads and writes
const REQUIRED_TABLES: &[&str] = &[
    "members",
    "shares",
    "saving_accounts",
    "transactions",
    "staff_api_keys",
];

/// Apply the bundled schema
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(INITIAL_SCHEMA).await?;
    tracing::info!("Database schema applied");
    Ok(())
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
