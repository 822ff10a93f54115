//! Schema migrations and the integration settings (`configs`) table.

use sqlx::{Executor, PgPool, Postgres};

use crate::error::{DataError, Result, map_query_err};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error when migration execution fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator
        .run(pool)
        .await
        .map_err(|source| DataError::MigrationFailed { source })?;
    Ok(())
}

/// Load the value stored under `key`, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn fetch_config_value<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, String>("SELECT value FROM configs WHERE key = $1")
        .bind(key)
        .fetch_optional(executor)
        .await
        .map_err(map_query_err("fetch config value"))
}

/// Insert or overwrite the value stored under `key`.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn upsert_config_value<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO configs (key, value) VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await
    .map_err(map_query_err("upsert config value"))?;
    Ok(())
}
