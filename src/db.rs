use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::include_res;

/// Opens (creating if needed) the database and applies the schema.
///
/// In-memory databases are private to one connection, so their pool is
/// pinned to a single connection that never expires.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {database_url:?}"))?
        .create_if_missing(true);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(16)
    };

    let db_pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {database_url}"))?;

    apply_schema(&db_pool).await.context("applying schema")?;
    Ok(db_pool)
}

/// Creates the `snippets` table and its indexes if they are missing.
pub async fn apply_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(include_res!(str, "/sql/schema.sql"))
        .execute(db_pool)
        .await?;
    Ok(())
}
