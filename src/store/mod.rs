//! Database bootstrap (pool, connectivity probe, schema) and the per-resource
//! SQL. Statements in [`build`] and [`build_status`] take any executor, so the
//! same function runs on the pool or inside a transaction.

pub mod build;
pub mod build_status;
pub mod tran;

pub use tran::{Transactor, TxCoordinator, TxHandle};

use crate::error::{AppError, ConfigError};
use axum::http::StatusCode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Open the pool with at most `max_open` connections, keeping `min_conns` of
/// them open once established. Connections are established lazily; call
/// [`status_check`] to wait for the server.
pub fn connect(database_url: &str, max_open: u32, min_conns: u32) -> Result<PgPool, AppError> {
    let opts = PgConnectOptions::from_str(database_url).map_err(|e| ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: e.to_string(),
    })?;
    Ok(PgPoolOptions::new()
        .max_connections(max_open.max(1))
        .min_connections(min_conns.min(max_open))
        .connect_lazy_with(opts))
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

/// Succeeds once the database answers a round trip. Pings are retried with
/// a linear backoff (`attempt * 100ms`) until `timeout` elapses.
pub async fn status_check(pool: &PgPool, timeout: Duration) -> Result<(), AppError> {
    let deadline = Instant::now() + timeout;
    let unavailable = |reason: String| {
        AppError::request(StatusCode::SERVICE_UNAVAILABLE, format!("database not ready: {reason}"))
    };

    let mut attempts: u32 = 1;
    loop {
        let err = match tokio::time::timeout_at(deadline, ping(pool)).await {
            Ok(Ok(())) => break,
            Ok(Err(err)) => err.to_string(),
            Err(_) => "deadline exceeded".to_string(),
        };
        tracing::debug!(attempts, error = %err, "database ping failed");
        tokio::time::sleep(Duration::from_millis(100) * attempts).await;
        if Instant::now() >= deadline {
            return Err(unavailable(err));
        }
        attempts += 1;
    }

    let ok: bool = tokio::time::timeout_at(
        deadline,
        sqlx::query_scalar("SELECT true").fetch_one(pool),
    )
    .await
    .map_err(|_| unavailable("deadline exceeded".into()))??;
    if !ok {
        return Err(unavailable("unexpected probe result".into()));
    }
    Ok(())
}

/// Create the resource tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), AppError> {
    const DDL: &[&str] = &[
        r#"
        CREATE TABLE IF NOT EXISTS build_status (
            id BIGSERIAL PRIMARY KEY,
            alias TEXT NOT NULL,
            name TEXT NOT NULL,
            created_on TIMESTAMPTZ NOT NULL,
            updated_on TIMESTAMPTZ NOT NULL,
            deleted_on TIMESTAMPTZ
        )
        "#,
        "CREATE UNIQUE INDEX IF NOT EXISTS build_status_alias_key ON build_status (alias)",
        r#"
        CREATE TABLE IF NOT EXISTS build (
            id BIGSERIAL PRIMARY KEY,
            uuid UUID NOT NULL,
            label TEXT NOT NULL,
            commit_sha TEXT NOT NULL,
            build_status_id BIGINT NOT NULL REFERENCES build_status (id),
            created_on TIMESTAMPTZ NOT NULL,
            updated_on TIMESTAMPTZ NOT NULL,
            deleted_on TIMESTAMPTZ
        )
        "#,
        "CREATE UNIQUE INDEX IF NOT EXISTS build_uuid_key ON build (uuid)",
    ];
    for stmt in DDL {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_db_name(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: e.to_string(),
    })?;
    let mut conn = opts.connect().await?;
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", crate::sql::pagination::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    conn.close().await?;
    Ok(())
}

/// `postgres://u@h/name?x=y` -> (`postgres://u@h/postgres?x=y`, `name`)
fn split_db_name(url: &str) -> Result<(String, String), AppError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: reason.to_string(),
    };
    let scheme_end = url.find("://").ok_or_else(|| invalid("missing scheme"))? + 3;
    let path_start = url
        .get(scheme_end..)
        .and_then(|rest| rest.find('/'))
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| invalid("no database name"))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name, Some(q)),
        None => (path_and_query, None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{base}postgres?{q}"),
        None => format!("{base}postgres"),
    };
    Ok((admin_url, db_name.trim().to_string()))
}
