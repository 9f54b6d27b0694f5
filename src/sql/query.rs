//! Statement execution: single row, many rows, and writes.

use super::named::{NamedQuery, ToNamedArgs};
use super::params::PgBindValue;
use crate::context::RequestContext;
use crate::error::AppError;
use futures::TryStreamExt;
use regex::Regex;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgExecutor, Row};
use std::sync::OnceLock;

/// Message for storage-level "no rows".
pub const DATA_NOT_FOUND: &str = "data not found";

/// Outcome of a write statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DbResult {
    pub last_insert_id: i64,
    pub affected_rows: u64,
}

/// Translate driver errors into the service's error kinds. Unique violations
/// become [`AppError::DuplicateEntry`]; everything else is left as a database
/// error for the caller to wrap.
pub fn translate(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateEntry,
        sqlx::Error::RowNotFound => AppError::NotFound(DATA_NOT_FOUND.into()),
        other => AppError::Db(other),
    }
}

fn prepare<A: ToNamedArgs + ?Sized>(
    ctx: &RequestContext,
    op: &'static str,
    query: &str,
    args: &A,
) -> Result<(NamedQuery, Vec<PgBindValue>), AppError> {
    let q = NamedQuery::parse(query);
    let values = q.bind(&args.to_named_args()).map_err(|e| e.context(op))?;
    tracing::debug!(trace_id = %ctx.trace_id(), op, query = %q.render(&values), "database");
    Ok((q, values))
}

/// Fetch exactly one row. Zero rows is [`AppError::NotFound`]; more than one
/// is [`AppError::MultipleRows`].
pub async fn query_one<'e, T, E, A>(
    ctx: &RequestContext,
    exec: E,
    query: &str,
    args: &A,
) -> Result<T, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: PgExecutor<'e>,
    A: ToNamedArgs + ?Sized,
{
    let (q, values) = prepare(ctx, "query_one", query, args)?;
    let mut stmt = sqlx::query_as::<_, T>(&q.sql);
    for v in values {
        stmt = stmt.bind(v);
    }
    let mut rows = stmt.fetch(exec);
    let first = rows
        .try_next()
        .await
        .map_err(|e| translate(e).context("query_one"))?
        .ok_or_else(|| AppError::NotFound(DATA_NOT_FOUND.into()))?;
    if rows
        .try_next()
        .await
        .map_err(|e| translate(e).context("query_one"))?
        .is_some()
    {
        return Err(AppError::MultipleRows);
    }
    Ok(first)
}

/// Fetch every matching row; none is an empty vector.
pub async fn query_many<'e, T, E, A>(
    ctx: &RequestContext,
    exec: E,
    query: &str,
    args: &A,
) -> Result<Vec<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: PgExecutor<'e>,
    A: ToNamedArgs + ?Sized,
{
    let (q, values) = prepare(ctx, "query_many", query, args)?;
    let mut stmt = sqlx::query_as::<_, T>(&q.sql);
    for v in values {
        stmt = stmt.bind(v);
    }
    stmt.fetch_all(exec)
        .await
        .map_err(|e| translate(e).context("query_many"))
}

fn has_returning(sql: &str) -> bool {
    static RETURNING: OnceLock<Option<Regex>> = OnceLock::new();
    RETURNING
        .get_or_init(|| Regex::new(r"(?i)\bRETURNING\b").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(sql))
}

/// Run an insert, update or delete. With a `RETURNING` clause the first
/// column of the first row is reported as the last inserted id.
pub async fn execute<'e, E, A>(
    ctx: &RequestContext,
    exec: E,
    query: &str,
    args: &A,
) -> Result<DbResult, AppError>
where
    E: PgExecutor<'e>,
    A: ToNamedArgs + ?Sized,
{
    let (q, values) = prepare(ctx, "execute", query, args)?;
    let mut stmt = sqlx::query(&q.sql);
    for v in values {
        stmt = stmt.bind(v);
    }
    if has_returning(&q.sql) {
        let rows = stmt
            .fetch_all(exec)
            .await
            .map_err(|e| translate(e).context("execute"))?;
        let last_insert_id = rows
            .first()
            .and_then(|r| r.try_get::<i64, _>(0).ok())
            .unwrap_or_default();
        return Ok(DbResult {
            last_insert_id,
            affected_rows: rows.len() as u64,
        });
    }
    let res = stmt
        .execute(exec)
        .await
        .map_err(|e| translate(e).context("execute"))?;
    Ok(DbResult {
        last_insert_id: 0,
        affected_rows: res.rows_affected(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returning_detection_is_word_bounded() {
        assert!(has_returning("INSERT INTO t (a) VALUES ($1) RETURNING id"));
        assert!(has_returning("insert into t (a) values ($1) returning id"));
        assert!(!has_returning("UPDATE t SET returning_user = $1"));
    }

    #[test]
    fn row_not_found_translates_to_not_found() {
        let err = translate(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), DATA_NOT_FOUND);
    }

    #[test]
    fn other_driver_errors_stay_unclassified() {
        let err = translate(sqlx::Error::PoolTimedOut).context("execute");
        assert_eq!(
            err.classify().status,
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
