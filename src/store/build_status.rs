//! SQL for the `build_status` table.

use crate::context::RequestContext;
use crate::error::{AppError, ResultExt};
use crate::sql::{execute, query_many, query_one, DbResult, NamedArgs, Pagination, ToNamedArgs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// Columns a status listing may be sorted by. The first is the default.
pub const SORTABLE: &[&str] = &["id", "alias", "name", "created_on", "updated_on"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuildStatus {
    pub id: i64,
    pub alias: String,
    pub name: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<DateTime<Utc>>,
}

impl ToNamedArgs for BuildStatus {
    fn to_named_args(&self) -> NamedArgs {
        NamedArgs::new()
            .add("id", self.id)
            .add("alias", self.alias.as_str())
            .add("name", self.name.as_str())
            .add("created_on", self.created_on)
            .add("updated_on", self.updated_on)
            .add("deleted_on", self.deleted_on)
    }
}

pub async fn create<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    bs: &BuildStatus,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    INSERT INTO build_status
        (alias, name, created_on, updated_on)
    VALUES
        (:alias, :name, :created_on, :updated_on)
    RETURNING id"#;

    execute(ctx, exec, Q, bs).await.context("inserting build status")
}

pub async fn update<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    bs: &BuildStatus,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    UPDATE
        build_status
    SET
        alias = :alias,
        name = :name,
        updated_on = :updated_on
    WHERE
        id = :id"#;

    execute(ctx, exec, Q, bs)
        .await
        .context(format!("updating build status id[{}]", bs.id))
}

/// Soft delete: stamps `deleted_on`.
pub async fn delete<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
    now: DateTime<Utc>,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    UPDATE
        build_status
    SET
        deleted_on = :deleted_on
    WHERE
        id = :id"#;

    let args = NamedArgs::new().add("id", id).add("deleted_on", now);
    execute(ctx, exec, Q, &args)
        .await
        .context(format!("deleting build status id[{id}]"))
}

pub async fn undelete<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    UPDATE
        build_status
    SET
        deleted_on = NULL
    WHERE
        id = :id"#;

    execute(ctx, exec, Q, &NamedArgs::new().add("id", id))
        .await
        .context(format!("undeleting build status id[{id}]"))
}

/// One page of live statuses.
pub async fn query<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    page: &Pagination,
) -> Result<Vec<BuildStatus>, AppError> {
    let q = page.apply(
        r#"
    SELECT
        id, alias, name, created_on, updated_on, deleted_on
    FROM
        build_status
    WHERE
        deleted_on IS NULL"#,
    );

    query_many(ctx, exec, &q, &()).await.context("selecting build statuses")
}

pub async fn query_by_id<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
) -> Result<BuildStatus, AppError> {
    const Q: &str = r#"
    SELECT
        id, alias, name, created_on, updated_on, deleted_on
    FROM
        build_status
    WHERE
        id = :id
        AND deleted_on IS NULL"#;

    query_one(ctx, exec, Q, &NamedArgs::new().add("id", id))
        .await
        .context(format!("selecting build status by ID[{id}]"))
}

pub async fn query_by_alias<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    alias: &str,
) -> Result<BuildStatus, AppError> {
    const Q: &str = r#"
    SELECT
        id, alias, name, created_on, updated_on, deleted_on
    FROM
        build_status
    WHERE
        alias = :alias
        AND deleted_on IS NULL"#;

    query_one(ctx, exec, Q, &NamedArgs::new().add("alias", alias))
        .await
        .context(format!("selecting build status by alias[{alias:?}]"))
}
