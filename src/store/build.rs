//! SQL for the `build` table.

use crate::context::RequestContext;
use crate::error::{AppError, ResultExt};
use crate::sql::{execute, query_many, query_one, DbResult, NamedArgs, Pagination, ToNamedArgs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

pub const SORTABLE: &[&str] = &[
    "id",
    "label",
    "commit_sha",
    "build_status_id",
    "created_on",
    "updated_on",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Build {
    pub id: i64,
    pub uuid: Uuid,
    pub label: String,
    pub commit_sha: String,
    pub build_status_id: i64,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<DateTime<Utc>>,
}

impl ToNamedArgs for Build {
    fn to_named_args(&self) -> NamedArgs {
        NamedArgs::new()
            .add("id", self.id)
            .add("uuid", self.uuid)
            .add("label", self.label.as_str())
            .add("commit_sha", self.commit_sha.as_str())
            .add("build_status_id", self.build_status_id)
            .add("created_on", self.created_on)
            .add("updated_on", self.updated_on)
            .add("deleted_on", self.deleted_on)
    }
}

pub async fn create<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    b: &Build,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    INSERT INTO build
        (uuid, label, commit_sha, build_status_id, created_on, updated_on)
    VALUES
        (:uuid, :label, :commit_sha, :build_status_id, :created_on, :updated_on)
    RETURNING id"#;

    execute(ctx, exec, Q, b).await.context("inserting build")
}

pub async fn update<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    b: &Build,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    UPDATE
        build
    SET
        label = :label,
        commit_sha = :commit_sha,
        build_status_id = :build_status_id,
        updated_on = :updated_on
    WHERE
        id = :id"#;

    execute(ctx, exec, Q, b)
        .await
        .context(format!("updating build id[{}]", b.id))
}

pub async fn delete<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
    now: DateTime<Utc>,
) -> Result<DbResult, AppError> {
    const Q: &str = r#"
    UPDATE
        build
    SET
        deleted_on = :deleted_on
    WHERE
        id = :id"#;

    let args = NamedArgs::new().add("id", id).add("deleted_on", now);
    execute(ctx, exec, Q, &args)
        .await
        .context(format!("deleting build id[{id}]"))
}

pub async fn undelete<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
) -> Result<DbResult, AppError> {
    const Q: &str = "UPDATE build SET deleted_on = NULL WHERE id = :id";

    execute(ctx, exec, Q, &NamedArgs::new().add("id", id))
        .await
        .context(format!("undeleting build id[{id}]"))
}

pub async fn query<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    page: &Pagination,
) -> Result<Vec<Build>, AppError> {
    let q = page.apply(
        r#"
    SELECT
        id, uuid, label, commit_sha, build_status_id, created_on, updated_on, deleted_on
    FROM
        build
    WHERE
        deleted_on IS NULL"#,
    );

    query_many(ctx, exec, &q, &()).await.context("selecting builds")
}

pub async fn query_by_id<'e, E: PgExecutor<'e>>(
    ctx: &RequestContext,
    exec: E,
    id: i64,
) -> Result<Build, AppError> {
    const Q: &str = r#"
    SELECT
        id, uuid, label, commit_sha, build_status_id, created_on, updated_on, deleted_on
    FROM
        build
    WHERE
        id = :id
        AND deleted_on IS NULL"#;

    query_one(ctx, exec, Q, &NamedArgs::new().add("id", id))
        .await
        .context(format!("selecting build by ID[{id}]"))
}
