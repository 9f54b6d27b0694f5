//! Build business rules on top of [`crate::store::build`].

use super::build_status::parse_id;
use super::validation::Validator;
use crate::context::RequestContext;
use crate::error::{AppError, FieldErrors, ResultExt};
use crate::sql::Pagination;
use crate::store::build::{self as store, Build};
use crate::store::{build_status, TxCoordinator};
use futures::FutureExt;
use serde::Deserialize;
use sqlx::PgConnection;
use std::sync::Arc;

pub const NOT_FOUND: &str = "build not found";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBuild {
    pub label: Option<String>,
    pub commit_sha: Option<String>,
    pub build_status_id: Option<i64>,
}

impl NewBuild {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(label) = v.required("label", self.label.as_deref()) {
            v.slug("label", label);
        }
        if let Some(sha) = v.required("commit_sha", self.commit_sha.as_deref()) {
            v.notblank("commit_sha", sha);
        }
        v.required_id("build_status_id", self.build_status_id);
        v.finish()
    }
}

/// Fields left out are not changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBuild {
    pub label: Option<String>,
    pub commit_sha: Option<String>,
    pub build_status_id: Option<i64>,
}

impl UpdateBuild {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.optional("label", self.label.as_deref(), |v, f, s| {
            v.slug(f, s);
        })
        .optional("commit_sha", self.commit_sha.as_deref(), |v, f, s| {
            v.notblank(f, s);
        });
        if self.build_status_id.is_some() {
            v.required_id("build_status_id", self.build_status_id);
        }
        v.finish()
    }
}

fn not_found(e: AppError) -> AppError {
    if e.is_not_found() {
        AppError::NotFound(NOT_FOUND.into())
    } else {
        e
    }
}

/// The referenced status must exist and not be deleted.
async fn ensure_status(
    ctx: &RequestContext,
    conn: &mut PgConnection,
    id: i64,
) -> Result<(), AppError> {
    match build_status::query_by_id(ctx, conn, id).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            let mut fe = FieldErrors::new();
            fe.add("build_status_id", "not found");
            Err(AppError::Validation(fe))
        }
        Err(e) => Err(e),
    }
}

#[derive(Clone)]
pub struct BuildCore {
    tran: Arc<TxCoordinator>,
}

impl BuildCore {
    pub fn new(tran: Arc<TxCoordinator>) -> Self {
        BuildCore { tran }
    }

    /// Insert a build with a fresh UUID. The status check and the insert
    /// share one transaction.
    pub async fn create(&self, ctx: &RequestContext, nb: NewBuild) -> Result<Build, AppError> {
        nb.validate()?;
        let mut row = Build {
            id: 0,
            uuid: uuid::Uuid::new_v4(),
            label: nb.label.unwrap_or_default().trim().to_string(),
            commit_sha: nb.commit_sha.unwrap_or_default().trim().to_string(),
            build_status_id: nb.build_status_id.unwrap_or_default(),
            created_on: ctx.now(),
            updated_on: ctx.now(),
            deleted_on: None,
        };

        let c = ctx.clone();
        let ins = row.clone();
        let res = self
            .tran
            .within_tran(ctx, move |conn| {
                async move {
                    ensure_status(&c, &mut *conn, ins.build_status_id).await?;
                    store::create(&c, &mut *conn, &ins).await.context("create")
                }
                .boxed()
            })
            .await
            .context("tran")?;
        row.id = res.last_insert_id;
        Ok(row)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        ub: UpdateBuild,
    ) -> Result<Build, AppError> {
        ub.validate()?;
        let id = parse_id(id)?;
        let now = ctx.now();
        let c = ctx.clone();
        self.tran
            .within_tran(ctx, move |conn| {
                async move {
                    let mut row = store::query_by_id(&c, &mut *conn, id).await.map_err(not_found)?;
                    let mut changed = false;
                    if let Some(label) = ub.label {
                        row.label = label.trim().to_string();
                        changed = true;
                    }
                    if let Some(sha) = ub.commit_sha {
                        row.commit_sha = sha.trim().to_string();
                        changed = true;
                    }
                    if let Some(status_id) = ub.build_status_id {
                        ensure_status(&c, &mut *conn, status_id).await?;
                        row.build_status_id = status_id;
                        changed = true;
                    }
                    if !changed {
                        return Ok(row);
                    }
                    row.updated_on = now;
                    store::update(&c, &mut *conn, &row).await?;
                    Ok(row)
                }
                .boxed()
            })
            .await
            .context(format!("update id[{id}]"))
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), AppError> {
        let id = parse_id(id)?;
        let now = ctx.now();
        let c = ctx.clone();
        self.tran
            .within_tran(ctx, move |conn| {
                async move {
                    store::query_by_id(&c, &mut *conn, id).await.map_err(not_found)?;
                    store::delete(&c, &mut *conn, id, now).await?;
                    Ok(())
                }
                .boxed()
            })
            .await
            .context(format!("delete id[{id}]"))
    }

    pub async fn undelete(&self, ctx: &RequestContext, id: &str) -> Result<Build, AppError> {
        let id = parse_id(id)?;
        let c = ctx.clone();
        self.tran
            .within_tran(ctx, move |conn| {
                async move {
                    store::undelete(&c, &mut *conn, id).await?;
                    store::query_by_id(&c, &mut *conn, id).await.map_err(not_found)
                }
                .boxed()
            })
            .await
            .context(format!("undelete id[{id}]"))
    }

    pub async fn query(
        &self,
        ctx: &RequestContext,
        page: &Pagination,
    ) -> Result<Vec<Build>, AppError> {
        store::query(ctx, self.tran.db(), page).await.context("query")
    }

    pub async fn query_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Build, AppError> {
        let id = parse_id(id)?;
        store::query_by_id(ctx, self.tran.db(), id)
            .await
            .map_err(not_found)
    }
}
