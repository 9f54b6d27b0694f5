//! Build status business rules on top of [`crate::store::build_status`].

use super::validation::{check_id, is_slug, Validator};
use crate::context::RequestContext;
use crate::error::{AppError, ResultExt};
use crate::sql::Pagination;
use crate::store::build_status::{self as store, BuildStatus};
use crate::store::TxCoordinator;
use futures::FutureExt;
use serde::Deserialize;
use sqlx::PgConnection;
use std::sync::Arc;

pub const NOT_FOUND: &str = "build status not found";
pub const INVALID_ID: &str = "ID is not in its proper form";
pub const INVALID_ALIAS: &str = "alias is not in its proper form";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBuildStatus {
    pub alias: Option<String>,
    pub name: Option<String>,
}

impl NewBuildStatus {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(alias) = v.required("alias", self.alias.as_deref()) {
            v.slug("alias", alias);
        }
        if let Some(name) = v.required("name", self.name.as_deref()) {
            v.notblank("name", name);
        }
        v.finish()
    }
}

/// Fields left out are not changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBuildStatus {
    pub alias: Option<String>,
    pub name: Option<String>,
}

impl UpdateBuildStatus {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.optional("alias", self.alias.as_deref(), |v, f, s| {
            v.slug(f, s);
        })
        .optional("name", self.name.as_deref(), |v, f, s| {
            v.notblank(f, s);
        });
        v.finish()
    }
}

pub(crate) fn parse_id(id: &str) -> Result<i64, AppError> {
    check_id(id).ok_or_else(|| AppError::InvalidId(INVALID_ID.into()))
}

fn not_found(e: AppError) -> AppError {
    if e.is_not_found() {
        AppError::NotFound(NOT_FOUND.into())
    } else {
        e
    }
}

#[derive(Clone)]
pub struct BuildStatusCore {
    tran: Arc<TxCoordinator>,
}

impl BuildStatusCore {
    pub fn new(tran: Arc<TxCoordinator>) -> Self {
        BuildStatusCore { tran }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        ns: NewBuildStatus,
    ) -> Result<BuildStatus, AppError> {
        self.create_in(ctx, None, ns).await
    }

    /// Create inside `outer` when given, otherwise in a transaction of its own.
    pub async fn create_in(
        &self,
        ctx: &RequestContext,
        outer: Option<&mut PgConnection>,
        ns: NewBuildStatus,
    ) -> Result<BuildStatus, AppError> {
        ns.validate()?;
        let mut row = BuildStatus {
            id: 0,
            alias: ns.alias.unwrap_or_default().trim().to_string(),
            name: ns.name.unwrap_or_default().trim().to_string(),
            created_on: ctx.now(),
            updated_on: ctx.now(),
            deleted_on: None,
        };

        let c = ctx.clone();
        let ins = row.clone();
        let res = self
            .tran
            .run(ctx, outer, move |conn| {
                async move { store::create(&c, conn, &ins).await.context("create") }.boxed()
            })
            .await
            .context("tran")?;
        row.id = res.last_insert_id;
        Ok(row)
    }

    /// Apply changes; the row is only written when a field was sent.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        us: UpdateBuildStatus,
    ) -> Result<BuildStatus, AppError> {
        us.validate()?;
        let id = parse_id(id)?;
        let now = ctx.now();
        let c = ctx.clone();
        self.tran
            .within_tran(ctx, move |conn| {
                async move {
                    let mut row = store::query_by_id(&c, &mut *conn, id).await.map_err(not_found)?;
                    let mut changed = false;
                    if let Some(alias) = us.alias {
                        row.alias = alias.trim().to_string();
                        changed = true;
                    }
                    if let Some(name) = us.name {
                        row.name = name.trim().to_string();
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

    pub async fn undelete(&self, ctx: &RequestContext, id: &str) -> Result<BuildStatus, AppError> {
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
    ) -> Result<Vec<BuildStatus>, AppError> {
        store::query(ctx, self.tran.db(), page).await.context("query")
    }

    pub async fn query_by_id(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<BuildStatus, AppError> {
        let id = parse_id(id)?;
        store::query_by_id(ctx, self.tran.db(), id)
            .await
            .map_err(not_found)
    }

    pub async fn query_by_alias(
        &self,
        ctx: &RequestContext,
        alias: &str,
    ) -> Result<BuildStatus, AppError> {
        if !is_slug(alias) {
            return Err(AppError::InvalidId(INVALID_ALIAS.into()));
        }
        store::query_by_alias(ctx, self.tran.db(), alias)
            .await
            .map_err(not_found)
    }

    /// Create every status in one transaction; one failure keeps none.
    pub async fn seed(
        &self,
        ctx: &RequestContext,
        data: Vec<NewBuildStatus>,
    ) -> Result<Vec<BuildStatus>, AppError> {
        let core = self.clone();
        let c = ctx.clone();
        self.tran
            .within_tran(ctx, move |conn| {
                async move {
                    let mut created = Vec::with_capacity(data.len());
                    for ns in data {
                        created.push(core.create_in(&c, Some(&mut *conn), ns).await?);
                    }
                    Ok(created)
                }
                .boxed()
            })
            .await
            .context("seeding build statuses")
    }
}
