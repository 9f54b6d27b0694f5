use super::query_params;
use crate::api::{decode, param, respond};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::response::{success_many, success_one};
use crate::service::{BuildStatusCore, NewBuildStatus, UpdateBuildStatus};
use crate::sql::{Pagination, PaginationConfig};
use crate::store::build_status::SORTABLE;
use axum::{extract::Request, http::StatusCode, response::Response};

pub struct BuildStatusHandlers {
    core: BuildStatusCore,
    pagination: PaginationConfig,
}

impl BuildStatusHandlers {
    pub fn new(core: BuildStatusCore, pagination: PaginationConfig) -> Self {
        BuildStatusHandlers { core, pagination }
    }

    pub async fn create(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let ns: NewBuildStatus = decode(req).await?;
        let bs = self.core.create(&ctx, ns).await?;
        Ok(success_one(StatusCode::CREATED, bs))
    }

    pub async fn query(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let page = Pagination::from_query(&query_params(&req)?, &self.pagination, SORTABLE)?;
        let statuses = self.core.query(&ctx, &page).await?;
        Ok(success_many(statuses, &page))
    }

    pub async fn query_by_id(
        &self,
        ctx: RequestContext,
        req: Request,
    ) -> Result<Response, AppError> {
        let bs = self.core.query_by_id(&ctx, &param(&req, "id")).await?;
        Ok(success_one(StatusCode::OK, bs))
    }

    pub async fn query_by_alias(
        &self,
        ctx: RequestContext,
        req: Request,
    ) -> Result<Response, AppError> {
        let bs = self.core.query_by_alias(&ctx, &param(&req, "alias")).await?;
        Ok(success_one(StatusCode::OK, bs))
    }

    pub async fn update(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let id = param(&req, "id");
        let us: UpdateBuildStatus = decode(req).await?;
        let bs = self.core.update(&ctx, &id, us).await?;
        Ok(success_one(StatusCode::OK, bs))
    }

    pub async fn delete(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        self.core.delete(&ctx, &param(&req, "id")).await?;
        Ok(respond(StatusCode::NO_CONTENT, ()))
    }

    pub async fn undelete(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let bs = self.core.undelete(&ctx, &param(&req, "id")).await?;
        Ok(success_one(StatusCode::OK, bs))
    }
}
