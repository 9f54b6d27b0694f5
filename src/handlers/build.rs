use super::query_params;
use crate::api::{decode, param, respond};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::response::{success_many, success_one};
use crate::service::{BuildCore, NewBuild, UpdateBuild};
use crate::sql::{Pagination, PaginationConfig};
use crate::store::build::SORTABLE;
use axum::{extract::Request, http::StatusCode, response::Response};

pub struct BuildHandlers {
    core: BuildCore,
    pagination: PaginationConfig,
}

impl BuildHandlers {
    pub fn new(core: BuildCore, pagination: PaginationConfig) -> Self {
        BuildHandlers { core, pagination }
    }

    /// POST /v1/build
    pub async fn create(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let nb: NewBuild = decode(req).await?;
        let b = self.core.create(&ctx, nb).await?;
        Ok(success_one(StatusCode::CREATED, b))
    }

    /// GET /v1/build
    pub async fn query(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let page = Pagination::from_query(&query_params(&req)?, &self.pagination, SORTABLE)?;
        let builds = self.core.query(&ctx, &page).await?;
        Ok(success_many(builds, &page))
    }

    /// GET /v1/build/:id
    pub async fn query_by_id(
        &self,
        ctx: RequestContext,
        req: Request,
    ) -> Result<Response, AppError> {
        let b = self.core.query_by_id(&ctx, &param(&req, "id")).await?;
        Ok(success_one(StatusCode::OK, b))
    }

    /// PUT /v1/build/:id
    pub async fn update(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let id = param(&req, "id");
        let ub: UpdateBuild = decode(req).await?;
        let b = self.core.update(&ctx, &id, ub).await?;
        Ok(success_one(StatusCode::OK, b))
    }

    /// DELETE /v1/build/:id
    pub async fn delete(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        self.core.delete(&ctx, &param(&req, "id")).await?;
        Ok(respond(StatusCode::NO_CONTENT, ()))
    }

    /// POST /v1/build/:id/undelete
    pub async fn undelete(&self, ctx: RequestContext, req: Request) -> Result<Response, AppError> {
        let b = self.core.undelete(&ctx, &param(&req, "id")).await?;
        Ok(success_one(StatusCode::OK, b))
    }
}
