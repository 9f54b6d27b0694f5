//! Version 1 resource routes.

use crate::api::{handler, Api, Handler};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::handlers::{BuildHandlers, BuildStatusHandlers};
use crate::service::{BuildCore, BuildStatusCore};
use crate::state::AppState;
use axum::{extract::Request, response::Response, routing::MethodFilter};
use std::future::Future;
use std::sync::Arc;

/// Adapt a method on a shared handler set into a [`Handler`].
fn bind<H, F, Fut>(h: &Arc<H>, f: F) -> Handler
where
    H: Send + Sync + 'static,
    F: Fn(Arc<H>, RequestContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    let h = Arc::clone(h);
    handler(move |ctx, req| f(Arc::clone(&h), ctx, req))
}

pub fn routes(api: &mut Api, state: &AppState) {
    let pagination = state.config.pagination;

    let bs = Arc::new(BuildStatusHandlers::new(
        BuildStatusCore::new(Arc::clone(&state.tran)),
        pagination,
    ));
    api.handle(
        MethodFilter::POST,
        "/v1/build_status",
        bind(&bs, |h, ctx, req| async move { h.create(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::GET,
        "/v1/build_status",
        bind(&bs, |h, ctx, req| async move { h.query(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::GET,
        "/v1/build_status/:id",
        bind(&bs, |h, ctx, req| async move { h.query_by_id(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::PUT,
        "/v1/build_status/:id",
        bind(&bs, |h, ctx, req| async move { h.update(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::DELETE,
        "/v1/build_status/:id",
        bind(&bs, |h, ctx, req| async move { h.delete(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::POST,
        "/v1/build_status/:id/undelete",
        bind(&bs, |h, ctx, req| async move { h.undelete(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::GET,
        "/v1/build_status/alias/:alias",
        bind(&bs, |h, ctx, req| async move { h.query_by_alias(ctx, req).await }),
        &[],
    );

    let bd = Arc::new(BuildHandlers::new(
        BuildCore::new(Arc::clone(&state.tran)),
        pagination,
    ));
    api.handle(
        MethodFilter::POST,
        "/v1/build",
        bind(&bd, |h, ctx, req| async move { h.create(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::GET,
        "/v1/build",
        bind(&bd, |h, ctx, req| async move { h.query(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::GET,
        "/v1/build/:id",
        bind(&bd, |h, ctx, req| async move { h.query_by_id(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::PUT,
        "/v1/build/:id",
        bind(&bd, |h, ctx, req| async move { h.update(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::DELETE,
        "/v1/build/:id",
        bind(&bd, |h, ctx, req| async move { h.delete(ctx, req).await }),
        &[],
    );
    api.handle(
        MethodFilter::POST,
        "/v1/build/:id/undelete",
        bind(&bd, |h, ctx, req| async move { h.undelete(ctx, req).await }),
        &[],
    );
}
