//! Route registration and the per-request entry point.
//!
//! Handlers and middleware are plain shared closures. [`Api::handle`] wraps a
//! handler with its route middleware and then the global stack, so the first
//! middleware in a list runs outermost. The wrapped handler is mounted on an
//! axum [`Router`] behind an entry point that creates the [`RequestContext`]
//! and marks failures that must stop the process; [`shutdown::watch`] turns
//! the mark into a shutdown signal.

pub mod middleware;
pub mod shutdown;

use crate::context::RequestContext;
use crate::error::AppError;
use axum::{
    extract::Request,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter, MethodRouter},
    Json, Router,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

pub use shutdown::{Shutdown, ShutdownListener, ShutdownRequested};

pub type Handler = Arc<
    dyn Fn(RequestContext, Request) -> BoxFuture<'static, Result<Response, AppError>>
        + Send
        + Sync,
>;

pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Box an async function into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    Arc::new(move |ctx, req| f(ctx, req).boxed())
}

pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap `h` so that `mw[0]` runs first.
pub fn wrap_middleware(mw: &[Middleware], h: Handler) -> Handler {
    mw.iter().rev().fold(h, |h, m| m(h))
}

/// Path parameters captured from the route template.
#[derive(Clone, Debug, Default)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Pair `/v1/build/:id` with `/v1/build/42`. The router has already
    /// matched, so segment counts agree.
    fn extract(template: &str, path: &str) -> Self {
        let params = template
            .split('/')
            .zip(path.split('/'))
            .filter_map(|(t, p)| {
                t.strip_prefix(':')
                    .map(|name| (name.to_string(), p.to_string()))
            })
            .collect();
        PathParams(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Named path parameter, or an empty string when the route has none.
pub fn param(req: &Request, name: &str) -> String {
    req.extensions()
        .get::<PathParams>()
        .and_then(|p| p.get(name))
        .unwrap_or_default()
        .to_string()
}

/// Read the whole body as JSON.
pub async fn decode<T: DeserializeOwned>(req: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| {
            AppError::request(StatusCode::BAD_REQUEST, format!("unable to read payload: {e}"))
        })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::request(StatusCode::BAD_REQUEST, format!("unable to decode payload: {e}"))
    })
}

/// JSON response; `204 No Content` carries no body.
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(data)).into_response()
}

pub struct Api {
    routes: HashMap<String, MethodRouter>,
    shutdown: Shutdown,
    mw: Vec<Middleware>,
}

impl Api {
    pub fn new(shutdown: Shutdown, mw: Vec<Middleware>) -> Self {
        Api {
            routes: HashMap::new(),
            shutdown,
            mw,
        }
    }

    /// Register `h` for `method` on `path` (axum template syntax, e.g.
    /// `/v1/build/:id`), wrapped with `mw` and then the global middleware.
    pub fn handle(&mut self, method: MethodFilter, path: &str, h: Handler, mw: &[Middleware]) {
        let h = wrap_middleware(mw, h);
        let h = wrap_middleware(&self.mw, h);
        let template: Arc<str> = Arc::from(path);

        let entry = move |req: Request| {
            let h = Arc::clone(&h);
            let template = Arc::clone(&template);
            async move {
                let (mut parts, body) = req.into_parts();
                let ctx = RequestContext::attach(&parts.headers, &mut parts.extensions, &template);
                let params = PathParams::extract(&template, parts.uri.path());
                parts.extensions.insert(params);
                let req = Request::from_parts(parts, body);

                match h(ctx.clone(), req).await {
                    Ok(resp) => resp,
                    Err(err) => {
                        tracing::error!(
                            trace_id = %ctx.trace_id(),
                            error = %err,
                            "error escaped middleware chain"
                        );
                        let reason = err.to_string();
                        let mut resp = err.into_response();
                        if resp.extensions().get::<ShutdownRequested>().is_none() {
                            resp.extensions_mut().insert(ShutdownRequested(reason));
                        }
                        resp
                    }
                }
            }
        };

        let route = match self.routes.remove(path) {
            Some(existing) => existing.on(method, entry),
            None => on(method, entry),
        };
        self.routes.insert(path.to_string(), route);
    }

    /// Mount every route, the `path not found` fallback and the shutdown
    /// watcher.
    pub fn into_router(self) -> Router {
        let router = self
            .routes
            .into_iter()
            .fold(Router::new(), |router, (path, route)| router.route(&path, route))
            .fallback(not_found);
        shutdown::watch(router, self.shutdown)
    }
}

async fn not_found(uri: Uri) -> (StatusCode, String) {
    tracing::info!(%uri, "path not found");
    (StatusCode::NOT_FOUND, format!("path not found: {uri}"))
}
