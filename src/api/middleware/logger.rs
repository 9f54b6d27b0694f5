use crate::api::{handler, middleware, Handler, Middleware};
use crate::context::RequestContext;
use axum::extract::Request;
use std::sync::Arc;

/// Logs each request on the way in and its status and latency on the way out.
pub fn logger() -> Middleware {
    middleware(|next: Handler| {
        handler(move |ctx: RequestContext, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                tracing::info!(trace_id = %ctx.trace_id(), %method, %path, "request started");

                let result = next(ctx.clone(), req).await;

                let status = match &result {
                    Ok(resp) => resp.status(),
                    Err(err) => err.classify().status,
                };
                tracing::info!(
                    trace_id = %ctx.trace_id(),
                    %method,
                    %path,
                    status = status.as_u16(),
                    elapsed_ms = ctx.elapsed_ms() as u64,
                    "request completed"
                );
                result
            }
        })
    })
}
