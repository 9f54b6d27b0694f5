use crate::api::{handler, middleware, Handler, Middleware};
use crate::context::RequestContext;
use axum::{extract::Request, response::IntoResponse};
use std::sync::Arc;

/// Turns every error from the rest of the chain into a response through the
/// classifier. Errors that require shutdown are still answered; their
/// response carries a [`crate::api::ShutdownRequested`] marker for the router.
pub fn errors() -> Middleware {
    middleware(|next: Handler| {
        handler(move |ctx: RequestContext, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let err = match next(ctx.clone(), req).await {
                    Ok(resp) => return Ok(resp),
                    Err(err) => err,
                };

                tracing::error!(trace_id = %ctx.trace_id(), error = %err, "CLIENT ERROR");
                ctx.set_error();
                Ok(err.into_response())
            }
        })
    })
}
