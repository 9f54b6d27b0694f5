use crate::api::{handler, middleware, Handler, Middleware};
use crate::context::RequestContext;
use crate::extractors::RequiredHeaders;
use axum::extract::Request;
use std::sync::Arc;

/// Rejects requests whose identity headers are missing or not UUID v4
/// before any business logic runs.
pub fn headers() -> Middleware {
    middleware(|next: Handler| {
        handler(move |ctx: RequestContext, req: Request| {
            let next = Arc::clone(&next);
            async move {
                RequiredHeaders::from_headers(req.headers()).check().into_result()?;
                next(ctx, req).await
            }
        })
    })
}
