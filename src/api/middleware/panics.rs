use crate::api::{handler, middleware, Handler, Middleware};
use crate::context::RequestContext;
use crate::error::AppError;
use axum::extract::Request;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Converts a panic in the handler into an ordinary error so the error
/// middleware can answer it. The call to `next` happens inside the guarded
/// future, so a handler that panics before returning its future is caught too.
pub fn panics() -> Middleware {
    middleware(|next: Handler| {
        handler(move |ctx: RequestContext, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let call = {
                    let ctx = ctx.clone();
                    async move { next(ctx, req).await }
                };
                match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        let msg = panic_message(payload.as_ref());
                        tracing::error!(
                            trace_id = %ctx.trace_id(),
                            panic = %msg,
                            "recovered from panic"
                        );
                        Err(AppError::Internal(format!("PANIC [{msg}]")))
                    }
                }
            }
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
