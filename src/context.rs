//! Per-request values: trace id, start time, route path, error flag.
//!
//! A [`RequestContext`] is created once by the router for every matched
//! request and handed to each middleware and handler. The same handle is
//! stored in the request extensions so axum-native code can reach it with
//! [`RequestContext::get`].

use crate::error::AppError;
use crate::extractors::headers::TRACER_UID_HEADER;
use axum::http::{Extensions, HeaderMap};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Snapshot of the values tracked for one request.
#[derive(Clone, Debug)]
pub struct ContextValues {
    pub trace_id: String,
    pub now: DateTime<Utc>,
    pub path: String,
    pub is_error: bool,
}

#[derive(Debug)]
struct Inner {
    trace_id: String,
    now: DateTime<Utc>,
    started: Instant,
    path: Mutex<String>,
    is_error: AtomicBool,
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

impl RequestContext {
    pub fn new(trace_id: impl Into<String>, path: impl Into<String>) -> Self {
        RequestContext {
            inner: Arc::new(Inner {
                trace_id: trace_id.into(),
                now: Utc::now(),
                started: Instant::now(),
                path: Mutex::new(path.into()),
                is_error: AtomicBool::new(false),
            }),
        }
    }

    /// Create the context for an inbound request and store it in `extensions`.
    /// A valid `tracer_uid` header becomes the trace id; otherwise a fresh one
    /// is generated.
    pub fn attach(headers: &HeaderMap, extensions: &mut Extensions, path: &str) -> Self {
        let trace_id = headers
            .get(TRACER_UID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
            .unwrap_or_else(uuid::Uuid::new_v4)
            .to_string();
        let ctx = RequestContext::new(trace_id, path);
        extensions.insert(ctx.clone());
        ctx
    }

    /// Fetch the context stored by [`RequestContext::attach`]. Its absence
    /// means the request bypassed the router entry point, which only a
    /// misconfigured chain can cause.
    pub fn get(extensions: &Extensions) -> Result<Self, AppError> {
        extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::Shutdown("request context missing".into()))
    }

    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.now
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.inner.started.elapsed().as_millis()
    }

    pub fn path(&self) -> String {
        self.inner
            .path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_path(&self, path: impl Into<String>) {
        *self.inner.path.lock().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    pub fn set_error(&self) {
        self.inner.is_error.store(true, Ordering::Release);
    }

    pub fn is_error(&self) -> bool {
        self.inner.is_error.load(Ordering::Acquire)
    }

    pub fn values(&self) -> ContextValues {
        ContextValues {
            trace_id: self.inner.trace_id.clone(),
            now: self.inner.now,
            path: self.path(),
            is_error: self.is_error(),
        }
    }
}
