//! HTTP handlers for builds and build statuses.

pub mod build;
pub mod build_status;

pub use build::BuildHandlers;
pub use build_status::BuildStatusHandlers;

use crate::error::AppError;
use axum::{
    extract::{Query, Request},
    http::StatusCode,
};
use std::collections::HashMap;

/// Query string as a flat map; repeated keys keep the last value.
fn query_params(req: &Request) -> Result<HashMap<String, String>, AppError> {
    Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(params)| params)
        .map_err(|e| AppError::request(StatusCode::BAD_REQUEST, e.body_text()))
}
