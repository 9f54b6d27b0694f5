//! Route assembly.

mod common;
pub mod v1;

pub use common::common_routes;

use crate::api::{middleware, shutdown, Api, Shutdown};
use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Full application router: common routes plus the v1 API behind the
/// standard middleware stack. Shutdown markers from any route are watched.
pub fn api_mux(state: AppState, stop: Shutdown) -> Router {
    let mut api = Api::new(stop.clone(), middleware::standard(state.config.enforce_headers));
    v1::routes(&mut api, &state);

    let max_body = state.config.max_body_bytes;
    let router = common_routes(state).merge(api.into_router());
    shutdown::watch(router, stop).layer(RequestBodyLimitLayer::new(max_body))
}
