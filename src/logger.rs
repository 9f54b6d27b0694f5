//! Tracing subscriber setup.

use crate::error::AppError;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "build_tracker=info,tower_http=info";

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| AppError::Internal(format!("log filter: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| AppError::Internal(format!("logger init: {e}")))
}

/// Root span for the service; everything logged inside carries its fields.
pub fn root_span(service: &str, version: &str) -> tracing::Span {
    tracing::info_span!("service", service = %service, version = %version)
}
