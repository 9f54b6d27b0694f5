//! build-tracker: REST service for builds and build statuses over a
//! serialized transactional PostgreSQL core.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logger;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use api::{Api, Shutdown, ShutdownListener};
pub use config::Config;
pub use context::RequestContext;
pub use error::{AppError, ConfigError, ErrorResponse};
pub use routes::api_mux;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_schema, status_check, TxCoordinator};
