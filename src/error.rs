//! Typed errors and HTTP mapping.
//!
//! `AppError` is the closed set of failure kinds the service knows about.
//! [`AppError::classify`] is the single place that turns one into a status
//! code and an [`ErrorResponse`] body.

use crate::api::ShutdownRequested;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Message used for validation failures that do not carry their own.
pub const VALIDATION_MESSAGE: &str = "data validation error";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Per-field validation failures keyed by the field's wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the top-level message (defaults to [`VALIDATION_MESSAGE`]).
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(VALIDATION_MESSAGE)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// `Ok(())` when no field failed, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidId(String),
    #[error("duplicated entry")]
    DuplicateEntry,
    #[error("{}", .0.message())]
    Validation(FieldErrors),
    #[error("{message}")]
    Request { status: StatusCode, message: String },
    #[error("query matched more than one row")]
    MultipleRows,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
    /// Integrity violation: the process must shut down once the response is out.
    #[error("{0}")]
    Shutdown(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AppError>,
    },
}

/// Wire body for every failed request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

/// Outcome of classifying an error.
#[derive(Debug, Clone)]
pub struct Classified {
    pub status: StatusCode,
    pub body: ErrorResponse,
    pub shutdown: bool,
}

impl AppError {
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Request {
            status,
            message: message.into(),
        }
    }

    /// Wrap with operation context; classification still sees the inner kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        AppError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error beneath any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self.root(), AppError::Shutdown(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), AppError::NotFound(_))
    }

    /// Status carried by storage-layer errors that were classified at the
    /// data-access boundary.
    fn storage_status(&self) -> Option<StatusCode> {
        match self {
            AppError::DuplicateEntry => Some(StatusCode::CONFLICT),
            _ => None,
        }
    }

    pub fn classify(&self) -> Classified {
        let root = self.root();
        let (status, body) = if let Some(status) = root.storage_status() {
            (status, plain(root.to_string()))
        } else {
            match root {
                AppError::Validation(fe) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: fe.message().to_string(),
                        fields: Some(fe.fields().clone()),
                    },
                ),
                AppError::Request { status, message } => (*status, plain(message.clone())),
                AppError::NotFound(m) => (StatusCode::NOT_FOUND, plain(m.clone())),
                AppError::InvalidId(m) => (StatusCode::BAD_REQUEST, plain(m.clone())),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, plain(self.to_string())),
            }
        };
        Classified {
            status,
            body,
            shutdown: root.is_shutdown(),
        }
    }
}

fn plain(error: String) -> ErrorResponse {
    ErrorResponse { error, fields: None }
}

/// Context wrapping for `Result`s carrying an [`AppError`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T, E: Into<AppError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| Into::<AppError>::into(e).context(context))
    }
}

/// Errors that require shutdown carry a [`ShutdownRequested`] marker so the
/// router-wide watcher can signal once the response is built.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let c = self.classify();
        let mut resp = (c.status, Json(c.body)).into_response();
        if c.shutdown {
            resp.extensions_mut().insert(ShutdownRequested(self.to_string()));
        }
        resp
    }
}
