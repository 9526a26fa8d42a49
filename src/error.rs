//! Error types for route building and request-time action failures.
//!
//! Build-time errors ([`BuildError`], [`ConventionError`], [`ConfigError`]) stop the
//! process before the server starts. Request-time errors ([`ActionError`]) are turned
//! into responses by the [`ErrorHandler`](crate::reply::ErrorHandler) pipeline.

use std::path::PathBuf;

use serde_json::{Value, json};
use thiserror::Error;

use crate::http::{Method, StatusCode};

/// Failures while translating an action name into a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConventionError {
    #[error("action name is empty")]
    EmptyName,

    #[error("action `{name}` does not start with an HTTP verb (got `{word}`)")]
    UnknownVerb { name: String, word: String },
}

/// Invalid [`RoutesConfig`](crate::config::RoutesConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value `{value}`: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("base path `{0}` must be empty or start with `/`")]
    BasePath(String),

    #[error("id parameter `{0}` must be a non-empty identifier")]
    IdParam(String),

    #[error("controller file name must not be empty")]
    ControllerFile,
}

/// Errors produced by [`RouteBuilder::build`](crate::builder::RouteBuilder::build).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read controllers directory {}: {source}", path.display())]
    ControllersDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("folder {} expects `{controller}` but no such controller is registered", dir.display())]
    UnregisteredController { dir: PathBuf, controller: String },

    #[error("controller `{controller}` is registered twice")]
    DuplicateController { controller: String },

    #[error("{controller}::{action}: {source}")]
    Convention {
        controller: String,
        action: String,
        #[source]
        source: ConventionError,
    },

    #[error("{controller}::{action} uses unknown middleware `{middleware}`")]
    UnknownMiddleware {
        controller: String,
        action: String,
        middleware: String,
    },

    #[error("{method} {path} is declared by both {first} and {second}")]
    DuplicateRoute {
        method: Method,
        path: String,
        first: String,
        second: String,
    },
}

/// A request-time failure raised by a controller action or by request validation.
///
/// Each variant maps to an HTTP status through [`ActionError::status`]. The default
/// error handler renders it as
/// `{"error": {"code": ..., "message": ..., "details": ...}}`.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ActionError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Any other status, e.g. `429 Too Many Requests` from a rate-limit middleware.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status this error is rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) | Self::BadRequest(_) => StatusCode::BadRequest,
            Self::Validation(_) => StatusCode::UnprocessableEntity,
            Self::Unauthorized(_) => StatusCode::Unauthorized,
            Self::Forbidden(_) => StatusCode::Forbidden,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::Conflict(_) => StatusCode::Conflict,
            Self::Status { status, .. } => *status,
            Self::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedBody(_) => "malformed_body",
            Self::Validation(_) => "validation_error",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Status { .. } => "error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Structured details; field errors for validation failures, `null` otherwise.
    pub fn details(&self) -> Value {
        match self {
            Self::Validation(errors) => {
                serde_json::to_value(errors.field_errors()).unwrap_or(Value::Null)
            }
            Self::MalformedBody(e) => json!({ "line": e.line(), "column": e.column() }),
            _ => Value::Null,
        }
    }

    /// `true` for 5xx errors.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}
