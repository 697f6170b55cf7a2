//! Error handling for Cadence.
//!
//! Every failure that can reach an HTTP client is a [`CadenceError`]. Each
//! error carries an [`ErrorCode`], and each code belongs to an [`ErrorClass`]
//! that decides the status code and the generic, client-facing message:
//!
//! | Class          | Status | Message                          |
//! |----------------|--------|----------------------------------|
//! | Authentication | 401    | `Authentication required.`       |
//! | Validation     | 400    | `Invalid request data.`          |
//! | Engine         | 500    | `An unexpected error occurred.`  |
//! | Startup        | 500    | `An unexpected error occurred.`  |
//! | Internal       | 500    | `An unexpected error occurred.`  |
//!
//! The error's own message is only ever surfaced as `detailedMessage`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cadence_core::error::{CadenceError, ErrorContext, Result};
//!
//! fn load() -> Result<String> {
//!     std::fs::read_to_string("jobs.toml").context("Failed to read job file")
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::middleware::error_translator::current_trace_id;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    Unauthorized,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,

    // Validation
    ValidationError,
    InvalidJobKey,
    InvalidTriggerKey,
    InvalidRequestBody,

    // Engine
    JobNotFound,
    TriggerNotFound,
    EngineError,
    SchedulerNotInitialized,
    SchedulerShutDown,
    InvalidSchedule,

    // Startup
    StartupFailed,

    // Internal
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// The class this code is translated through.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized | Self::InvalidCredentials | Self::InvalidToken | Self::TokenExpired => {
                ErrorClass::Authentication
            }

            Self::ValidationError
            | Self::InvalidJobKey
            | Self::InvalidTriggerKey
            | Self::InvalidRequestBody => ErrorClass::Validation,

            Self::JobNotFound
            | Self::TriggerNotFound
            | Self::EngineError
            | Self::SchedulerNotInitialized
            | Self::SchedulerShutDown
            | Self::InvalidSchedule => ErrorClass::Engine,

            Self::StartupFailed => ErrorClass::Startup,

            Self::ConfigurationError | Self::InternalError => ErrorClass::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        self.class().http_status()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Classes
// ═══════════════════════════════════════════════════════════════════════════════

/// Coarse failure taxonomy used for HTTP translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Bad credentials, missing or invalid bearer token
    Authentication,
    /// Malformed keys, bodies or query strings
    Validation,
    /// The scheduling engine rejected an operation
    Engine,
    /// Initialization failed after all retries
    Startup,
    /// Anything unclassified
    Internal,
}

impl ErrorClass {
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Engine | Self::Startup | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never replaced by the underlying error text.
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication required.",
            Self::Validation => "Invalid request data.",
            Self::Engine | Self::Startup | Self::Internal => "An unexpected error occurred.",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::Engine => "engine",
            Self::Startup => "startup",
            Self::Internal => "internal",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Cadence.
#[derive(Error, Debug)]
pub struct CadenceError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Diagnostic message, exposed as `detailedMessage`
    message: Cow<'static, str>,

    /// Structured context attached to log lines
    context: BTreeMap<String, serde_json::Value>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for CadenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl CadenceError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and diagnostic message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
            source: None,
        };
        error.record_metrics();
        error
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    /// The engine handle has not been acquired yet.
    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::SchedulerNotInitialized,
            "Scheduler has not been initialized",
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }

    /// The diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging & Metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error once, at a level matching its status.
    pub fn log(&self) {
        let status = self.http_status().as_u16();
        let class = self.class().as_str();

        if self.http_status().is_server_error() {
            error!(
                error_code = %self.code,
                class,
                http_status = status,
                message = %self.message,
                context = ?self.context,
                source = ?self.source,
                "Request failed"
            );
        } else {
            warn!(
                error_code = %self.code,
                class,
                http_status = status,
                message = %self.message,
                "Request rejected"
            );
        }
    }

    fn record_metrics(&self) {
        counter!(
            "cadence_errors_total",
            "code" => self.code.to_string(),
            "class" => self.class().as_str(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error body returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(error: &CadenceError, trace_id: Option<String>) -> Self {
        Self {
            status_code: error.http_status().as_u16(),
            message: error.class().public_message().to_string(),
            detailed_message: Some(error.message.to_string()),
            trace_id,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for CadenceError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let body = ErrorResponse::from_error(&self, current_trace_id());

        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Wrap the error as an internal error with the given message.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Wrap the error with a specific code, keeping its text as the message.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| CadenceError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| CadenceError::new(code, e.to_string()).with_source(e))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<JsonRejection> for CadenceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}

impl From<QueryRejection> for CadenceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<PathRejection> for CadenceError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {}", error)).with_source(error)
    }
}

impl From<config::ConfigError> for CadenceError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for CadenceError {
    fn from(error: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", error)).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_status() {
        assert_eq!(ErrorCode::InvalidToken.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidJobKey.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::JobNotFound.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::StartupFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_is_generic() {
        let error = CadenceError::new(ErrorCode::JobNotFound, "Job DEFAULT.Missing not found");
        let response = ErrorResponse::from_error(&error, Some("trace-1".into()));

        assert_eq!(response.status_code, 500);
        assert_eq!(response.message, "An unexpected error occurred.");
        assert_eq!(
            response.detailed_message.as_deref(),
            Some("Job DEFAULT.Missing not found")
        );
        assert_eq!(response.trace_id.as_deref(), Some("trace-1"));
    }

    #[test]
    fn test_error_response_is_camel_case() {
        let error = CadenceError::validation("bad key");
        let json = serde_json::to_value(ErrorResponse::from_error(&error, None)).unwrap();

        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["message"], "Invalid request data.");
        assert_eq!(json["detailedMessage"], "bad key");
        assert!(json.get("traceId").is_none());
    }

    #[test]
    fn test_error_context() {
        let error = CadenceError::internal("boom")
            .with_context("job_key", "DEFAULT.SampleJob")
            .with_context("attempt", 2);

        assert_eq!(error.context()["attempt"], 2);
        assert!(error.context().contains_key("job_key"));
    }

    #[test]
    fn test_error_display() {
        let error = CadenceError::unauthorized("Missing bearer token");
        assert_eq!(error.to_string(), "[Unauthorized] Missing bearer token");
    }

    #[test]
    fn test_error_context_trait() {
        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let error = io.context("Failed to read").unwrap_err();

        assert_eq!(error.code(), ErrorCode::InternalError);
        assert!(std::error::Error::source(&error).is_some());
    }
}
