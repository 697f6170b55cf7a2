//! Outer request boundary: trace ids and failure translation.
//!
//! [`translate_errors`] wraps every request. It takes the correlation id from
//! the `x-request-id` header (or generates one), makes it available to the
//! rest of the pipeline through [`current_trace_id`], and echoes it back on
//! the response. [`CadenceError`](crate::error::CadenceError) responses pick
//! the id up when they are rendered.
//!
//! [`panic_response`] is installed with `tower_http::catch_panic` inside this
//! boundary, so a panicking handler still produces a structured 500 carrying
//! the request's trace id.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use uuid::Uuid;

use crate::error::{ErrorClass, ErrorResponse};

/// Header carrying the per-request correlation id.
pub const TRACE_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static TRACE_ID: String;
}

/// The trace id of the request being handled on this task, if any.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(|id| id.clone()).ok()
}

/// Middleware establishing the trace id for the duration of the request.
pub async fn translate_errors(req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = TRACE_ID.scope(trace_id.clone(), next.run(req)).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
    }

    response
}

/// Render a caught panic as an internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(panic = %detail, trace_id = ?current_trace_id(), "Unhandled panic while serving request");

    let body = ErrorResponse {
        status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        message: ErrorClass::Internal.public_message().to_string(),
        detailed_message: Some(detail),
        trace_id: current_trace_id(),
    };

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
