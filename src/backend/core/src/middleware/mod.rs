//! HTTP middleware: bearer authentication and the error/trace-id boundary.
pub mod auth;
pub mod error_translator;

pub use auth::{AuthContext, AuthLayer, AuthService};
pub use error_translator::{current_trace_id, panic_response, translate_errors, TRACE_ID_HEADER};
