//! Extractors whose rejections render as [`CadenceError`] 400s.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::CadenceError;

/// JSON body.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(CadenceError))]
pub struct ApiJson<T>(pub T);

/// Query string.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CadenceError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CadenceError))]
pub struct ApiPath<T>(pub T);
