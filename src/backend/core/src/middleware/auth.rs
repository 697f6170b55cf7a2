//! Bearer token authentication middleware.
//!
//! [`AuthLayer`] guards every protected route: it reads the
//! `Authorization: Bearer <token>` header, validates the token with the
//! [`AuthGateway`] and injects an [`AuthContext`] into the request
//! extensions. Failures short-circuit with a 401 in the standard error shape.
//!
//! # Example
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/scheduler/status", get(status))
//!     .route_layer(AuthLayer::new(gateway));
//! ```

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::debug;

use crate::auth::{AuthError, AuthGateway, Claims};
use crate::error::CadenceError;

// ═══════════════════════════════════════════════════════════════════════════════
// Auth Context
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated caller, available to handlers as an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub username: String,
    pub role: String,
    pub token_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            username: claims.sub,
            role: claims.role,
            token_id: claims.jti,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer and Service
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct AuthLayer {
    gateway: Arc<AuthGateway>,
}

impl AuthLayer {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            gateway: Arc::clone(&self.gateway),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    gateway: Arc<AuthGateway>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let gateway = Arc::clone(&self.gateway);
        // Take the service that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let validated = match bearer_token(request.headers()) {
                Some(token) => gateway.validate(token),
                None => Err(AuthError::MissingCredentials),
            };

            match validated {
                Ok(claims) => {
                    debug!(username = %claims.sub, "Request authenticated");
                    request.extensions_mut().insert(AuthContext::from(claims));
                    inner.call(request).await
                }
                Err(e) => Ok(CadenceError::from(e).into_response()),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Extractor
// ═══════════════════════════════════════════════════════════════════════════════

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = CadenceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AuthError::MissingCredentials.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_context_from_claims() {
        let claims = Claims {
            sub: "admin".into(),
            role: "Admin".into(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            iss: "CadenceDashboard".into(),
            aud: "CadenceDashboardUsers".into(),
            jti: "j-1".into(),
        };
        let ctx = AuthContext::from(claims);
        assert_eq!(ctx.username, "admin");
        assert_eq!(ctx.token_id, "j-1");
        assert_eq!(ctx.expires_at.map(|t| t.timestamp()), Some(1_700_003_600));
    }
}
