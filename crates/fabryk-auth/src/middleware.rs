//! Generic Tower authentication middleware.
//!
//! `AuthLayer` and `AuthService` wrap any inner service with token validation.
//! Tokens come from the `Authorization: Bearer` header or, failing that, the
//! `token` query parameter. Generic over `TokenValidator`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Query;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use serde::Deserialize;
use tower::{Layer, Service};

use crate::{AuthConfig, AuthError, TokenValidator};

/// Tower `Layer` that wraps services with token authentication.
pub struct AuthLayer<V: TokenValidator> {
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V: TokenValidator> Clone for AuthLayer<V> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<V: TokenValidator> AuthLayer<V> {
    /// Create a new auth layer with the given validator and config.
    pub fn new(validator: Arc<V>, config: AuthConfig) -> Self {
        Self { validator, config }
    }
}

impl<V: TokenValidator, S> Layer<S> for AuthLayer<V> {
    type Service = AuthService<V, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

/// Tower `Service` that validates tokens before forwarding requests.
///
/// On successful validation, inserts `AuthenticatedUser` into request
/// extensions where it's available to downstream handlers.
pub struct AuthService<V: TokenValidator, S> {
    inner: S,
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V: TokenValidator, S: Clone> Clone for AuthService<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<V, S> Service<Request<Body>> for AuthService<V, S>
where
    V: TokenValidator,
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let validator = self.validator.clone();
        let config = self.config.clone();

        Box::pin(async move {
            // Auth disabled: the caller is anonymous (system.Everyone)
            if !config.enabled {
                let resp = inner
                    .call(req)
                    .await
                    .unwrap_or_else(|infallible| match infallible {});
                return Ok(resp.into_response());
            }

            let token = match extract_token(&req) {
                Some(t) => t,
                None => {
                    return Ok(error_response(&AuthError::MissingToken, &config.realm));
                }
            };

            match validator.validate(&token, &config).await {
                Ok(user) => {
                    log::debug!("Authenticated {} for {}", user.principal, req.uri().path());
                    req.extensions_mut().insert(user);
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Err(auth_err) => {
                    log::warn!("Authentication failed: {auth_err}");
                    Ok(error_response(&auth_err, &config.realm))
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the token from the Authorization header, falling back to the
/// `token` query parameter (EventSource clients cannot set headers).
fn extract_token(req: &Request<Body>) -> Option<String> {
    if let Some(bearer) = extract_bearer_token(req) {
        return Some(bearer.to_string());
    }
    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Extract bearer token from the Authorization header.
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Build a 401 (or 500 for backend failures) JSON response.
fn error_response(err: &AuthError, realm: &str) -> axum::response::Response {
    let status = if err.is_client_error() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = serde_json::json!({
        "error": {
            "kind": "authentication",
            "message": err.to_string(),
        }
    });

    let mut response = (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response();

    if status == StatusCode::UNAUTHORIZED {
        if let Ok(value) = http::HeaderValue::from_str(&format!(r#"Bearer realm="{realm}""#)) {
            response
                .headers_mut()
                .insert(http::header::WWW_AUTHENTICATE, value);
        }
    }

    response
}
