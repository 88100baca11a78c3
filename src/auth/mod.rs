//! Session-based authentication for the admin surface.
//!
//! Sign-in trades the admin password (compared in constant time) for an
//! opaque bearer token persisted with an expiry. Admin routes sit behind a
//! middleware that resolves the token against the session table on every
//! request; nothing is cached locally.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorDetails, ErrorResponse};
use crate::AppState;

/// Explicit session context for a view.
///
/// `Unknown` is the state before the session check has completed; it is
/// never inferred from the absence of a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Session authentication layer for admin routes.
///
/// If no admin password is configured, authentication is disabled (dev mode)
/// and all requests pass through.
pub async fn session_auth_layer(state: AppState, request: Request, next: Next) -> Response {
    if state.config.admin_password.is_none() {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        return unauthorized_response("Missing session token");
    };

    match state.repo.get_session(&token).await {
        Ok(Some(_)) => next.run(request).await,
        Ok(None) => unauthorized_response("Invalid or expired session"),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            unauthorized_response("Session lookup failed")
        }
    }
}

/// Check a provided password against the configured admin password.
///
/// Returns false when no password is configured; sign-in is meaningless in
/// dev mode because the middleware already lets everything through.
pub fn verify_password(expected: Option<&str>, provided: &str) -> bool {
    match expected {
        Some(expected) => constant_time_compare(provided, expected),
        None => false,
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
