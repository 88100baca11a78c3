//! Auth API endpoints: password sign-in, session lookup, sign-out.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::{verify_password, SessionState};
use crate::errors::AppError;
use crate::models::{LoginRequest, Session};
use crate::AppState;

/// Tri-state result of a session lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionLookup {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// POST /api/auth/login - Trade the admin password for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Session> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if !verify_password(state.config.admin_password.as_deref(), &request.password) {
        return error(
            AppError::Unauthorized("Invalid password".to_string()),
            revision_id,
        );
    }

    match state
        .repo
        .create_session(state.config.session_ttl_hours)
        .await
    {
        Ok(session) => {
            tracing::info!("Admin session created, expires {}", session.expires_at);
            success(session, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/auth/session - Resolve the presented token to a session state.
///
/// Never errors on a missing or invalid token; the caller gets an explicit
/// `unauthenticated` instead of having to infer it from absence.
pub async fn session_lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionLookup> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let Some(token) = bearer_from_headers(&headers) else {
        return success(
            SessionLookup {
                state: SessionState::Unauthenticated,
                expires_at: None,
            },
            revision_id,
        );
    };

    match state.repo.get_session(&token).await {
        Ok(Some(session)) => success(
            SessionLookup {
                state: SessionState::Authenticated,
                expires_at: Some(session.expires_at),
            },
            revision_id,
        ),
        Ok(None) => success(
            SessionLookup {
                state: SessionState::Unauthenticated,
                expires_at: None,
            },
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/logout - Delete the presented session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(token) = bearer_from_headers(&headers) {
        if let Err(e) = state.repo.delete_session(&token).await {
            return error(e, revision_id);
        }
    }

    success((), revision_id)
}
