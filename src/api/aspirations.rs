//! Aspiration API endpoints: public submission, admin listing and deletion.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::events::{ChangeOp, TableName};
use crate::models::{Aspiration, CreateAspirationRequest};
use crate::AppState;

/// GET /api/admin/aspirations - List all aspirations, newest first.
pub async fn list_aspirations(State(state): State<AppState>) -> ApiResult<Vec<Aspiration>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_aspirations().await {
        Ok(aspirations) => success(aspirations, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/aspirations - Submit an aspiration from the public site.
///
/// An empty message is rejected before any row is written; blank sender
/// fields fall back to placeholders in the repository.
pub async fn create_aspiration(
    State(state): State<AppState>,
    Json(request): Json<CreateAspirationRequest>,
) -> ApiResult<Aspiration> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.pesan.trim().is_empty() {
        return error(
            AppError::Validation("pesan is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_aspiration(&request).await {
        Ok(aspiration) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            state
                .feed
                .publish(TableName::Aspirations, ChangeOp::Insert, new_revision);
            success(aspiration, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/aspirations/:id - Delete an aspiration.
pub async fn delete_aspiration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_aspiration(id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            state
                .feed
                .publish(TableName::Aspirations, ChangeOp::Delete, new_revision);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
