//! Member API endpoints: roster listing, upsert-by-key save, photo upload,
//! deletion.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::events::{ChangeOp, TableName};
use crate::models::{Member, PhotoUpload, UpsertMemberRequest};
use crate::{roster, storage, AppState};

/// Query parameters for the roster listing.
#[derive(Debug, Deserialize)]
pub struct MemberListQuery {
    /// Free-text query matched against name, class and raw NBA.
    #[serde(default)]
    pub q: String,
    /// Role-category token, or "All" for no category filter.
    #[serde(default = "default_jabatan")]
    pub jabatan: String,
}

fn default_jabatan() -> String {
    roster::JABATAN_ALL.to_string()
}

/// GET /api/members - List the roster, optionally filtered.
///
/// The filter runs over the complete list after the fetch, exactly like the
/// in-browser filter it replaces; order of the remaining records is the
/// fetch order (newest first).
pub async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<MemberListQuery>,
) -> ApiResult<Vec<Member>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_members().await {
        Ok(members) => {
            let filtered = roster::filter_members(&members, &params.q, &params.jabatan);
            success(filtered, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/members - Upsert a member by its derived NBA key.
pub async fn upsert_member(
    State(state): State<AppState>,
    Json(request): Json<UpsertMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required display fields
    if request.nama.trim().is_empty() {
        return error(AppError::Validation("nama is required".to_string()), revision_id);
    }
    if request.kelas.trim().is_empty() {
        return error(AppError::Validation("kelas is required".to_string()), revision_id);
    }
    if request.nama_jabatan.trim().is_empty() {
        return error(
            AppError::Validation("nama_jabatan is required".to_string()),
            revision_id,
        );
    }

    // The key is rederived from its constituent fields on every save
    if let Err(msg) = roster::validate_nba_fields(
        &request.tahun_lulus,
        &request.kode_jabatan,
        &request.nis,
    ) {
        return error(AppError::Validation(msg), revision_id);
    }
    let nba = roster::generate_nba(&request.tahun_lulus, &request.kode_jabatan, &request.nis);

    match state.repo.upsert_member(&nba, &request).await {
        Ok((member, existed)) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            let op = if existed {
                ChangeOp::Update
            } else {
                ChangeOp::Insert
            };
            state.feed.publish(TableName::Members, op, new_revision);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/members/:nba - Delete a member.
///
/// Unconditional delete-by-key; the member's stored photo is not cleaned up.
pub async fn delete_member(
    State(state): State<AppState>,
    Path(nba): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_member(&nba).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            state
                .feed
                .publish(TableName::Members, ChangeOp::Delete, new_revision);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/members/photo - Upload a member photo to the image bucket.
///
/// First step of the save workflow: the blob is written under
/// `{nba}-{millis}.{ext}` and the bare object name is returned for the
/// subsequent record upsert. A failure here aborts before any record write;
/// a record-write failure afterwards leaves the blob orphaned.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<PhotoUpload> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut tahun_lulus = String::new();
    let mut kode_jabatan = String::new();
    let mut nis = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(e.into(), revision_id),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "tahun_lulus" | "kode_jabatan" | "nis" => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(e) => return error(e.into(), revision_id),
                };
                match name.as_str() {
                    "tahun_lulus" => tahun_lulus = value,
                    "kode_jabatan" => kode_jabatan = value,
                    _ => nis = value,
                }
            }
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => return error(e.into(), revision_id),
                };
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    // Precondition: photo selection requires a student number, because the
    // object name is derived from the composite key.
    if nis.trim().is_empty() {
        return error(
            AppError::Validation("nis is required before a photo can be uploaded".to_string()),
            revision_id,
        );
    }
    if let Err(msg) = roster::validate_nba_fields(&tahun_lulus, &kode_jabatan, &nis) {
        return error(AppError::Validation(msg), revision_id);
    }

    let Some((filename, bytes)) = file else {
        return error(
            AppError::Validation("file field is required".to_string()),
            revision_id,
        );
    };
    if bytes.is_empty() {
        return error(
            AppError::Validation("uploaded file is empty".to_string()),
            revision_id,
        );
    }

    let nba = roster::generate_nba(&tahun_lulus, &kode_jabatan, &nis);
    let object = storage::object_name(&nba, Utc::now().timestamp_millis(), &filename);

    match state.photos.save(&object, &bytes).await {
        Ok(()) => {
            let public_url = storage::public_url(&state.config.public_base_url, &object);
            success(
                PhotoUpload {
                    foto_url: object,
                    public_url,
                },
                revision_id,
            )
        }
        Err(e) => error(e, revision_id),
    }
}
