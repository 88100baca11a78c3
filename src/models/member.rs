//! Member model matching the public site's roster records.

use serde::{Deserialize, Serialize};

/// An organization member, keyed by the NBA composite identifier.
///
/// The NBA is always derived from `tahun_lulus`, `kode_jabatan` and `nis`;
/// the row is located and overwritten by that key on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub nba: String,
    pub tahun_lulus: String,
    pub kode_jabatan: String,
    pub nis: String,
    pub nama: String,
    pub kelas: String,
    pub nama_jabatan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    /// Photo reference: the bare object name in the image bucket. Legacy
    /// rows may hold a fully-qualified URL; resolution passes those through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    /// Assigned by the storage layer on first insert, preserved on upsert.
    pub created_at: String,
}

/// Request body for the upsert-by-key save operation.
///
/// The key itself is never accepted from the client; it is rederived from
/// the three constituent fields on every save.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertMemberRequest {
    pub tahun_lulus: String,
    pub kode_jabatan: String,
    pub nis: String,
    pub nama: String,
    pub kelas: String,
    pub nama_jabatan: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub foto_url: Option<String>,
}

/// Response body for a successful photo upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoUpload {
    /// Bare object name to store in the member's `foto_url` field.
    pub foto_url: String,
    /// Resolved public URL for immediate preview.
    pub public_url: String,
}
