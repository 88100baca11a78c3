//! Aspiration model for the public feedback box.

use serde::{Deserialize, Serialize};

/// Name stored when the sender leaves the name field blank.
pub const ANONYMOUS_NAMA: &str = "Anonim";

/// Class stored when the sender leaves the class field blank.
pub const PLACEHOLDER_KELAS: &str = "-";

/// A submitted aspiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aspiration {
    pub id: i64,
    pub nama: String,
    pub kelas: String,
    pub pesan: String,
    pub created_at: String,
}

/// Request body for a public aspiration submission.
///
/// Only the message is required; blank sender fields fall back to the
/// placeholders above.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAspirationRequest {
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub kelas: Option<String>,
    pub pesan: String,
}
