//! Disk-backed photo bucket.
//!
//! Named blobs live flat under one directory and are served publicly under
//! `/images/{name}`. Object names are derived from the member's NBA plus an
//! upload-time millisecond suffix so re-uploads never collide. Nothing here
//! deletes blobs: a record write that fails after an upload, or a member
//! deletion, leaves the photo orphaned in the bucket (accepted limitation).

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// URL path prefix the bucket is served under.
pub const PUBLIC_PREFIX: &str = "/images";

/// Fallback extension when the uploaded filename carries none.
const DEFAULT_EXTENSION: &str = "jpg";

/// Photo object store rooted at a bucket directory.
#[derive(Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open the bucket, creating the directory if needed.
    pub async fn open(root: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a blob under the given object name.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<(), AppError> {
        // Object names are generated server-side; reject anything that could
        // escape the bucket directory.
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Err(AppError::Storage(format!("Invalid object name: {}", name)));
        }

        tokio::fs::write(self.root.join(name), bytes).await?;
        Ok(())
    }
}

/// Derive the object name for an upload: `{nba}-{millis}.{ext}`.
///
/// The extension is taken from the uploaded filename, lowercased and
/// restricted to short alphanumeric suffixes; anything else falls back to
/// `jpg` (the original bucket stored everything as jpg).
pub fn object_name(nba: &str, uploaded_at_ms: i64, original_filename: &str) -> String {
    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 4 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{nba}-{uploaded_at_ms}.{extension}")
}

/// Resolve a stored photo reference into a public URL.
///
/// Bare object names resolve against the configured base URL; references
/// that already carry a scheme (legacy rows storing the full URL) pass
/// through unchanged.
pub fn public_url(base_url: &str, reference: &str) -> String {
    if reference.starts_with("http") {
        return reference.to_string();
    }
    format!(
        "{}{}/{}",
        base_url.trim_end_matches('/'),
        PUBLIC_PREFIX,
        reference
    )
}
