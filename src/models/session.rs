//! Admin session model.

use serde::{Deserialize, Serialize};

/// An issued admin session.
///
/// The token is an opaque uuid handed to the dashboard at sign-in and
/// presented as a bearer credential on every admin request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Request body for password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}
