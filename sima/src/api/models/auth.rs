//! API request/response models for authentication and password management.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login payload. Shape bounds (3-50 / 6-100) are enforced by the `LOGIN`
/// schema so violations surface as 400s.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub usuario: Option<String>,
    pub password: Option<String>,
}

/// Refresh payload. A missing token is a 400, not a 401.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// The issued token pair. Both tokens carry the same identity payload but
/// are signed with distinct secrets and expiries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Self-service password change: requires the current password.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeOwnPasswordRequest {
    pub actual: Option<String>,
    pub nueva: Option<String>,
}

/// Admin-forced password change: no current-password check.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminChangePasswordRequest {
    pub nueva: Option<String>,
}
