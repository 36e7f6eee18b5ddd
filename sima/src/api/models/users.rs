//! API request/response models for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::db::models::users::UserRow;
use crate::types::UserId;

/// User role. Stored as lowercase text in the database and serialized the
/// same way on the wire and inside token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Usuario,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Parse a (schema-validated) wire value.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "usuario" => Some(Role::Usuario),
            _ => None,
        }
    }
}

/// Create/update payload for a user. Requiredness is enforced by the
/// `USUARIO` schema, not by deserialization.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInput {
    pub usuario: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rol: Option<String>,
    pub activo: Option<bool>,
}

impl UserInput {
    /// Apply plain-text sanitization to every free-text field.
    pub fn sanitized(&self) -> Self {
        let clean = |v: &Option<String>, max: usize| {
            v.as_deref()
                .map(|s| crate::sanitize::clean_text(s, max))
                .filter(|s| !s.is_empty())
        };
        Self {
            usuario: clean(&self.usuario, 50),
            nombre: clean(&self.nombre, 100),
            apellido: clean(&self.apellido, 100),
            rol: clean(&self.rol, 20),
            activo: self.activo,
        }
    }
}

/// User projection returned by the API. The password hash and the token
/// version counter never leave the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub usuario: String,
    pub nombre: String,
    pub apellido: String,
    pub rol: Role,
    pub activo: bool,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            usuario: row.usuario,
            nombre: row.nombre,
            apellido: row.apellido,
            rol: row.rol,
            activo: row.activo,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Response for user creation: the plaintext temporary password is returned
/// exactly once, for out-of-band delivery to the new user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedUserResponse {
    pub id: UserId,
    #[serde(rename = "tempPassword")]
    pub temp_password: String,
    pub message: String,
}

/// Query parameters for listing users.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// The identity snapshot attached to authenticated requests, decoded from
/// the access token. Deliberately not re-read from the database on every
/// request (see the auth gate).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub usuario: String,
    pub rol: Role,
    pub nombre: String,
    pub apellido: String,
    pub token_version: i64,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.rol.is_admin()
    }
}

impl From<&UserRow> for CurrentUser {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            usuario: row.usuario.clone(),
            rol: row.rol,
            nombre: row.nombre.clone(),
            apellido: row.apellido.clone(),
            token_version: row.token_version,
        }
    }
}
