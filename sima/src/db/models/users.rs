//! Database models for usuarios.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::api::models::users::Role;
use crate::types::UserId;

/// One row of the `usuarios` table. This is the only place the password
/// hash and token version are visible; API projections strip them.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub usuario: String,
    pub password_hash: String,
    pub nombre: String,
    pub apellido: String,
    pub rol: Role,
    pub activo: bool,
    pub token_version: i64,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub usuario: String,
    pub nombre: String,
    pub apellido: String,
    pub rol: Role,
    pub activo: bool,
    pub password_hash: String,
    pub token_version: i64,
    pub created_by: Option<UserId>,
}

/// Full profile update (password and token version have dedicated paths).
#[derive(Debug, Clone)]
pub struct UserUpdateDBRequest {
    pub usuario: String,
    pub nombre: String,
    pub apellido: String,
    pub rol: Role,
    pub activo: bool,
    pub updated_by: Option<UserId>,
}
