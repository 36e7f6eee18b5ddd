//! API request and response data models.
//!
//! These structures define the public API contract and are kept separate
//! from the database models so the wire shapes and storage shapes can evolve
//! independently. Request structs keep every field optional: requiredness is
//! enforced by the declarative schemas in [`crate::validation`], so shape
//! problems always surface as 400s with per-field detail instead of raw
//! deserialization rejections.

pub mod audit;
pub mod auth;
pub mod pagination;
pub mod personas;
pub mod registros;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard `{ok: true}` acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard `{id}` body returned from create operations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i64,
}
