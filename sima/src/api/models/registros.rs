//! API request/response models for registros delictuales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use super::personas::PersonaResponse;
use crate::db::models::registros::RegistroRow;
use crate::sanitize;
use crate::types::{PersonaId, RegistroId, UserId};

/// Create/update payload for a registro. Requiredness is enforced by the
/// `REGISTRO` schema.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistroInput {
    pub persona_id: Option<PersonaId>,
    pub tipo_delito: Option<String>,
    pub lugar: Option<String>,
    pub estado: Option<String>,
    pub juzgado: Option<String>,
    pub detalle: Option<String>,
}

impl RegistroInput {
    /// Apply plain-text sanitization to every free-text field.
    pub fn sanitized(&self) -> Self {
        let clean = |v: &Option<String>, max: usize| {
            v.as_deref()
                .map(|s| sanitize::clean_text(s, max))
                .filter(|s| !s.is_empty())
        };
        Self {
            persona_id: self.persona_id,
            tipo_delito: clean(&self.tipo_delito, 100),
            lugar: clean(&self.lugar, 200),
            estado: clean(&self.estado, 100),
            juzgado: clean(&self.juzgado, 100),
            detalle: clean(&self.detalle, 2000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistroResponse {
    pub id: RegistroId,
    pub persona_id: PersonaId,
    pub tipo_delito: String,
    pub lugar: Option<String>,
    pub estado: Option<String>,
    pub juzgado: Option<String>,
    pub detalle: Option<String>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistroRow> for RegistroResponse {
    fn from(row: RegistroRow) -> Self {
        Self {
            id: row.id,
            persona_id: row.persona_id,
            tipo_delito: row.tipo_delito,
            lugar: row.lugar,
            estado: row.estado,
            juzgado: row.juzgado,
            detalle: row.detalle,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Registro plus its linked persona. The persona is looked up by id, so it
/// is present even when soft-deleted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistroDetailResponse {
    #[serde(flatten)]
    pub registro: RegistroResponse,
    pub persona: Option<PersonaResponse>,
}

/// Query parameters for searching registros.
#[serde_with::serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RegistroSearchQuery {
    /// Restrict to one persona
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    pub persona_id: Option<PersonaId>,
    /// Free text matched against tipo_delito, lugar, estado and juzgado
    pub q: Option<String>,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// When "csv" or "xlsx", stream an export instead of JSON
    pub format: Option<String>,
}
