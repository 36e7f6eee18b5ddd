//! API request/response models for personas registradas.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use super::registros::RegistroResponse;
use crate::db::models::personas::PersonaRow;
use crate::sanitize;
use crate::types::{PersonaId, UserId};

/// Create/update payload for a persona. Arrives as multipart form fields
/// (alongside the `fotos` files), so everything is a string until validated.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonaInput {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub dni: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub nacionalidad: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub observaciones: Option<String>,
    pub comisaria: Option<String>,
}

impl PersonaInput {
    /// Sanitize every field. Observaciones permits constrained HTML; email
    /// and phone get their own normalizers and degrade to null when beyond
    /// repair (matching the stored shape, not failing the request).
    pub fn sanitized(&self) -> Self {
        let clean = |v: &Option<String>, max: usize| {
            v.as_deref()
                .map(|s| sanitize::clean_text(s, max))
                .filter(|s| !s.is_empty())
        };
        Self {
            nombre: clean(&self.nombre, 100),
            apellido: clean(&self.apellido, 100),
            dni: clean(&self.dni, 20),
            fecha_nacimiento: clean(&self.fecha_nacimiento, 20),
            nacionalidad: clean(&self.nacionalidad, 100),
            direccion: clean(&self.direccion, 500),
            telefono: self.telefono.as_deref().and_then(sanitize::clean_phone),
            email: self.email.as_deref().and_then(sanitize::clean_email),
            observaciones: self
                .observaciones
                .as_deref()
                .map(|s| sanitize::clean_html(s, 2000))
                .filter(|s| !s.is_empty()),
            comisaria: clean(&self.comisaria, 200),
        }
    }

    /// Parse the (already validated) birth date.
    pub fn fecha_nacimiento_parsed(&self) -> Option<NaiveDate> {
        self.fecha_nacimiento
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    /// Set a multipart form field by name. Unknown fields are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        let slot = match name {
            "nombre" => &mut self.nombre,
            "apellido" => &mut self.apellido,
            "dni" => &mut self.dni,
            "fecha_nacimiento" => &mut self.fecha_nacimiento,
            "nacionalidad" => &mut self.nacionalidad,
            "direccion" => &mut self.direccion,
            "telefono" => &mut self.telefono,
            "email" => &mut self.email,
            "observaciones" => &mut self.observaciones,
            "comisaria" => &mut self.comisaria,
            _ => return,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonaResponse {
    pub id: PersonaId,
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub nacionalidad: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub observaciones: Option<String>,
    pub foto_principal: Option<String>,
    pub fotos_adicionales: Vec<String>,
    pub comisaria: Option<String>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PersonaRow> for PersonaResponse {
    fn from(row: PersonaRow) -> Self {
        let fotos_adicionales = serde_json::from_str(&row.fotos_adicionales).unwrap_or_default();
        Self {
            id: row.id,
            nombre: row.nombre,
            apellido: row.apellido,
            dni: row.dni,
            fecha_nacimiento: row.fecha_nacimiento,
            nacionalidad: row.nacionalidad,
            direccion: row.direccion,
            telefono: row.telefono,
            email: row.email,
            observaciones: row.observaciones,
            foto_principal: row.foto_principal,
            fotos_adicionales,
            comisaria: row.comisaria,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Persona plus its non-deleted registros, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PersonaDetailResponse {
    #[serde(flatten)]
    pub persona: PersonaResponse,
    pub registros_delictuales: Vec<RegistroResponse>,
    pub total_registros: i64,
}

/// Query parameters for searching personas.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PersonaSearchQuery {
    /// Free text matched against nombre, apellido and dni
    pub q: Option<String>,
    /// Exact DNI filter
    pub dni: Option<String>,
    /// Contains-match filter on comisaria
    pub comisaria: Option<String>,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// When "csv" or "xlsx", stream an export instead of JSON
    pub format: Option<String>,
}

/// Aggregate statistics over active personas.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatisticsResponse {
    pub total_personas: i64,
    pub personas_por_comisaria: Vec<ComisariaCount>,
    pub registros_ultimos_30_dias: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComisariaCount {
    pub comisaria: Option<String>,
    pub count: i64,
}
