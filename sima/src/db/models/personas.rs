//! Database models for personas registradas.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::types::{PersonaId, UserId};

/// One row of the `personas_registradas` table. `fotos_adicionales` is the
/// raw serialized JSON array; the API layer parses it.
#[derive(Debug, Clone, FromRow)]
pub struct PersonaRow {
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
    pub fotos_adicionales: String,
    pub comisaria: Option<String>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The photo references attached to a persona. The first uploaded file is
/// the primary photo and the full ordered list is kept alongside it.
#[derive(Debug, Clone, Default)]
pub struct PhotoSet {
    pub principal: Option<String>,
    pub adicionales: Vec<String>,
}

impl PhotoSet {
    /// Build from stored-file references in upload order.
    pub fn from_stored(files: Vec<String>) -> Self {
        Self {
            principal: files.first().cloned(),
            adicionales: files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adicionales.is_empty()
    }

    /// Serialized form of the ordered photo list.
    pub fn adicionales_json(&self) -> String {
        serde_json::to_string(&self.adicionales).unwrap_or_else(|_| "[]".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PersonaCreateDBRequest {
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub nacionalidad: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub observaciones: Option<String>,
    pub comisaria: Option<String>,
    pub photos: PhotoSet,
    pub created_by: Option<UserId>,
}

/// Full update of the business fields. `photos` is `Some` only when new
/// files arrived: the replacement is wholesale, never a merge.
#[derive(Debug, Clone)]
pub struct PersonaUpdateDBRequest {
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub nacionalidad: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub observaciones: Option<String>,
    pub comisaria: Option<String>,
    pub photos: Option<PhotoSet>,
    pub updated_by: Option<UserId>,
}
