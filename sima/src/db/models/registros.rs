//! Database models for registros delictuales.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{PersonaId, RegistroId, UserId};

/// One row of the `registros_delictuales` table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistroRow {
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

impl RegistroRow {
    /// Business fields only: everything except id, timestamps and the
    /// audit-who columns. This is what a duplicate operation clones.
    pub fn to_create_request(&self, created_by: Option<UserId>) -> RegistroCreateDBRequest {
        RegistroCreateDBRequest {
            persona_id: self.persona_id,
            tipo_delito: self.tipo_delito.clone(),
            lugar: self.lugar.clone(),
            estado: self.estado.clone(),
            juzgado: self.juzgado.clone(),
            detalle: self.detalle.clone(),
            created_by,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistroCreateDBRequest {
    pub persona_id: PersonaId,
    pub tipo_delito: String,
    pub lugar: Option<String>,
    pub estado: Option<String>,
    pub juzgado: Option<String>,
    pub detalle: Option<String>,
    #[serde(skip)]
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct RegistroUpdateDBRequest {
    pub persona_id: PersonaId,
    pub tipo_delito: String,
    pub lugar: Option<String>,
    pub estado: Option<String>,
    pub juzgado: Option<String>,
    pub detalle: Option<String>,
    pub updated_by: Option<UserId>,
}
