//! Database repository for registros delictuales.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::{Listing, Repository, like_contains},
    models::registros::{RegistroCreateDBRequest, RegistroRow, RegistroUpdateDBRequest},
};
use crate::types::{PersonaId, RegistroId, UserId};

/// Equality filters for the base list operation.
#[derive(Debug, Clone, Default)]
pub struct RegistroFilter {
    pub persona_id: Option<PersonaId>,
    pub page: i64,
    pub page_size: i64,
}

/// Search criteria shared by the paginated search and the export path.
#[derive(Debug, Clone, Default)]
pub struct RegistroSearchParams {
    /// Restrict to one persona
    pub persona_id: Option<PersonaId>,
    /// Free text matched against tipo_delito, lugar, estado and juzgado
    pub q: Option<String>,
}

pub struct Registros<'c> {
    db: &'c mut SqliteConnection,
}

fn push_search_filters(qb: &mut QueryBuilder<'_, Sqlite>, params: &RegistroSearchParams) {
    if let Some(persona_id) = params.persona_id {
        qb.push(" AND persona_id = ");
        qb.push_bind(persona_id);
    }

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_contains(q);
        qb.push(" AND (LOWER(tipo_delito) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(lugar) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(estado) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(juzgado) LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
}

impl<'c> Registros<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Fetch by id including soft-deleted rows (detail views stay usable
    /// for history even after deletion).
    #[instrument(skip(self), err)]
    pub async fn get_by_id_any(&mut self, id: RegistroId) -> Result<Option<RegistroRow>> {
        let row = sqlx::query_as::<_, RegistroRow>("SELECT * FROM registros_delictuales WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row)
    }

    /// All non-deleted registros for one persona, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_persona(&mut self, persona_id: PersonaId) -> Result<Vec<RegistroRow>> {
        let rows = sqlx::query_as::<_, RegistroRow>(
            "SELECT * FROM registros_delictuales
             WHERE persona_id = ? AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC",
        )
        .bind(persona_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Paginated search ordered newest-id first, scoped to non-deleted rows.
    #[instrument(skip(self, params), err)]
    pub async fn search(&mut self, params: &RegistroSearchParams, page: i64, page_size: i64) -> Result<Listing<RegistroRow>> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM registros_delictuales WHERE deleted_at IS NULL");
        push_search_filters(&mut count_qb, params);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *self.db).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM registros_delictuales WHERE deleted_at IS NULL");
        push_search_filters(&mut qb, params);
        qb.push(" ORDER BY id DESC LIMIT ");
        qb.push_bind(page_size);
        qb.push(" OFFSET ");
        qb.push_bind((page - 1) * page_size);
        let items = qb.build_query_as::<RegistroRow>().fetch_all(&mut *self.db).await?;

        Ok(Listing {
            items,
            total,
            page,
            page_size,
        })
    }

    /// The full filtered set, for the unpaginated path and CSV/XLSX export.
    #[instrument(skip(self, params), err)]
    pub async fn search_all(&mut self, params: &RegistroSearchParams, limit: Option<i64>) -> Result<Vec<RegistroRow>> {
        let mut qb = QueryBuilder::new("SELECT * FROM registros_delictuales WHERE deleted_at IS NULL");
        push_search_filters(&mut qb, params);
        qb.push(" ORDER BY id DESC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        let items = qb.build_query_as::<RegistroRow>().fetch_all(&mut *self.db).await?;
        Ok(items)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Registros<'c> {
    type CreateRequest = RegistroCreateDBRequest;
    type UpdateRequest = RegistroUpdateDBRequest;
    type Response = RegistroRow;
    type Filter = RegistroFilter;

    #[instrument(skip(self, request), fields(persona_id = request.persona_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO registros_delictuales
                 (persona_id, tipo_delito, lugar, estado, juzgado, detalle,
                  created_by, updated_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.persona_id)
        .bind(&request.tipo_delito)
        .bind(&request.lugar)
        .bind(&request.estado)
        .bind(&request.juzgado)
        .bind(&request.detalle)
        .bind(request.created_by)
        .bind(request.created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: i64) -> Result<Option<Self::Response>> {
        let row = sqlx::query_as::<_, RegistroRow>("SELECT * FROM registros_delictuales WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: i64, request: &Self::UpdateRequest) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE registros_delictuales
             SET persona_id = ?, tipo_delito = ?, lugar = ?, estado = ?, juzgado = ?, detalle = ?,
                 updated_by = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(request.persona_id)
        .bind(&request.tipo_delito)
        .bind(&request.lugar)
        .bind(&request.estado)
        .bind(&request.juzgado)
        .bind(&request.detalle)
        .bind(request.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft delete, recording the actor as the last updater.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: i64, actor: Option<UserId>) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE registros_delictuales SET deleted_at = ?, updated_by = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(actor)
        .bind(now)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter), fields(page = filter.page, page_size = filter.page_size), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Listing<Self::Response>> {
        let params = RegistroSearchParams {
            persona_id: filter.persona_id,
            q: None,
        };
        self.search(&params, filter.page, filter.page_size).await
    }
}
