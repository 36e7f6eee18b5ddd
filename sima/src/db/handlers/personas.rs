//! Database repository for personas registradas.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::{Listing, Repository, like_contains},
    models::personas::{PersonaCreateDBRequest, PersonaRow, PersonaUpdateDBRequest},
};
use crate::types::{PersonaId, UserId};

/// Equality filters for the base list operation.
#[derive(Debug, Clone, Default)]
pub struct PersonaFilter {
    pub dni: Option<String>,
    pub comisaria: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

/// Search criteria shared by the paginated search and the export path.
#[derive(Debug, Clone, Default)]
pub struct PersonaSearchParams {
    /// Free text matched against nombre, apellido and dni (contains, OR)
    pub q: Option<String>,
    /// Exact DNI
    pub dni: Option<String>,
    /// Contains-match on comisaria
    pub comisaria: Option<String>,
}

/// Aggregate counters for the statistics endpoint.
#[derive(Debug, Clone)]
pub struct PersonaStatistics {
    pub total: i64,
    pub por_comisaria: Vec<(Option<String>, i64)>,
    pub ultimos_30_dias: i64,
}

pub struct Personas<'c> {
    db: &'c mut SqliteConnection,
}

fn push_search_filters(qb: &mut QueryBuilder<'_, Sqlite>, params: &PersonaSearchParams) {
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_contains(q);
        qb.push(" AND (LOWER(nombre) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(apellido) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(dni) LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }

    if let Some(dni) = params.dni.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND dni = ");
        qb.push_bind(dni.to_string());
    }

    if let Some(comisaria) = params.comisaria.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND LOWER(comisaria) LIKE ");
        qb.push_bind(like_contains(comisaria));
        qb.push(" ESCAPE '\\'");
    }
}

impl<'c> Personas<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Fetch by id including soft-deleted rows. Detail views keep showing
    /// deleted personas for history/audit purposes even though search and
    /// listings exclude them.
    #[instrument(skip(self), err)]
    pub async fn get_by_id_any(&mut self, id: PersonaId) -> Result<Option<PersonaRow>> {
        let row = sqlx::query_as::<_, PersonaRow>("SELECT * FROM personas_registradas WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row)
    }

    /// Early duplicate-DNI rejection among non-deleted rows. The partial
    /// unique index remains the final arbiter under concurrent writers.
    #[instrument(skip(self), err)]
    pub async fn find_active_by_dni(&mut self, dni: &str, exclude_id: Option<PersonaId>) -> Result<Option<PersonaId>> {
        let id = match exclude_id {
            Some(exclude) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT id FROM personas_registradas WHERE dni = ? AND deleted_at IS NULL AND id != ?",
                )
                .bind(dni)
                .bind(exclude)
                .fetch_optional(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT id FROM personas_registradas WHERE dni = ? AND deleted_at IS NULL")
                    .bind(dni)
                    .fetch_optional(&mut *self.db)
                    .await?
            }
        };
        Ok(id)
    }

    /// Paginated search ordered by apellido, scoped to non-deleted rows.
    #[instrument(skip(self, params), err)]
    pub async fn search(&mut self, params: &PersonaSearchParams, page: i64, page_size: i64) -> Result<Listing<PersonaRow>> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM personas_registradas WHERE deleted_at IS NULL");
        push_search_filters(&mut count_qb, params);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *self.db).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM personas_registradas WHERE deleted_at IS NULL");
        push_search_filters(&mut qb, params);
        qb.push(" ORDER BY apellido ASC");
        qb.push(" LIMIT ");
        qb.push_bind(page_size);
        qb.push(" OFFSET ");
        qb.push_bind((page - 1) * page_size);
        let items = qb.build_query_as::<PersonaRow>().fetch_all(&mut *self.db).await?;

        Ok(Listing {
            items,
            total,
            page,
            page_size,
        })
    }

    /// The full filtered set ordered by apellido. Serves the unpaginated
    /// search path and is the basis for CSV/XLSX export.
    #[instrument(skip(self, params), err)]
    pub async fn search_all(&mut self, params: &PersonaSearchParams, limit: Option<i64>) -> Result<Vec<PersonaRow>> {
        let mut qb = QueryBuilder::new("SELECT * FROM personas_registradas WHERE deleted_at IS NULL");
        push_search_filters(&mut qb, params);
        qb.push(" ORDER BY apellido ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        let items = qb.build_query_as::<PersonaRow>().fetch_all(&mut *self.db).await?;
        Ok(items)
    }

    /// Counters for the statistics endpoint, all scoped to active rows.
    #[instrument(skip(self), err)]
    pub async fn statistics(&mut self) -> Result<PersonaStatistics> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM personas_registradas WHERE deleted_at IS NULL")
            .fetch_one(&mut *self.db)
            .await?;

        let por_comisaria = sqlx::query_as::<_, (Option<String>, i64)>(
            "SELECT comisaria, COUNT(*) as count FROM personas_registradas
             WHERE deleted_at IS NULL
             GROUP BY comisaria
             ORDER BY count DESC",
        )
        .fetch_all(&mut *self.db)
        .await?;

        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::days(30);
        let ultimos_30_dias = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM personas_registradas WHERE deleted_at IS NULL AND created_at >= ?",
        )
        .bind(cutoff)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(PersonaStatistics {
            total,
            por_comisaria,
            ultimos_30_dias,
        })
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Personas<'c> {
    type CreateRequest = PersonaCreateDBRequest;
    type UpdateRequest = PersonaUpdateDBRequest;
    type Response = PersonaRow;
    type Filter = PersonaFilter;

    #[instrument(skip(self, request), fields(dni = %request.dni), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO personas_registradas
                 (nombre, apellido, dni, fecha_nacimiento, nacionalidad, direccion, telefono,
                  email, observaciones, foto_principal, fotos_adicionales, comisaria,
                  created_by, updated_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.nombre)
        .bind(&request.apellido)
        .bind(&request.dni)
        .bind(request.fecha_nacimiento)
        .bind(&request.nacionalidad)
        .bind(&request.direccion)
        .bind(&request.telefono)
        .bind(&request.email)
        .bind(&request.observaciones)
        .bind(&request.photos.principal)
        .bind(request.photos.adicionales_json())
        .bind(&request.comisaria)
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
        let row = sqlx::query_as::<_, PersonaRow>("SELECT * FROM personas_registradas WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: i64, request: &Self::UpdateRequest) -> Result<bool> {
        let now = Utc::now();
        // New files replace the entire photo set; without them the photos
        // stay untouched.
        let result = match &request.photos {
            Some(photos) => {
                sqlx::query(
                    "UPDATE personas_registradas
                     SET nombre = ?, apellido = ?, dni = ?, fecha_nacimiento = ?, nacionalidad = ?,
                         direccion = ?, telefono = ?, email = ?, observaciones = ?, comisaria = ?,
                         foto_principal = ?, fotos_adicionales = ?, updated_by = ?, updated_at = ?
                     WHERE id = ? AND deleted_at IS NULL",
                )
                .bind(&request.nombre)
                .bind(&request.apellido)
                .bind(&request.dni)
                .bind(request.fecha_nacimiento)
                .bind(&request.nacionalidad)
                .bind(&request.direccion)
                .bind(&request.telefono)
                .bind(&request.email)
                .bind(&request.observaciones)
                .bind(&request.comisaria)
                .bind(&photos.principal)
                .bind(photos.adicionales_json())
                .bind(request.updated_by)
                .bind(now)
                .bind(id)
                .execute(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE personas_registradas
                     SET nombre = ?, apellido = ?, dni = ?, fecha_nacimiento = ?, nacionalidad = ?,
                         direccion = ?, telefono = ?, email = ?, observaciones = ?, comisaria = ?,
                         updated_by = ?, updated_at = ?
                     WHERE id = ? AND deleted_at IS NULL",
                )
                .bind(&request.nombre)
                .bind(&request.apellido)
                .bind(&request.dni)
                .bind(request.fecha_nacimiento)
                .bind(&request.nacionalidad)
                .bind(&request.direccion)
                .bind(&request.telefono)
                .bind(&request.email)
                .bind(&request.observaciones)
                .bind(&request.comisaria)
                .bind(request.updated_by)
                .bind(now)
                .bind(id)
                .execute(&mut *self.db)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Soft delete: the row stays queryable by id but disappears from
    /// search, listings and the DNI uniqueness scope.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: i64, actor: Option<UserId>) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE personas_registradas SET deleted_at = ?, updated_by = ?, updated_at = ?
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
        let params = PersonaSearchParams {
            q: None,
            dni: filter.dni.clone(),
            comisaria: None,
        };

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM personas_registradas WHERE deleted_at IS NULL");
        push_search_filters(&mut count_qb, &params);
        if let Some(comisaria) = filter.comisaria.as_deref().filter(|s| !s.is_empty()) {
            count_qb.push(" AND comisaria = ");
            count_qb.push_bind(comisaria.to_string());
        }
        let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *self.db).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM personas_registradas WHERE deleted_at IS NULL");
        push_search_filters(&mut qb, &params);
        if let Some(comisaria) = filter.comisaria.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND comisaria = ");
            qb.push_bind(comisaria.to_string());
        }
        qb.push(" ORDER BY id DESC LIMIT ");
        qb.push_bind(filter.page_size);
        qb.push(" OFFSET ");
        qb.push_bind((filter.page - 1) * filter.page_size);
        let items = qb.build_query_as::<PersonaRow>().fetch_all(&mut *self.db).await?;

        Ok(Listing {
            items,
            total,
            page: filter.page,
            page_size: filter.page_size,
        })
    }
}
