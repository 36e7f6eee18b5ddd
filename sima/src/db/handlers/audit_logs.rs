//! Append-only audit trail.
//!
//! Every mutating action on personas and registros produces one entry. The
//! write is best-effort by design: the primary operation and the audit
//! write are two sequential calls, not one transaction, and an audit
//! failure is logged and absorbed so it never aborts the caller's mutation.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::Listing,
    models::audit_logs::{AuditLogCreateDBRequest, AuditLogRow},
};
use crate::types::UserId;

/// Default and maximum sizes for the recent-activity feed.
pub const DEFAULT_RECENT_LIMIT: i64 = 20;
pub const MAX_RECENT_LIMIT: i64 = 100;

pub struct AuditLogs<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> AuditLogs<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Append one entry. Callers that must not fail on audit problems go
    /// through [`record`] instead.
    #[instrument(skip(self, request), fields(action = %request.action, entity = %request.entity), err)]
    pub async fn log(&mut self, request: &AuditLogCreateDBRequest) -> Result<i64> {
        let payload = serde_json::to_string(&request.payload).unwrap_or_else(|_| "{}".to_string());
        let result = sqlx::query(
            "INSERT INTO audit_logs (user_id, action, entity, entity_id, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request.user_id)
        .bind(&request.action)
        .bind(&request.entity)
        .bind(request.entity_id)
        .bind(payload)
        .bind(Utc::now())
        .execute(&mut *self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// History for one entity, newest first.
    #[instrument(skip(self), err)]
    pub async fn for_entity(&mut self, entity: &str, entity_id: i64, page: i64, page_size: i64) -> Result<Listing<AuditLogRow>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs WHERE entity = ? AND entity_id = ?")
            .bind(entity)
            .bind(entity_id)
            .fetch_one(&mut *self.db)
            .await?;

        let items = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs WHERE entity = ? AND entity_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(entity)
        .bind(entity_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(Listing {
            items,
            total,
            page,
            page_size,
        })
    }

    /// History for one actor, newest first, with an optional time range.
    #[instrument(skip(self), err)]
    pub async fn for_user(
        &mut self,
        user_id: UserId,
        page: i64,
        page_size: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Listing<AuditLogRow>> {
        fn push_range(qb: &mut QueryBuilder<'_, Sqlite>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) {
            if let Some(from) = from {
                qb.push(" AND created_at >= ");
                qb.push_bind(from);
            }
            if let Some(to) = to {
                qb.push(" AND created_at <= ");
                qb.push_bind(to);
            }
        }

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE user_id = ");
        count_qb.push_bind(user_id);
        push_range(&mut count_qb, from, to);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *self.db).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM audit_logs WHERE user_id = ");
        qb.push_bind(user_id);
        push_range(&mut qb, from, to);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page_size);
        qb.push(" OFFSET ");
        qb.push_bind((page - 1) * page_size);
        let items = qb.build_query_as::<AuditLogRow>().fetch_all(&mut *self.db).await?;

        Ok(Listing {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Recent activity across the whole trail, optionally filtered by
    /// entity and action.
    #[instrument(skip(self), err)]
    pub async fn recent(&mut self, limit: i64, entity: Option<&str>, action: Option<&str>) -> Result<Vec<AuditLogRow>> {
        let mut qb = QueryBuilder::new("SELECT * FROM audit_logs WHERE 1 = 1");
        if let Some(entity) = entity.filter(|s| !s.is_empty()) {
            qb.push(" AND entity = ");
            qb.push_bind(entity.to_string());
        }
        if let Some(action) = action.filter(|s| !s.is_empty()) {
            qb.push(" AND action = ");
            qb.push_bind(action.to_string());
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit.clamp(1, MAX_RECENT_LIMIT));
        let items = qb.build_query_as::<AuditLogRow>().fetch_all(&mut *self.db).await?;
        Ok(items)
    }
}

/// Best-effort audit write: acquires its own connection and swallows every
/// failure after logging it. The caller's primary mutation stands either
/// way. Call this only after releasing any held pool connection.
pub async fn record(
    pool: &SqlitePool,
    actor: Option<UserId>,
    action: &str,
    entity: &str,
    entity_id: i64,
    payload: serde_json::Value,
) {
    let request = AuditLogCreateDBRequest {
        user_id: actor,
        action: action.to_string(),
        entity: entity.to_string(),
        entity_id: Some(entity_id),
        payload,
    };

    let result = async {
        let mut conn = pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
        AuditLogs::new(&mut conn).log(&request).await
    }
    .await;

    if let Err(err) = result {
        tracing::error!(
            error = %err,
            actor = ?actor,
            action,
            entity,
            entity_id,
            "audit log write failed"
        );
    }
}
