//! Database models for the audit trail.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{AuditLogId, UserId};

/// One row of the append-only `audit_logs` table. `payload` is the raw
/// serialized JSON of the validated input that produced the mutation.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i64>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditLogCreateDBRequest {
    pub user_id: Option<UserId>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i64>,
    pub payload: serde_json::Value,
}
