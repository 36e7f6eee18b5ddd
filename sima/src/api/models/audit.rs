//! API response models for the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::db::models::audit_logs::AuditLogRow;
use crate::types::{AuditLogId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogResponse {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i64>,
    /// The validated input that produced the mutation
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogResponse {
    fn from(row: AuditLogRow) -> Self {
        let payload = serde_json::from_str(&row.payload).unwrap_or(serde_json::Value::Null);
        Self {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            entity: row.entity,
            entity_id: row.entity_id,
            payload,
            created_at: row.created_at,
        }
    }
}

/// Query parameters for the recent-activity feed.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecentActivityQuery {
    /// Restrict to one entity type (persona, registro, ...)
    pub entity: Option<String>,
    /// Restrict to one action (create, update, delete)
    pub action: Option<String>,
    /// Maximum entries to return (default 20, max 100)
    pub limit: Option<i64>,
}

/// Query parameters for an entity's audit history.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EntityHistoryQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Query parameters for an actor's audit history.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActorHistoryQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// Only entries at or after this instant (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Only entries at or before this instant (RFC 3339)
    pub to: Option<DateTime<Utc>>,
}
