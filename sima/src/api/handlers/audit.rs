//! Audit-trail queries. Admin only; the trail itself is written by the
//! entity handlers through [`crate::db::handlers::audit_logs::record`].

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    api::models::{
        audit::{ActorHistoryQuery, AuditLogResponse, EntityHistoryQuery, RecentActivityQuery},
        pagination::Page,
    },
    auth::current_user::AdminUser,
    db::handlers::{AuditLogs, audit_logs::DEFAULT_RECENT_LIMIT},
    errors::Error,
    types::UserId,
};

/// Recent activity feed, optionally filtered by entity and action.
#[utoipa::path(
    get,
    path = "/api/audit/recent",
    params(RecentActivityQuery),
    tag = "audit",
    responses(
        (status = 200, description = "Recent entries, newest first", body = [AuditLogResponse]),
        (status = 403, description = "Admin role required"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn recent(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<RecentActivityQuery>,
) -> Result<Json<Vec<AuditLogResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows = AuditLogs::new(&mut conn)
        .recent(
            query.limit.unwrap_or(DEFAULT_RECENT_LIMIT),
            query.entity.as_deref(),
            query.action.as_deref(),
        )
        .await?;

    Ok(Json(rows.into_iter().map(AuditLogResponse::from).collect()))
}

/// Mutation history of one entity, newest first.
#[utoipa::path(
    get,
    path = "/api/audit/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Entity type (persona, registro)"),
        ("id" = i64, Path, description = "Entity id"),
        EntityHistoryQuery,
    ),
    tag = "audit",
    responses(
        (status = 200, description = "History page", body = Page<AuditLogResponse>),
        (status = 403, description = "Admin role required"),
    )
)]
#[tracing::instrument(skip_all, fields(%entity, id))]
pub async fn entity_history(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path((entity, id)): Path<(String, i64)>,
    Query(query): Query<EntityHistoryQuery>,
) -> Result<Json<Page<AuditLogResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let listing = AuditLogs::new(&mut conn)
        .for_entity(&entity, id, query.pagination.page(), query.pagination.page_size_or(50))
        .await?;

    Ok(Json(Page::new(
        listing.items.into_iter().map(AuditLogResponse::from).collect(),
        listing.total,
        listing.page,
        listing.page_size,
    )))
}

/// Everything one actor did, newest first, optionally bounded in time.
#[utoipa::path(
    get,
    path = "/api/audit/actor/{id}",
    params(("id" = i64, Path, description = "Actor user id"), ActorHistoryQuery),
    tag = "audit",
    responses(
        (status = 200, description = "History page", body = Page<AuditLogResponse>),
        (status = 403, description = "Admin role required"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn actor_history(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<UserId>,
    Query(query): Query<ActorHistoryQuery>,
) -> Result<Json<Page<AuditLogResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let listing = AuditLogs::new(&mut conn)
        .for_user(
            id,
            query.pagination.page(),
            query.pagination.page_size_or(50),
            query.from,
            query.to,
        )
        .await?;

    Ok(Json(Page::new(
        listing.items.into_iter().map(AuditLogResponse::from).collect(),
        listing.total,
        listing.page,
        listing.page_size,
    )))
}
