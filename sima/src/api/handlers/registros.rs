//! Handlers for registros delictuales: CRUD, search with export, details
//! with the linked persona, and duplication.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    api::handlers::export_response,
    api::models::{
        CreatedResponse, OkResponse,
        pagination::Page,
        personas::PersonaResponse,
        registros::{RegistroDetailResponse, RegistroInput, RegistroResponse, RegistroSearchQuery},
        users::CurrentUser,
    },
    db::handlers::{Personas, Registros, Repository, audit_logs, registros::RegistroSearchParams},
    db::models::registros::{RegistroCreateDBRequest, RegistroUpdateDBRequest},
    errors::Error,
    export::{self, ExportFormat},
    types::RegistroId,
    validation::{schemas, validate},
};

fn registro_not_found() -> Error {
    Error::not_found("Registro no encontrado")
}

/// Search registros. Paginated with `page`+`pageSize`, full set otherwise,
/// or a CSV/XLSX download via `format`.
#[utoipa::path(
    get,
    path = "/api/registros",
    params(RegistroSearchQuery),
    tag = "registros",
    responses(
        (status = 200, description = "Search results", body = Page<RegistroResponse>),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<RegistroSearchQuery>,
) -> Result<Response, Error> {
    let params = RegistroSearchParams {
        persona_id: query.persona_id,
        q: query.q.clone(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Registros::new(&mut conn);

    if let Some(format) = ExportFormat::from_param(query.format.as_deref()) {
        let max_records = state.config.export.max_records;
        let rows = repo.search_all(&params, Some(max_records)).await?;
        if rows.len() as i64 == max_records {
            tracing::warn!(max_records, "registro export hit the row cap; output is truncated");
        }
        return export_response(format, &export::registros_sheet(&rows), "registros");
    }

    match query.pagination.explicit() {
        Some((page, page_size)) => {
            let listing = repo.search(&params, page, page_size).await?;
            Ok(Json(Page::new(
                listing.items.into_iter().map(RegistroResponse::from).collect::<Vec<_>>(),
                listing.total,
                listing.page,
                listing.page_size,
            ))
            .into_response())
        }
        None => {
            let rows = repo.search_all(&params, None).await?;
            let items: Vec<RegistroResponse> = rows.into_iter().map(RegistroResponse::from).collect();
            Ok(Json(items).into_response())
        }
    }
}

/// Create a registro. The persona reference is enforced at the storage
/// layer: a dangling id surfaces as a 400 reference error.
#[utoipa::path(
    post,
    path = "/api/registros",
    request_body = RegistroInput,
    tag = "registros",
    responses(
        (status = 201, description = "Registro created", body = CreatedResponse),
        (status = 400, description = "Validation failure or unknown persona"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<RegistroInput>,
) -> Result<(StatusCode, Json<CreatedResponse>), Error> {
    let input = request.sanitized();
    let payload = serde_json::to_value(&input).unwrap_or_default();
    validate(&schemas::REGISTRO, &payload)?;

    let create_request = RegistroCreateDBRequest {
        persona_id: input.persona_id.expect("validated"),
        tipo_delito: input.tipo_delito.clone().expect("validated"),
        lugar: input.lugar.clone(),
        estado: input.estado.clone(),
        juzgado: input.juzgado.clone(),
        detalle: input.detalle.clone(),
        created_by: Some(user.id),
    };

    let id = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Registros::new(&mut conn).create(&create_request).await?
    };

    audit_logs::record(&state.db, Some(user.id), "create", "registro", id, payload).await;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Registro details plus the linked persona. The persona lookup is by id,
/// so a soft-deleted persona still appears.
#[utoipa::path(
    get,
    path = "/api/registros/{id}",
    params(("id" = i64, Path, description = "Registro id")),
    tag = "registros",
    responses(
        (status = 200, description = "Registro with persona", body = RegistroDetailResponse),
        (status = 404, description = "Unknown registro"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<RegistroId>,
) -> Result<Json<RegistroDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let registro = Registros::new(&mut conn).get_by_id_any(id).await?.ok_or_else(registro_not_found)?;
    let persona = Personas::new(&mut conn).get_by_id_any(registro.persona_id).await?;

    Ok(Json(RegistroDetailResponse {
        registro: RegistroResponse::from(registro),
        persona: persona.map(PersonaResponse::from),
    }))
}

/// Update a registro.
#[utoipa::path(
    put,
    path = "/api/registros/{id}",
    params(("id" = i64, Path, description = "Registro id")),
    request_body = RegistroInput,
    tag = "registros",
    responses(
        (status = 200, description = "Updated", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Unknown or deleted registro"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<RegistroId>,
    Json(request): Json<RegistroInput>,
) -> Result<Json<OkResponse>, Error> {
    let input = request.sanitized();
    let payload = serde_json::to_value(&input).unwrap_or_default();
    validate(&schemas::REGISTRO, &payload)?;

    let update_request = RegistroUpdateDBRequest {
        persona_id: input.persona_id.expect("validated"),
        tipo_delito: input.tipo_delito.clone().expect("validated"),
        lugar: input.lugar.clone(),
        estado: input.estado.clone(),
        juzgado: input.juzgado.clone(),
        detalle: input.detalle.clone(),
        updated_by: Some(user.id),
    };

    let updated = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Registros::new(&mut conn).update(id, &update_request).await?
    };
    if !updated {
        return Err(registro_not_found());
    }

    audit_logs::record(&state.db, Some(user.id), "update", "registro", id, payload).await;

    Ok(Json(OkResponse::new()))
}

/// Soft-delete a registro.
#[utoipa::path(
    delete,
    path = "/api/registros/{id}",
    params(("id" = i64, Path, description = "Registro id")),
    tag = "registros",
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 404, description = "Unknown or already deleted registro"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<RegistroId>,
) -> Result<Json<OkResponse>, Error> {
    let deleted = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Registros::new(&mut conn).delete(id, Some(user.id)).await?
    };
    if !deleted {
        return Err(registro_not_found());
    }

    audit_logs::record(&state.db, Some(user.id), "delete", "registro", id, json!({})).await;

    Ok(Json(OkResponse::new()))
}

/// Duplicate a registro: clone every business field into a fresh row owned
/// by the duplicating actor, through the normal create path.
#[utoipa::path(
    post,
    path = "/api/registros/{id}/duplicate",
    params(("id" = i64, Path, description = "Source registro id")),
    tag = "registros",
    responses(
        (status = 201, description = "Clone created", body = CreatedResponse),
        (status = 404, description = "Unknown source registro"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn duplicate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<RegistroId>,
) -> Result<(StatusCode, Json<CreatedResponse>), Error> {
    let (new_id, payload) = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut repo = Registros::new(&mut conn);

        let source = repo.get_by_id(id).await?.ok_or_else(registro_not_found)?;
        let create_request = source.to_create_request(Some(user.id));
        let new_id = repo.create(&create_request).await?;
        let payload = serde_json::to_value(&create_request).unwrap_or_default();
        (new_id, payload)
    };

    // The clone is audited as a plain creation, not specially tagged
    audit_logs::record(&state.db, Some(user.id), "create", "registro", new_id, payload).await;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: new_id })))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn seed_persona(ctx: &TestContext, token: &str, dni: &str) -> i64 {
        let response = ctx
            .multipart_request(
                "POST",
                "/api/personas",
                Some(token),
                &[("nombre", "Juan"), ("apellido", "Pérez"), ("dni", dni)],
                &[],
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_and_detail_with_linked_persona() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;
        let persona_id = seed_persona(&ctx, &pair.access_token, "36000001").await;

        let response = ctx
            .request(
                "POST",
                "/api/registros",
                Some(&pair.access_token),
                Some(json!({"persona_id": persona_id, "tipo_delito": "Robo", "lugar": "Rosario"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let id = response.body["id"].as_i64().unwrap();

        let detail = ctx.request("GET", &format!("/api/registros/{id}"), Some(&pair.access_token), None).await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body["tipo_delito"], "Robo");
        assert_eq!(detail.body["persona"]["id"].as_i64(), Some(persona_id));
    }

    #[tokio::test]
    async fn dangling_persona_reference_is_a_400_reference_error() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;

        let response = ctx
            .request(
                "POST",
                "/api/registros",
                Some(&pair.access_token),
                Some(json!({"persona_id": 9999, "tipo_delito": "Robo"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["code"], "REFERENCE_ERROR");
    }

    #[tokio::test]
    async fn missing_required_fields_are_a_400_validation_error() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;

        let response = ctx
            .request("POST", "/api/registros", Some(&pair.access_token), Some(json!({"lugar": "Rosario"})))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let fields = response.body["fields"].as_array().unwrap();
        assert!(fields.iter().any(|f| f["field"] == "persona_id"));
        assert!(fields.iter().any(|f| f["field"] == "tipo_delito"));
    }

    #[tokio::test]
    async fn search_by_persona_and_text() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;
        let p1 = seed_persona(&ctx, &pair.access_token, "36000002").await;
        let p2 = seed_persona(&ctx, &pair.access_token, "36000003").await;

        for (persona, tipo) in [(p1, "Robo agravado"), (p1, "Hurto"), (p2, "Estafa")] {
            let response = ctx
                .request(
                    "POST",
                    "/api/registros",
                    Some(&pair.access_token),
                    Some(json!({"persona_id": persona, "tipo_delito": tipo})),
                )
                .await;
            assert_eq!(response.status, StatusCode::CREATED);
        }

        let response = ctx
            .request(
                "GET",
                &format!("/api/registros?persona_id={p1}&page=1&pageSize=10"),
                Some(&pair.access_token),
                None,
            )
            .await;
        assert_eq!(response.body["total"], 2);

        let response = ctx
            .request("GET", "/api/registros?q=estafa&page=1&pageSize=10", Some(&pair.access_token), None)
            .await;
        assert_eq!(response.body["total"], 1);
        assert_eq!(response.body["items"][0]["tipo_delito"], "Estafa");
    }

    #[tokio::test]
    async fn update_and_soft_delete() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;
        let persona_id = seed_persona(&ctx, &pair.access_token, "36000004").await;

        let created = ctx
            .request(
                "POST",
                "/api/registros",
                Some(&pair.access_token),
                Some(json!({"persona_id": persona_id, "tipo_delito": "Robo"})),
            )
            .await;
        let id = created.body["id"].as_i64().unwrap();

        let response = ctx
            .request(
                "PUT",
                &format!("/api/registros/{id}"),
                Some(&pair.access_token),
                Some(json!({"persona_id": persona_id, "tipo_delito": "Robo calificado", "estado": "En trámite"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = ctx.request("DELETE", &format!("/api/registros/{id}"), Some(&pair.access_token), None).await;
        assert_eq!(response.status, StatusCode::OK);

        // Gone from listings, still visible by id
        let search = ctx
            .request("GET", "/api/registros?page=1&pageSize=10", Some(&pair.access_token), None)
            .await;
        assert_eq!(search.body["total"], 0);
        let detail = ctx.request("GET", &format!("/api/registros/{id}"), Some(&pair.access_token), None).await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body["tipo_delito"], "Robo calificado");

        // Updating a deleted registro reports not found
        let response = ctx
            .request(
                "PUT",
                &format!("/api/registros/{id}"),
                Some(&pair.access_token),
                Some(json!({"persona_id": persona_id, "tipo_delito": "Otro"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_clones_business_fields_with_a_fresh_identity() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;
        let persona_id = seed_persona(&ctx, &pair.access_token, "36000005").await;

        let created = ctx
            .request(
                "POST",
                "/api/registros",
                Some(&pair.access_token),
                Some(json!({
                    "persona_id": persona_id,
                    "tipo_delito": "Robo agravado",
                    "lugar": "Córdoba",
                    "estado": "En trámite",
                    "juzgado": "Juzgado N°3",
                    "detalle": "Expediente 123/2025",
                })),
            )
            .await;
        let id = created.body["id"].as_i64().unwrap();

        let response = ctx
            .request("POST", &format!("/api/registros/{id}/duplicate"), Some(&pair.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let clone_id = response.body["id"].as_i64().unwrap();
        assert_ne!(clone_id, id);

        let clone = ctx
            .request("GET", &format!("/api/registros/{clone_id}"), Some(&pair.access_token), None)
            .await;
        assert_eq!(clone.body["tipo_delito"], "Robo agravado");
        assert_eq!(clone.body["lugar"], "Córdoba");
        assert_eq!(clone.body["juzgado"], "Juzgado N°3");
        assert_eq!(clone.body["persona_id"].as_i64(), Some(persona_id));

        let missing = ctx
            .request("POST", "/api/registros/99999/duplicate", Some(&pair.access_token), None)
            .await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_returns_the_registros_sheet() {
        let ctx = TestContext::new().await;
        let pair = ctx.login("admin", "admin123").await;
        let persona_id = seed_persona(&ctx, &pair.access_token, "36000006").await;

        ctx.request(
            "POST",
            "/api/registros",
            Some(&pair.access_token),
            Some(json!({"persona_id": persona_id, "tipo_delito": "Robo"})),
        )
        .await;

        let response = ctx
            .request("GET", "/api/registros?format=csv", Some(&pair.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        let text = String::from_utf8(response.raw.clone()).unwrap();
        assert!(text.contains("ID;Persona ID;Tipo de delito"));
        assert!(text.contains("Robo"));
    }
}
