//! Handlers for personas registradas: CRUD with photo attachment, search
//! with CSV/XLSX export, details with related registros, and statistics.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
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
        personas::{ComisariaCount, PersonaDetailResponse, PersonaInput, PersonaResponse, PersonaSearchQuery, StatisticsResponse},
        registros::RegistroResponse,
        users::CurrentUser,
    },
    db::handlers::{Personas, Registros, Repository, audit_logs, personas::PersonaSearchParams},
    db::models::personas::{PersonaCreateDBRequest, PersonaUpdateDBRequest, PhotoSet},
    errors::Error,
    export::{self, ExportFormat},
    types::PersonaId,
    validation::{schemas, validate},
};

fn persona_not_found() -> Error {
    Error::not_found("Persona no encontrada")
}

/// Read the multipart form: text fields populate a [`PersonaInput`], files
/// under `fotos` land in the blob store in upload order.
async fn read_persona_form(multipart: &mut Multipart, state: &AppState) -> Result<(PersonaInput, Vec<String>), Error> {
    let mut input = PersonaInput::default();
    let mut fotos = Vec::new();

    let form_error = |e: axum::extract::multipart::MultipartError| Error::BadRequest {
        message: format!("Error al procesar el formulario: {e}"),
    };

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "fotos" || name == "fotos[]" {
            if fotos.len() >= state.config.uploads.max_files {
                return Err(Error::BadRequest {
                    message: "Demasiados archivos adjuntos".to_string(),
                });
            }
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let bytes = field.bytes().await.map_err(form_error)?;
            if bytes.is_empty() {
                continue;
            }
            let reference = state.uploads.store(&file_name, &bytes).await?;
            fotos.push(reference);
        } else {
            let value = field.text().await.map_err(form_error)?;
            input.set_field(&name, value);
        }
    }

    Ok((input, fotos))
}

fn build_create_request(input: &PersonaInput, fotos: Vec<String>, actor: i64) -> PersonaCreateDBRequest {
    PersonaCreateDBRequest {
        nombre: input.nombre.clone().expect("validated"),
        apellido: input.apellido.clone().expect("validated"),
        dni: input.dni.clone().expect("validated"),
        fecha_nacimiento: input.fecha_nacimiento_parsed(),
        nacionalidad: input.nacionalidad.clone(),
        direccion: input.direccion.clone(),
        telefono: input.telefono.clone(),
        email: input.email.clone(),
        observaciones: input.observaciones.clone(),
        comisaria: input.comisaria.clone(),
        photos: PhotoSet::from_stored(fotos),
        created_by: Some(actor),
    }
}

/// Search personas. Returns a paginated page when `page`+`pageSize` are
/// given, the full filtered set otherwise, or a CSV/XLSX download when
/// `format` says so.
#[utoipa::path(
    get,
    path = "/api/personas",
    params(PersonaSearchQuery),
    tag = "personas",
    responses(
        (status = 200, description = "Search results", body = Page<PersonaResponse>),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<PersonaSearchQuery>,
) -> Result<Response, Error> {
    let params = PersonaSearchParams {
        q: query.q.clone(),
        dni: query.dni.clone(),
        comisaria: query.comisaria.clone(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Personas::new(&mut conn);

    if let Some(format) = ExportFormat::from_param(query.format.as_deref()) {
        let max_records = state.config.export.max_records;
        let rows = repo.search_all(&params, Some(max_records)).await?;
        if rows.len() as i64 == max_records {
            tracing::warn!(max_records, "persona export hit the row cap; output is truncated");
        }
        return export_response(format, &export::personas_sheet(&rows), "personas");
    }

    match query.pagination.explicit() {
        Some((page, page_size)) => {
            let listing = repo.search(&params, page, page_size).await?;
            Ok(Json(Page::new(
                listing.items.into_iter().map(PersonaResponse::from).collect::<Vec<_>>(),
                listing.total,
                listing.page,
                listing.page_size,
            ))
            .into_response())
        }
        None => {
            let rows = repo.search_all(&params, None).await?;
            let items: Vec<PersonaResponse> = rows.into_iter().map(PersonaResponse::from).collect();
            Ok(Json(items).into_response())
        }
    }
}

/// Create a persona from a multipart form. The first uploaded file becomes
/// the primary photo; the whole ordered list is stored alongside it.
#[utoipa::path(
    post,
    path = "/api/personas",
    request_body(content_type = "multipart/form-data"),
    tag = "personas",
    responses(
        (status = 201, description = "Persona created", body = CreatedResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Duplicate DNI among active rows"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedResponse>), Error> {
    let (input, fotos) = read_persona_form(&mut multipart, &state).await?;
    let input = input.sanitized();
    let payload = serde_json::to_value(&input).unwrap_or_default();
    validate(&schemas::PERSONA, &payload)?;

    let request = build_create_request(&input, fotos, user.id);

    let id = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut repo = Personas::new(&mut conn);

        // Early rejection; the partial unique index decides under races
        if repo.find_active_by_dni(&request.dni, None).await?.is_some() {
            return Err(Error::conflict("Ya existe una persona con este DNI"));
        }

        repo.create(&request).await?
    };

    audit_logs::record(&state.db, Some(user.id), "create", "persona", id, payload).await;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Persona details with the non-deleted registros, newest first. Detail
/// lookups tolerate soft-deleted personas so history stays inspectable.
#[utoipa::path(
    get,
    path = "/api/personas/{id}",
    params(("id" = i64, Path, description = "Persona id")),
    tag = "personas",
    responses(
        (status = 200, description = "Persona with registros", body = PersonaDetailResponse),
        (status = 404, description = "Unknown persona"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<PersonaId>,
) -> Result<Json<PersonaDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let persona = Personas::new(&mut conn).get_by_id_any(id).await?.ok_or_else(persona_not_found)?;
    let registros = Registros::new(&mut conn).list_for_persona(id).await?;

    let registros: Vec<RegistroResponse> = registros.into_iter().map(RegistroResponse::from).collect();
    let total_registros = registros.len() as i64;

    Ok(Json(PersonaDetailResponse {
        persona: PersonaResponse::from(persona),
        registros_delictuales: registros,
        total_registros,
    }))
}

/// Update a persona. Providing new files replaces the entire photo set;
/// omitting them leaves the photos untouched.
#[utoipa::path(
    put,
    path = "/api/personas/{id}",
    params(("id" = i64, Path, description = "Persona id")),
    request_body(content_type = "multipart/form-data"),
    tag = "personas",
    responses(
        (status = 200, description = "Updated", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Unknown or deleted persona"),
        (status = 409, description = "Duplicate DNI among active rows"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PersonaId>,
    mut multipart: Multipart,
) -> Result<Json<OkResponse>, Error> {
    let (input, fotos) = read_persona_form(&mut multipart, &state).await?;
    let input = input.sanitized();
    let mut payload = serde_json::to_value(&input).unwrap_or_default();
    validate(&schemas::PERSONA, &payload)?;

    let photos = if fotos.is_empty() { None } else { Some(PhotoSet::from_stored(fotos)) };
    if let Some(photos) = &photos {
        payload["foto_principal"] = json!(photos.principal);
        payload["fotos_adicionales"] = json!(photos.adicionales);
    }

    let dni = input.dni.clone().expect("validated");

    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut repo = Personas::new(&mut conn);

        let existing = repo.get_by_id(id).await?.ok_or_else(persona_not_found)?;
        if existing.dni != dni && repo.find_active_by_dni(&dni, Some(id)).await?.is_some() {
            return Err(Error::conflict("Ya existe una persona con este DNI"));
        }

        let request = PersonaUpdateDBRequest {
            nombre: input.nombre.clone().expect("validated"),
            apellido: input.apellido.clone().expect("validated"),
            dni,
            fecha_nacimiento: input.fecha_nacimiento_parsed(),
            nacionalidad: input.nacionalidad.clone(),
            direccion: input.direccion.clone(),
            telefono: input.telefono.clone(),
            email: input.email.clone(),
            observaciones: input.observaciones.clone(),
            comisaria: input.comisaria.clone(),
            photos,
            updated_by: Some(user.id),
        };

        if !repo.update(id, &request).await? {
            return Err(persona_not_found());
        }
    }

    audit_logs::record(&state.db, Some(user.id), "update", "persona", id, payload).await;

    Ok(Json(OkResponse::new()))
}

/// Soft-delete a persona. The row stays retrievable by id for history but
/// leaves every listing, and its DNI becomes reusable.
#[utoipa::path(
    delete,
    path = "/api/personas/{id}",
    params(("id" = i64, Path, description = "Persona id")),
    tag = "personas",
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 404, description = "Unknown or already deleted persona"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PersonaId>,
) -> Result<Json<OkResponse>, Error> {
    let deleted = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Personas::new(&mut conn).delete(id, Some(user.id)).await?
    };
    if !deleted {
        return Err(persona_not_found());
    }

    audit_logs::record(&state.db, Some(user.id), "delete", "persona", id, json!({})).await;

    Ok(Json(OkResponse::new()))
}

/// Aggregate statistics over active personas.
#[utoipa::path(
    get,
    path = "/api/personas/stats",
    tag = "personas",
    responses(
        (status = 200, description = "Statistics", body = StatisticsResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn stats(State(state): State<AppState>, _user: CurrentUser) -> Result<Json<StatisticsResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let stats = Personas::new(&mut conn).statistics().await?;

    Ok(Json(StatisticsResponse {
        total_personas: stats.total,
        personas_por_comisaria: stats
            .por_comisaria
            .into_iter()
            .map(|(comisaria, count)| ComisariaCount { comisaria, count })
            .collect(),
        registros_ultimos_30_dias: stats.ultimos_30_dias,
    }))
}
