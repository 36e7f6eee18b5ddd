//! User management handlers. Everything here except the `me/*` routes is
//! admin-only; the admin gate is the [`AdminUser`] extractor.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        OkResponse,
        auth::{AdminChangePasswordRequest, ChangeOwnPasswordRequest},
        pagination::Page,
        users::{CreatedUserResponse, CurrentUser, ListUsersQuery, Role, UserInput, UserResponse},
    },
    auth::{current_user::AdminUser, password},
    config::Argon2Config,
    db::handlers::{Repository, Users, users::UserFilter},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    errors::Error,
    types::UserId,
    validation::{schemas, validate},
};

/// Default page size for user listings.
const USERS_PAGE_SIZE: i64 = 50;

async fn hash_on_blocking_thread(password: String, params: Argon2Config) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

fn user_not_found() -> Error {
    Error::not_found("Usuario no encontrado")
}

/// List users (admin only). Sensitive fields never appear in the response.
#[utoipa::path(
    get,
    path = "/api/usuarios",
    params(ListUsersQuery),
    tag = "usuarios",
    responses(
        (status = 200, description = "Paginated users", body = Page<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Page<UserResponse>>, Error> {
    let filter = UserFilter {
        page: query.pagination.page(),
        page_size: query.pagination.page_size_or(USERS_PAGE_SIZE),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let listing = Users::new(&mut conn).list(&filter).await?;

    Ok(Json(Page::new(
        listing.items.into_iter().map(UserResponse::from).collect(),
        listing.total,
        listing.page,
        listing.page_size,
    )))
}

/// Create a user (admin only). The generated temporary password is returned
/// exactly once and must be delivered out of band.
#[utoipa::path(
    post,
    path = "/api/usuarios",
    request_body = UserInput,
    tag = "usuarios",
    responses(
        (status = 201, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Username already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<UserInput>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), Error> {
    let input = request.sanitized();
    validate(&schemas::USUARIO, &serde_json::to_value(&input).unwrap_or_default())?;

    let rol = input
        .rol
        .as_deref()
        .and_then(Role::from_wire)
        .expect("validated against the rol constraint");

    let temp_password = password::generate_temp_password(state.config.auth.temp_password_length);
    let password_hash = hash_on_blocking_thread(temp_password.clone(), state.config.auth.argon2).await?;

    let create_request = UserCreateDBRequest {
        usuario: input.usuario.clone().expect("validated"),
        nombre: input.nombre.clone().expect("validated"),
        apellido: input.apellido.clone().expect("validated"),
        rol,
        activo: input.activo.unwrap_or(true),
        password_hash,
        token_version: 0,
        created_by: Some(admin.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    // Early rejection; the UNIQUE constraint still decides under races
    if repo.find_by_usuario(&create_request.usuario).await?.is_some() {
        return Err(Error::conflict("El nombre de usuario ya existe"));
    }

    let id = repo.create(&create_request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            id,
            temp_password,
            message: "Usuario creado exitosamente. La contraseña temporal debe ser cambiada en el primer login."
                .to_string(),
        }),
    ))
}

/// Get one user (admin only).
#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    params(("id" = i64, Path, description = "User id")),
    tag = "usuarios",
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Unknown user"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn get(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or_else(user_not_found)?;
    Ok(Json(UserResponse::from(user)))
}

/// Update a user (admin only). Full replacement of the profile fields.
#[utoipa::path(
    put,
    path = "/api/usuarios/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserInput,
    tag = "usuarios",
    responses(
        (status = 200, description = "Updated", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Username already taken"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
    Json(request): Json<UserInput>,
) -> Result<Json<OkResponse>, Error> {
    let input = request.sanitized();
    validate(&schemas::USUARIO, &serde_json::to_value(&input).unwrap_or_default())?;

    let update_request = UserUpdateDBRequest {
        usuario: input.usuario.clone().expect("validated"),
        nombre: input.nombre.clone().expect("validated"),
        apellido: input.apellido.clone().expect("validated"),
        rol: input.rol.as_deref().and_then(Role::from_wire).expect("validated"),
        activo: input.activo.unwrap_or(true),
        updated_by: Some(admin.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Users::new(&mut conn).update(id, &update_request).await?;
    if !updated {
        return Err(user_not_found());
    }

    Ok(Json(OkResponse::new()))
}

/// Delete a user (admin only, hard delete, self-deletion blocked).
#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    params(("id" = i64, Path, description = "User id")),
    tag = "usuarios",
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 400, description = "Attempted self-deletion"),
        (status = 404, description = "Unknown user"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn remove(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<OkResponse>, Error> {
    if id == admin.id {
        return Err(Error::BadRequest {
            message: "No puedes eliminar tu propia cuenta".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Users::new(&mut conn).delete(id, Some(admin.id)).await?;
    if !deleted {
        return Err(user_not_found());
    }

    Ok(Json(OkResponse::new()))
}

/// Revoke every outstanding token for a user (admin only) by bumping the
/// token-version counter. No password change required.
#[utoipa::path(
    post,
    path = "/api/usuarios/{id}/revoke-tokens",
    params(("id" = i64, Path, description = "User id")),
    tag = "usuarios",
    responses(
        (status = 200, description = "Tokens revoked", body = OkResponse),
        (status = 404, description = "Unknown user"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn revoke_tokens(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<OkResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let revoked = Users::new(&mut conn).increment_token_version(id).await?;
    if !revoked {
        return Err(user_not_found());
    }

    Ok(Json(OkResponse::new()))
}

/// Change one's own password. Requires the current password; on success the
/// token version is bumped, forcing re-login on every other session.
#[utoipa::path(
    put,
    path = "/api/usuarios/me/password",
    request_body = ChangeOwnPasswordRequest,
    tag = "usuarios",
    responses(
        (status = 200, description = "Password changed", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Current password is wrong"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_own_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChangeOwnPasswordRequest>,
) -> Result<Json<OkResponse>, Error> {
    validate(&schemas::OWN_PASSWORD, &serde_json::to_value(&request).unwrap_or_default())?;
    let actual = request.actual.clone().expect("validated");
    let nueva = request.nueva.clone().expect("validated");

    let stored = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut conn).get_by_id(user.id).await?.ok_or_else(user_not_found)?
    };

    let hash = stored.password_hash.clone();
    let current_ok = tokio::task::spawn_blocking(move || password::verify_password(&actual, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?;
    if !current_ok {
        return Err(Error::InvalidCredentials {
            message: "Contraseña actual incorrecta".to_string(),
        });
    }

    let new_hash = hash_on_blocking_thread(nueva, state.config.auth.argon2).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).update_password(user.id, &new_hash, Some(user.id)).await?;

    Ok(Json(OkResponse::new()))
}

/// Force-change another user's password (admin only). No current-password
/// check; the admin is recorded as the actor and the target's sessions are
/// revoked via the version bump.
#[utoipa::path(
    put,
    path = "/api/usuarios/{id}/password",
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminChangePasswordRequest,
    tag = "usuarios",
    responses(
        (status = 200, description = "Password changed", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Unknown user"),
    )
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn admin_change_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
    Json(request): Json<AdminChangePasswordRequest>,
) -> Result<Json<OkResponse>, Error> {
    validate(&schemas::ADMIN_PASSWORD, &serde_json::to_value(&request).unwrap_or_default())?;
    let nueva = request.nueva.clone().expect("validated");

    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut conn).get_by_id(id).await?.ok_or_else(user_not_found)?;
    }

    let new_hash = hash_on_blocking_thread(nueva, state.config.auth.argon2).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).update_password(id, &new_hash, Some(admin.id)).await?;

    Ok(Json(OkResponse::new()))
}

/// Current user's profile.
#[utoipa::path(
    get,
    path = "/api/usuarios/me/profile",
    tag = "usuarios",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let stored = Users::new(&mut conn).get_by_id(user.id).await?.ok_or_else(user_not_found)?;
    Ok(Json(UserResponse::from(stored)))
}

/// Update the current user's profile. Role and activo are taken from the
/// stored row, never from the request, so nobody promotes themselves.
#[utoipa::path(
    put,
    path = "/api/usuarios/me/profile",
    request_body = UserInput,
    tag = "usuarios",
    responses(
        (status = 200, description = "Updated", body = OkResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Username already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<UserInput>,
) -> Result<Json<OkResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let stored = repo.get_by_id(user.id).await?.ok_or_else(user_not_found)?;

    let mut input = request.sanitized();
    input.rol = Some(if stored.rol.is_admin() { "admin" } else { "usuario" }.to_string());
    input.activo = Some(stored.activo);
    validate(&schemas::USUARIO, &serde_json::to_value(&input).unwrap_or_default())?;

    let update_request = UserUpdateDBRequest {
        usuario: input.usuario.clone().expect("validated"),
        nombre: input.nombre.clone().expect("validated"),
        apellido: input.apellido.clone().expect("validated"),
        rol: stored.rol,
        activo: stored.activo,
        updated_by: Some(user.id),
    };

    let updated = repo.update(user.id, &update_request).await?;
    if !updated {
        return Err(user_not_found());
    }

    Ok(Json(OkResponse::new()))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn user_routes_require_the_admin_role() {
        let ctx = TestContext::new().await;
        ctx.seed_user("raso", Role::Usuario, true).await;
        let pair = ctx.login("raso", "admin123").await;

        let response = ctx.request("GET", "/api/usuarios", Some(&pair.access_token), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["message"], "Requiere rol admin");
    }

    #[tokio::test]
    async fn create_returns_a_temp_password_once() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;

        let response = ctx
            .request(
                "POST",
                "/api/usuarios",
                Some(&admin.access_token),
                Some(json!({"usuario": "nuevo", "nombre": "Nuevo", "apellido": "Agente", "rol": "usuario"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let temp_password = response.body["tempPassword"].as_str().unwrap().to_string();
        assert_eq!(temp_password.len(), 12);

        // The temporary password actually works for login
        let pair = ctx.login("nuevo", &temp_password).await;
        let user = crate::auth::tokens::verify_access(&pair.access_token, &ctx.state.config).unwrap();
        assert_eq!(user.usuario, "nuevo");
        assert_eq!(user.token_version, 0);
    }

    #[tokio::test]
    async fn duplicate_username_is_409() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;

        let body = json!({"usuario": "duplicado", "nombre": "Uno", "apellido": "Dos", "rol": "usuario"});
        let first = ctx.request("POST", "/api/usuarios", Some(&admin.access_token), Some(body.clone())).await;
        assert_eq!(first.status, StatusCode::CREATED);

        let second = ctx.request("POST", "/api/usuarios", Some(&admin.access_token), Some(body)).await;
        assert_eq!(second.status, StatusCode::CONFLICT);
        assert_eq!(second.body["message"], "El nombre de usuario ya existe");
    }

    #[tokio::test]
    async fn listed_users_never_expose_sensitive_fields() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;

        let response = ctx.request("GET", "/api/usuarios", Some(&admin.access_token), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let items = response.body["items"].as_array().unwrap();
        assert!(!items.is_empty());
        for item in items {
            assert!(item.get("password_hash").is_none());
            assert!(item.get("token_version").is_none());
        }
    }

    #[tokio::test]
    async fn admin_update_replaces_the_profile_fields() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;
        let id = ctx.seed_user("mutable", Role::Usuario, true).await;

        let response = ctx
            .request(
                "PUT",
                &format!("/api/usuarios/{id}"),
                Some(&admin.access_token),
                Some(json!({"usuario": "mutable", "nombre": "Renombrado", "apellido": "Apellido", "rol": "admin", "activo": false})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let fetched = ctx.request("GET", &format!("/api/usuarios/{id}"), Some(&admin.access_token), None).await;
        assert_eq!(fetched.body["nombre"], "Renombrado");
        assert_eq!(fetched.body["rol"], "admin");
        assert_eq!(fetched.body["activo"], false);

        let missing = ctx
            .request(
                "PUT",
                "/api/usuarios/99999",
                Some(&admin.access_token),
                Some(json!({"usuario": "otro", "nombre": "Otro", "apellido": "Otro", "rol": "usuario"})),
            )
            .await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn self_deletion_is_blocked() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;
        let admin_user = crate::auth::tokens::verify_access(&admin.access_token, &ctx.state.config).unwrap();

        let response = ctx
            .request("DELETE", &format!("/api/usuarios/{}", admin_user.id), Some(&admin.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["message"], "No puedes eliminar tu propia cuenta");
    }

    #[tokio::test]
    async fn deleting_another_user_works_and_is_hard() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;
        let id = ctx.seed_user("borrable", Role::Usuario, true).await;

        let response = ctx
            .request("DELETE", &format!("/api/usuarios/{id}"), Some(&admin.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = ctx
            .request("GET", &format!("/api/usuarios/{id}"), Some(&admin.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn own_password_change_requires_the_current_password() {
        let ctx = TestContext::new().await;
        ctx.seed_user("cauteloso", Role::Usuario, true).await;
        let pair = ctx.login("cauteloso", "admin123").await;

        let response = ctx
            .request(
                "PUT",
                "/api/usuarios/me/password",
                Some(&pair.access_token),
                Some(json!({"actual": "equivocada", "nueva": "nuevaclave123"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["message"], "Contraseña actual incorrecta");
    }

    #[tokio::test]
    async fn own_password_change_increments_token_version_by_exactly_one() {
        let ctx = TestContext::new().await;
        let id = ctx.seed_user("rotante", Role::Usuario, true).await;
        let pair = ctx.login("rotante", "admin123").await;

        let response = ctx
            .request(
                "PUT",
                "/api/usuarios/me/password",
                Some(&pair.access_token),
                Some(json!({"actual": "admin123", "nueva": "nuevaclave123"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        // Old refresh token is now stale
        let response = ctx
            .request("POST", "/api/auth/refresh", None, Some(json!({"refreshToken": pair.refresh_token})))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        // New login works with the new password and sees version 1
        let pair = ctx.login("rotante", "nuevaclave123").await;
        let user = crate::auth::tokens::verify_access(&pair.access_token, &ctx.state.config).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.token_version, 1);
    }

    #[tokio::test]
    async fn revoke_tokens_invalidates_refresh_without_password_change() {
        let ctx = TestContext::new().await;
        let admin = ctx.login("admin", "admin123").await;
        let id = ctx.seed_user("espiado", Role::Usuario, true).await;
        let pair = ctx.login("espiado", "admin123").await;

        let response = ctx
            .request("POST", &format!("/api/usuarios/{id}/revoke-tokens"), Some(&admin.access_token), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = ctx
            .request("POST", "/api/auth/refresh", None, Some(json!({"refreshToken": pair.refresh_token})))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        // The password itself still works
        ctx.login("espiado", "admin123").await;
    }

    #[tokio::test]
    async fn profile_update_cannot_escalate_the_role() {
        let ctx = TestContext::new().await;
        ctx.seed_user("ambicioso", Role::Usuario, true).await;
        let pair = ctx.login("ambicioso", "admin123").await;

        let response = ctx
            .request(
                "PUT",
                "/api/usuarios/me/profile",
                Some(&pair.access_token),
                Some(json!({"usuario": "ambicioso", "nombre": "Muy", "apellido": "Ambicioso", "rol": "admin"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        // Profile changed but the role did not
        let profile = ctx.request("GET", "/api/usuarios/me/profile", Some(&pair.access_token), None).await;
        assert_eq!(profile.body["nombre"], "Muy");
        assert_eq!(profile.body["rol"], "usuario");
    }
}
