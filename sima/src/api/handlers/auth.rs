//! Authentication handlers: login, token refresh, logout.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        OkResponse,
        auth::{LoginRequest, RefreshRequest, TokenPair},
        users::CurrentUser,
    },
    auth::{password, tokens},
    db::handlers::{Repository, Users},
    errors::Error,
    validation::{schemas, validate},
};

/// Login with username and password.
///
/// The failure message is identical whether the username is unknown or the
/// password is wrong, so usernames cannot be enumerated.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenPair>, Error> {
    validate(&schemas::LOGIN, &serde_json::to_value(&request).unwrap_or_default())?;
    let usuario = request.usuario.as_deref().expect("validated");
    let password_input = request.password.clone().expect("validated");

    let user = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut conn).find_by_usuario(usuario).await?
    };

    // Inactive users fail exactly like unknown ones
    let user = user.filter(|u| u.activo).ok_or_else(Error::invalid_credentials)?;

    // Verify on a blocking thread: Argon2 is deliberately slow
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&password_input, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?;

    if !is_valid {
        return Err(Error::invalid_credentials());
    }

    let pair = tokens::sign_token_pair(&CurrentUser::from(&user), &state.config)?;
    Ok(Json(pair))
}

/// Mint a new token pair from a refresh token.
///
/// This is the only place the stored token version is consulted: a token
/// issued before a password change or revocation carries a stale version
/// and is rejected even though its signature is valid and unexpired.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    tag = "auth",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Invalid, expired or revoked token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<Json<TokenPair>, Error> {
    let token = request
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::BadRequest {
            message: "Falta refreshToken".to_string(),
        })?;

    let claims = tokens::verify_refresh(token, &state.config)?;

    let user = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut conn).get_by_id(claims.id).await?
    };

    let user = user.filter(|u| u.activo).ok_or(Error::InvalidToken)?;

    if claims.token_version != user.token_version {
        return Err(Error::InvalidToken);
    }

    // The new pair is stamped with the *current* stored version
    let pair = tokens::sign_token_pair(&CurrentUser::from(&user), &state.config)?;
    Ok(Json(pair))
}

/// Logout. Tokens are stateless, so the client simply discards them;
/// revocation of every session goes through the token-version bump.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out", body = OkResponse))
)]
#[tracing::instrument(skip_all)]
pub async fn logout() -> Json<OkResponse> {
    Json(OkResponse::new())
}
