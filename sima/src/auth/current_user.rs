//! Extractors attaching the authenticated identity to request handlers.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::tokens,
    errors::Error,
};

fn bearer_token(parts: &Parts) -> Result<&str, Error> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(Error::Unauthenticated)?;
    let value = header.to_str().map_err(|_| Error::Unauthenticated)?;
    value.strip_prefix("Bearer ").ok_or(Error::Unauthenticated)
}

/// Bearer-token gate: a missing Authorization header is 401 "No autorizado";
/// a present-but-invalid token is 401 "Token inválido". Verification is
/// purely cryptographic - no database round-trip per request.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        tokens::verify_access(token, &state.config)
    }
}

/// Role gate layered on top of [`CurrentUser`]: non-admin identities are
/// rejected with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
