//! Access/refresh token creation and verification.
//!
//! Both tokens carry the same identity payload but are signed with distinct
//! secrets, so leaking one key never compromises the other. The wire shape
//! of the claims (`id`, `usuario`, `rol`, `nombre`, `apellido`,
//! `token_version`, `iat`, `exp`) is a compatibility contract and must not
//! change.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    api::models::{auth::TokenPair, users::{CurrentUser, Role}},
    config::Config,
    errors::Error,
    types::UserId,
};

/// Token claims: an identity snapshot plus the token-version stamp used for
/// server-side revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub usuario: String,
    pub rol: Role,
    pub nombre: String,
    pub apellido: String,
    pub token_version: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(user: &CurrentUser, expiry: Duration) -> Result<Self, Error> {
        let now = Utc::now();
        let expiry = chrono::Duration::from_std(expiry).map_err(|e| Error::Internal {
            operation: format!("convert token expiry: {e}"),
        })?;

        Ok(Self {
            id: user.id,
            usuario: user.usuario.clone(),
            rol: user.rol,
            nombre: user.nombre.clone(),
            apellido: user.apellido.clone(),
            token_version: user.token_version,
            iat: now.timestamp(),
            exp: (now + expiry).timestamp(),
        })
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            usuario: claims.usuario,
            rol: claims.rol,
            nombre: claims.nombre,
            apellido: claims.apellido,
            token_version: claims.token_version,
        }
    }
}

fn sign(user: &CurrentUser, secret: &str, expiry: Duration) -> Result<String, Error> {
    let claims = Claims::new(user, expiry)?;
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("sign token: {e}"),
    })
}

/// Issue a fresh access/refresh pair from one identity snapshot.
pub fn sign_token_pair(user: &CurrentUser, config: &Config) -> Result<TokenPair, Error> {
    Ok(TokenPair {
        access_token: sign(user, &config.auth.access_secret, config.auth.access_expiry)?,
        refresh_token: sign(user, &config.auth.refresh_secret, config.auth.refresh_expiry)?,
    })
}

fn verify(token: &str, secret: &str) -> Result<Claims, Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Token-shaped failures all collapse into InvalidToken: the caller
        // gets no distinction between bad signature, malformed structure
        // and expiry.
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::InvalidToken,

        // Key/crypto misconfiguration is a server problem, not the client's
        _ => Error::Internal {
            operation: format!("verify token: {e}"),
        },
    })?;

    Ok(token_data.claims)
}

/// Verify an access token and return the identity it carries. Deliberately
/// does not consult the database: a revoked user stays valid for up to the
/// access-token lifetime (the refresh path re-checks).
pub fn verify_access(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    verify(token, &config.auth.access_secret).map(CurrentUser::from)
}

/// Verify a refresh token and return the raw claims, including the embedded
/// token version the refresh protocol compares against the stored value.
pub fn verify_refresh(token: &str, config: &Config) -> Result<Claims, Error> {
    verify(token, &config.auth.refresh_secret)
}
