use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// One violated field constraint, surfaced inside validation error responses.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Input shape or constraint violation, with per-field detail
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldViolation>,
    },

    /// Credential check failed. For login the message is identical whether
    /// the user is unknown or the password is wrong, so usernames cannot be
    /// enumerated.
    #[error("{message}")]
    InvalidCredentials { message: String },

    /// Bearer token failed verification (bad signature, malformed, expired,
    /// or stale token_version on refresh)
    #[error("Token inválido")]
    InvalidToken,

    /// Authentication required but not provided
    #[error("No autorizado")]
    Unauthenticated,

    /// Authenticated but lacking the required role
    #[error("Requiere rol admin")]
    Forbidden,

    /// Requested resource not found
    #[error("{message}")]
    NotFound { message: String },

    /// Business-rule conflict (duplicate DNI, duplicate username)
    #[error("{message}")]
    Conflict { message: String },

    /// Invalid request data outside schema validation
    #[error("{message}")]
    BadRequest { message: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldViolation>>,
    /// Internal detail, only present in debug builds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict { message: message.into() }
    }

    /// The anti-enumeration login failure.
    pub fn invalid_credentials() -> Self {
        Error::InvalidCredentials {
            message: "Credenciales inválidas".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::NotNullViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::InvalidCredentials { .. } | Error::InvalidToken | Error::Unauthenticated => "AUTHENTICATION_ERROR",
            Error::Forbidden => "AUTHORIZATION_ERROR",
            Error::NotFound { .. } => "NOT_FOUND_ERROR",
            Error::Conflict { .. } => "CONFLICT_ERROR",
            Error::BadRequest { .. } => "VALIDATION_ERROR",
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "NOT_FOUND_ERROR",
                DbError::UniqueViolation { .. } => "CONFLICT_ERROR",
                DbError::ForeignKeyViolation { .. } => "REFERENCE_ERROR",
                DbError::NotNullViolation { .. } => "REQUIRED_FIELD_ERROR",
                DbError::CheckViolation { .. } => "VALIDATION_ERROR",
                DbError::Other(_) => "DATABASE_ERROR",
            },
            Error::Internal { .. } | Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-safe error message, without leaking internal
    /// implementation details. Messages are Spanish because they are shown
    /// verbatim in the UI.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            Error::InvalidCredentials { message } => message.clone(),
            Error::InvalidToken => "Token inválido".to_string(),
            Error::Unauthenticated => "No autorizado".to_string(),
            Error::Forbidden => "Requiere rol admin".to_string(),
            Error::NotFound { message } => message.clone(),
            Error::Conflict { message } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Recurso no encontrado".to_string(),
                DbError::UniqueViolation { message } => {
                    // SQLite reports "UNIQUE constraint failed: <table>.<column>"
                    if message.contains("personas_registradas.dni") || message.contains("idx_personas_dni_activa") {
                        "Ya existe una persona con este DNI".to_string()
                    } else if message.contains("usuarios.usuario") {
                        "El nombre de usuario ya existe".to_string()
                    } else {
                        "El recurso ya existe".to_string()
                    }
                }
                DbError::ForeignKeyViolation { .. } => "Referencia inválida a un recurso relacionado".to_string(),
                DbError::NotNullViolation { .. } => "Falta un campo obligatorio".to_string(),
                DbError::CheckViolation { .. } => "Datos inválidos".to_string(),
                DbError::Other(_) => "Error de base de datos".to_string(),
            },
            Error::Internal { .. } | Error::Other(_) => "Error interno del servidor".to_string(),
        }
    }

    fn body(&self) -> ErrorBody {
        let fields = match self {
            Error::Validation { fields, .. } if !fields.is_empty() => Some(fields.clone()),
            _ => None,
        };
        // Internal detail only ships in debug builds
        let detail = if cfg!(debug_assertions) {
            Some(format!("{self:#}"))
        } else {
            None
        };
        ErrorBody {
            message: self.user_message(),
            code: self.code().to_string(),
            fields,
            detail,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging, at a level matching severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::InvalidCredentials { .. } | Error::InvalidToken | Error::Unauthenticated | Error::Forbidden => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
            Error::Validation { .. } | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
