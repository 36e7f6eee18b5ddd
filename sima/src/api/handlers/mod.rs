//! HTTP request handlers.
//!
//! - [`auth`]: login, token refresh, logout
//! - [`usuarios`]: user management, profile, password and token revocation
//! - [`personas`]: registered-person CRUD, search, export, statistics
//! - [`registros`]: criminal-record CRUD, search, export, duplication
//! - [`audit`]: audit-trail queries (admin only)
//! - [`system`]: health check and request metrics

pub mod audit;
pub mod auth;
pub mod personas;
pub mod registros;
pub mod system;
pub mod usuarios;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::Error;
use crate::export::{self, ExportFormat, Sheet};

/// Render a sheet as a file download in the requested format.
pub(crate) fn export_response(format: ExportFormat, sheet: &Sheet, base: &str) -> Result<Response, Error> {
    let bytes = match format {
        ExportFormat::Csv => export::to_csv(sheet),
        ExportFormat::Xlsx => export::to_xlsx(sheet)?,
    };

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.filename(base)),
        ),
    ];

    Ok((headers, bytes).into_response())
}
