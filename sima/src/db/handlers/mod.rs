//! Repository implementations for CRUD operations.
//!
//! - [`users`]: usuarios table (hard delete, token-version bookkeeping)
//! - [`personas`]: personas_registradas (soft delete, DNI checks, search)
//! - [`registros`]: registros_delictuales (soft delete, search, duplicate)
//! - [`audit_logs`]: append-only audit trail with best-effort writes

pub mod audit_logs;
pub mod personas;
pub mod registros;
pub mod repository;
pub mod users;

pub use audit_logs::AuditLogs;
pub use personas::Personas;
pub use registros::Registros;
pub use repository::Repository;
pub use users::Users;

use crate::sanitize;

/// A page of rows plus the filtered-but-unpaginated total. The API layer
/// maps this into its own `Page` response type.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Listing<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Build a lowercase contains-pattern for a `LOWER(col) LIKE ? ESCAPE '\'`
/// predicate, with SQL wildcards in the term escaped.
pub(crate) fn like_contains(term: &str) -> String {
    format!("%{}%", sanitize::like_pattern(term).to_lowercase())
}
