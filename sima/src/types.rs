//! Shared identifier types.
//!
//! All entities use SQLite rowid-backed integer keys. The aliases keep
//! signatures readable and make it obvious which entity an id refers to.

/// Identifier for a row in `usuarios`.
pub type UserId = i64;

/// Identifier for a row in `personas_registradas`.
pub type PersonaId = i64;

/// Identifier for a row in `registros_delictuales`.
pub type RegistroId = i64;

/// Identifier for a row in `audit_logs`.
pub type AuditLogId = i64;
