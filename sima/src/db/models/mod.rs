//! Database record structures matching the table schemas, plus the
//! create/update request types consumed by the repositories. Audit actor
//! ids (`created_by`/`updated_by`) travel inside the request structs.

pub mod audit_logs;
pub mod personas;
pub mod registros;
pub mod users;
