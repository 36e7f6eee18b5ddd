//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response data structures (the public contract)
//!
//! Every protected route authenticates via the bearer extractors in
//! [`crate::auth::current_user`]; handlers then validate input, enforce
//! entity invariants through the repositories and emit best-effort audit
//! entries for mutations.

pub mod handlers;
pub mod models;
