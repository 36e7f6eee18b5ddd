//! Authentication and authorization.
//!
//! The system is stateless-token based: every protected request carries a
//! bearer access token whose claims are the full identity snapshot. Server-
//! side revocation works through a per-user `token_version` counter that is
//! embedded in every issued token and compared against the stored value on
//! refresh (not on every access check, which bounds revocation propagation
//! to the access-token lifetime).
//!
//! # Modules
//!
//! - [`password`]: Password hashing and verification using Argon2
//! - [`tokens`]: Access/refresh token signing and verification
//! - [`current_user`]: Extractors attaching the authenticated identity to
//!   handlers ([`crate::api::models::users::CurrentUser`] and the admin
//!   gate [`current_user::AdminUser`])

pub mod current_user;
pub mod password;
pub mod tokens;
