//! Base repository trait for database operations.

use crate::db::errors::Result;
use crate::db::handlers::Listing;
use crate::types::UserId;

/// Base repository trait providing the common persistence operations.
///
/// A repository is the data access layer for one table. Create and update
/// requests are validated by the caller before they get here; the actor id
/// rides inside the request structs as `created_by`/`updated_by`.
///
/// For soft-deleting entities (personas, registros), `get_by_id`, `update`
/// and `list` are scoped to rows whose deletion timestamp is null, and
/// `delete` stamps that timestamp. Users have no soft delete: their
/// `delete` is hard.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest: Send + Sync;

    /// The request type for updating entities
    type UpdateRequest: Send + Sync;

    /// The record type returned by reads
    type Response;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity and return its generated id
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<i64>;

    /// Get an entity by id, or `None` when absent (callers decide whether
    /// that is an error)
    async fn get_by_id(&mut self, id: i64) -> Result<Option<Self::Response>>;

    /// Update an entity by id; `false` means no matching row was affected
    async fn update(&mut self, id: i64, request: &Self::UpdateRequest) -> Result<bool>;

    /// Delete an entity by id; `false` means no matching row was affected.
    /// Soft-deleting implementations record `actor` as the last updater.
    async fn delete(&mut self, id: i64, actor: Option<UserId>) -> Result<bool>;

    /// List entities with equality filters and clamped pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Listing<Self::Response>>;
}
