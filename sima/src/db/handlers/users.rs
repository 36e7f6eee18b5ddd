//! Database repository for usuarios.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::{Listing, Repository},
    models::users::{UserCreateDBRequest, UserRow, UserUpdateDBRequest},
};
use crate::types::UserId;

/// Filter for listing users.
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub page: i64,
    pub page_size: i64,
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Look up a user by username, regardless of the activo flag. Used for
    /// login (which filters on activo itself) and duplicate checks.
    #[instrument(skip(self), err)]
    pub async fn find_by_usuario(&mut self, usuario: &str) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM usuarios WHERE usuario = ?")
            .bind(usuario)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(total)
    }

    /// Store a new password hash and bump the token version, invalidating
    /// every outstanding refresh token for this user.
    #[instrument(skip(self, password_hash), err)]
    pub async fn update_password(&mut self, id: UserId, password_hash: &str, actor: Option<UserId>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE usuarios
             SET password_hash = ?, token_version = token_version + 1, updated_by = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(password_hash)
        .bind(actor)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump the token version without touching the password (explicit
    /// revocation of all outstanding tokens).
    #[instrument(skip(self), err)]
    pub async fn increment_token_version(&mut self, id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE usuarios SET token_version = token_version + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserRow;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(usuario = %request.usuario), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO usuarios
                 (usuario, password_hash, nombre, apellido, rol, activo, token_version,
                  created_by, updated_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.usuario)
        .bind(&request.password_hash)
        .bind(&request.nombre)
        .bind(&request.apellido)
        .bind(request.rol)
        .bind(request.activo)
        .bind(request.token_version)
        .bind(request.created_by)
        .bind(request.created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: i64) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: i64, request: &Self::UpdateRequest) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE usuarios
             SET usuario = ?, nombre = ?, apellido = ?, rol = ?, activo = ?, updated_by = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&request.usuario)
        .bind(&request.nombre)
        .bind(&request.apellido)
        .bind(request.rol)
        .bind(request.activo)
        .bind(request.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users are hard-deleted; self-deletion is blocked at the handler layer
    /// and audit back-references go null via ON DELETE SET NULL.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: i64, _actor: Option<UserId>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter), fields(page = filter.page, page_size = filter.page_size), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Listing<Self::Response>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&mut *self.db)
            .await?;

        let items = sqlx::query_as::<_, UserRow>("SELECT * FROM usuarios ORDER BY id DESC LIMIT ? OFFSET ?")
            .bind(filter.page_size)
            .bind((filter.page - 1) * filter.page_size)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(Listing {
            items,
            total,
            page: filter.page,
            page_size: filter.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::errors::DbError;
    use crate::test_utils::{create_request, test_pool};

    #[tokio::test]
    async fn create_and_fetch_roundtrip() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let id = repo.create(&create_request("agente1", Role::Usuario)).await.unwrap();
        let user = repo.get_by_id(id).await.unwrap().expect("user should exist");

        assert_eq!(user.usuario, "agente1");
        assert_eq!(user.rol, Role::Usuario);
        assert!(user.activo);
        assert_eq!(user.token_version, 0);
    }

    #[tokio::test]
    async fn duplicate_username_hits_the_unique_constraint() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("repetido", Role::Usuario)).await.unwrap();
        let err = repo.create(&create_request("repetido", Role::Usuario)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn update_password_increments_token_version() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let id = repo.create(&create_request("cambio", Role::Usuario)).await.unwrap();
        assert_eq!(repo.get_by_id(id).await.unwrap().unwrap().token_version, 0);

        assert!(repo.update_password(id, "new-hash", Some(id)).await.unwrap());
        let user = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.token_version, 1);
        assert_eq!(user.password_hash, "new-hash");

        // A second change bumps it again, regardless of prior value
        assert!(repo.update_password(id, "other-hash", Some(id)).await.unwrap());
        assert_eq!(repo.get_by_id(id).await.unwrap().unwrap().token_version, 2);
    }

    #[tokio::test]
    async fn increment_token_version_revokes_without_password_change() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let id = repo.create(&create_request("revocado", Role::Usuario)).await.unwrap();
        let hash_before = repo.get_by_id(id).await.unwrap().unwrap().password_hash;

        assert!(repo.increment_token_version(id).await.unwrap());
        let user = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.token_version, 1);
        assert_eq!(user.password_hash, hash_before);
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let id = repo.create(&create_request("efimero", Role::Usuario)).await.unwrap();
        assert!(repo.delete(id, None).await.unwrap());
        assert!(repo.get_by_id(id).await.unwrap().is_none());
        // Second delete affects nothing
        assert!(!repo.delete(id, None).await.unwrap());
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        for i in 0..5 {
            repo.create(&create_request(&format!("user{i}"), Role::Usuario)).await.unwrap();
        }

        let listing = repo.list(&UserFilter { page: 1, page_size: 2 }).await.unwrap();
        assert_eq!(listing.total, 5);
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[0].usuario, "user4");

        let listing = repo.list(&UserFilter { page: 3, page_size: 2 }).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].usuario, "user0");
    }
}
