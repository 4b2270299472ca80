//! # Tenant Credential Repository
//!
//! Durable storage for per-seller OAuth credentials. Every call hits the
//! database directly; webhook volume is low and token freshness matters more
//! than read latency, so there is no caching layer.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, EntityTrait, Set};

use crate::error::RepositoryError;
use crate::models::tenant::{
    ActiveModel as TenantActiveModel, Column, Entity as Tenant, Model as TenantCredential,
};

/// Read/write contract for the credential store. The orchestrator and the
/// OAuth exchange depend on this trait so tests can substitute an in-memory
/// double without a database.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a credential or overwrite the token pair of an existing tenant.
    /// The `is_active` flag is never touched here; only an administrator
    /// flips it. Idempotent.
    async fn upsert(
        &self,
        tenant_id: i64,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), RepositoryError>;

    /// Look up a tenant credential. Absence is a normal outcome (unknown
    /// tenant), not an error.
    async fn get(&self, tenant_id: i64) -> Result<Option<TenantCredential>, RepositoryError>;
}

/// SeaORM-backed credential store
pub struct TenantRepository {
    db: Arc<DatabaseConnection>,
}

impl TenantRepository {
    /// Create a new TenantRepository on the given connection pool
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for TenantRepository {
    async fn upsert(
        &self,
        tenant_id: i64,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), RepositoryError> {
        let row = TenantActiveModel {
            tenant_id: Set(tenant_id),
            access_token: Set(access_token.to_owned()),
            refresh_token: Set(refresh_token.to_owned()),
            // Left to the column default on insert, untouched on conflict.
            is_active: NotSet,
        };

        Tenant::insert(row)
            .on_conflict(
                OnConflict::column(Column::TenantId)
                    .update_columns([Column::AccessToken, Column::RefreshToken])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    async fn get(&self, tenant_id: i64) -> Result<Option<TenantCredential>, RepositoryError> {
        Tenant::find_by_id(tenant_id)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, IntoActiveModel};

    async fn setup_test_db() -> Arc<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("failed to connect to test database");
        Migrator::up(&db, None)
            .await
            .expect("failed to apply migrations");
        Arc::new(db)
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_tenant() {
        let repo = TenantRepository::new(setup_test_db().await);

        let found = repo.get(42).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = TenantRepository::new(setup_test_db().await);

        repo.upsert(1, "access-1", "refresh-1").await.unwrap();

        let found = repo.get(1).await.unwrap().expect("credential stored");
        assert_eq!(found.tenant_id, 1);
        assert_eq!(found.access_token, "access-1");
        assert_eq!(found.refresh_token, "refresh-1");
        assert!(found.is_active, "new tenants default to active");
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let repo = TenantRepository::new(setup_test_db().await);

        repo.upsert(7, "access", "refresh").await.unwrap();
        let first = repo.get(7).await.unwrap().unwrap();

        repo.upsert(7, "access", "refresh").await.unwrap();
        let second = repo.get(7).await.unwrap().unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn upsert_overwrites_tokens_for_existing_tenant() {
        let repo = TenantRepository::new(setup_test_db().await);

        repo.upsert(9, "old-access", "old-refresh").await.unwrap();
        repo.upsert(9, "new-access", "new-refresh").await.unwrap();

        let found = repo.get(9).await.unwrap().unwrap();
        assert_eq!(found.access_token, "new-access");
        assert_eq!(found.refresh_token, "new-refresh");
    }

    #[tokio::test]
    async fn upsert_does_not_reset_is_active() {
        let db = setup_test_db().await;
        let repo = TenantRepository::new(db.clone());

        repo.upsert(5, "access", "refresh").await.unwrap();

        // Administrator deactivates the tenant out of band.
        let credential = repo.get(5).await.unwrap().unwrap();
        let mut active = credential.into_active_model();
        active.is_active = Set(false);
        active.update(db.as_ref()).await.unwrap();

        // A later token refresh through the exchange must not re-activate.
        repo.upsert(5, "rotated-access", "rotated-refresh")
            .await
            .unwrap();

        let found = repo.get(5).await.unwrap().unwrap();
        assert_eq!(found.access_token, "rotated-access");
        assert!(!found.is_active);
    }
}
