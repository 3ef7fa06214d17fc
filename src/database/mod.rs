pub mod memory;
pub mod mongo;
pub mod rest;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use rest::RestStore;

use crate::{
    config::{AppConfig, StorageBackend},
    models::{Lead, NewLead, User},
    utils::AppError,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Narrow persistence contract over the `users` and `leads` tables.
///
/// Every lead operation takes the owner's user id; implementations must
/// filter on it so one user can never observe or remove another's rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by the health check
    async fn ping(&self) -> Result<(), AppError>;

    /// Insert or update keyed by `clerk_id`
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Removing an absent user is not an error
    async fn delete_user(&self, clerk_id: &str) -> Result<(), AppError>;

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, AppError>;

    /// Newest first
    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, AppError>;

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError>;

    /// Returns `true` when a row owned by `user_id` was removed
    async fn delete_lead(&self, user_id: &str, id: &str) -> Result<bool, AppError>;
}

/// Builds the backend selected by `STORAGE_BACKEND`
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn Store>, AppError> {
    let missing = |name: &str| AppError::Config(format!("{} must be set", name));

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Rest => {
            let url = config.supabase_url.as_deref().ok_or_else(|| missing("SUPABASE_URL"))?;
            let key = config
                .supabase_service_key
                .as_deref()
                .ok_or_else(|| missing("SUPABASE_SERVICE_ROLE_KEY"))?;
            Arc::new(RestStore::new(url, key)?)
        }
        StorageBackend::MongoDB => {
            let uri = config.database_url.as_deref().ok_or_else(|| missing("DATABASE_URL"))?;
            Arc::new(MongoStore::new(uri).await?)
        }
        StorageBackend::Memory => {
            log::warn!("⚠️  Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(store)
}
