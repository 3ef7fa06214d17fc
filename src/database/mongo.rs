use super::Store;
use crate::{
    models::{Lead, NewLead, User},
    utils::AppError,
};
use async_trait::async_trait;
use chrono::{DateTime as ChronoDateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const USERS: &str = "users";
const LEADS: &str = "leads";

/// Document stored in the `leads` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeadDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    name: String,
    email: Option<String>,
    company: Option<String>,
    created_at: DateTime,
}

impl From<LeadDocument> for Lead {
    fn from(d: LeadDocument) -> Self {
        let created_at = ChronoDateTime::<Utc>::from_timestamp_millis(d.created_at.timestamp_millis())
            .unwrap_or_default();
        Lead {
            id: d.id,
            user_id: d.user_id,
            name: d.name,
            email: d.email,
            company: d.company,
            created_at,
        }
    }
}

fn db_error(e: mongodb::error::Error) -> AppError {
    AppError::Storage(format!("Database error: {}", e))
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn new(uri: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri)
            .await
            .map_err(db_error)?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options).map_err(db_error)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':') && !s.contains('@'))
            .unwrap_or("leads");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await.map_err(db_error)?;

        log::info!("✅ MongoDB connected (database: {})", db_name);

        let store = Self { db };
        store.ensure_indexes().await;

        Ok(store)
    }

    /// Unique identity key for users, owner + recency for leads
    async fn ensure_indexes(&self) {
        log::info!("🔧 Creating database indexes...");

        let users_index = IndexModel::builder()
            .keys(doc! { "clerk_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match self.users().create_index(users_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(clerk_id) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let leads_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        match self.leads().create_index(leads_index).await {
            Ok(_) => log::info!("   ✅ Index created: leads(user_id, created_at)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn leads(&self) -> Collection<LeadDocument> {
        self.db.collection(LEADS)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }).await.map_err(db_error)?;
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users()
            .update_one(
                doc! { "clerk_id": &user.clerk_id },
                doc! { "$set": { "clerk_id": &user.clerk_id, "email": user.email.clone() } },
            )
            .upsert(true)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<(), AppError> {
        let result = self
            .users()
            .delete_one(doc! { "clerk_id": clerk_id })
            .await
            .map_err(db_error)?;
        log::debug!("Deleted {} user document(s) for {}", result.deleted_count, clerk_id);
        Ok(())
    }

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "clerk_id": clerk_id })
            .await
            .map_err(db_error)
    }

    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, AppError> {
        let cursor = self
            .leads()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?;

        let documents: Vec<LeadDocument> = cursor.try_collect().await.map_err(db_error)?;
        Ok(documents.into_iter().map(Lead::from).collect())
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        let document = LeadDocument {
            id: Uuid::new_v4().to_string(),
            user_id: lead.user_id,
            name: lead.name,
            email: lead.email,
            company: lead.company,
            created_at: DateTime::now(),
        };

        self.leads().insert_one(&document).await.map_err(db_error)?;

        Ok(Lead::from(document))
    }

    async fn delete_lead(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .leads()
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await
            .map_err(db_error)?;
        Ok(result.deleted_count > 0)
    }
}
