use super::Store;
use crate::{
    models::{Lead, NewLead, User},
    utils::AppError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Process-local backend for development and tests
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    leads: RwLock<Vec<Lead>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Storage("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.users.read().map_err(poisoned)?;
        self.leads.read().map_err(poisoned)?;
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.insert(user.clerk_id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.remove(clerk_id);
        Ok(())
    }

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(clerk_id).cloned())
    }

    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, AppError> {
        let leads = self.leads.read().map_err(poisoned)?;
        let mut owned: Vec<Lead> = leads.iter().filter(|l| l.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        let row = Lead {
            id: Uuid::new_v4().to_string(),
            user_id: lead.user_id,
            name: lead.name,
            email: lead.email,
            company: lead.company,
            created_at: Utc::now(),
        };
        self.leads.write().map_err(poisoned)?.push(row.clone());
        Ok(row)
    }

    async fn delete_lead(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut leads = self.leads.write().map_err(poisoned)?;
        let before = leads.len();
        leads.retain(|l| !(l.id == id && l.user_id == user_id));
        Ok(leads.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_lead(user_id: &str, name: &str) -> NewLead {
        NewLead {
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: None,
            company: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_user() {
        let store = MemoryStore::new();
        let mut user = User { clerk_id: "u1".into(), email: Some("a@x.com".into()) };
        store.upsert_user(&user).await.unwrap();
        user.email = Some("b@x.com".into());
        store.upsert_user(&user).await.unwrap();

        assert_eq!(store.user_count(), 1);
        assert_eq!(store.find_user("u1").await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_ping_succeeds() {
        assert!(MemoryStore::new().ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_noop() {
        let store = MemoryStore::new();
        assert!(store.delete_user("nobody").await.is_ok());
    }

    #[tokio::test]
    async fn test_leads_are_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let first = store.insert_lead(new_lead("u1", "First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.insert_lead(new_lead("u1", "Second")).await.unwrap();
        store.insert_lead(new_lead("u2", "Other")).await.unwrap();

        let leads = store.list_leads("u1").await.unwrap();
        assert_eq!(leads, vec![second, first]);
    }

    #[tokio::test]
    async fn test_delete_lead_requires_owner() {
        let store = MemoryStore::new();
        let lead = store.insert_lead(new_lead("u1", "Jane")).await.unwrap();

        assert!(!store.delete_lead("u2", &lead.id).await.unwrap());
        assert_eq!(store.list_leads("u1").await.unwrap().len(), 1);

        assert!(store.delete_lead("u1", &lead.id).await.unwrap());
        assert!(store.list_leads("u1").await.unwrap().is_empty());
    }
}
