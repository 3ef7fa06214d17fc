// Managed relational database reached through its PostgREST interface
// (Supabase-compatible): one HTTP resource per table, filters as query params.

use super::Store;
use crate::{
    models::{Lead, NewLead, User},
    utils::AppError,
};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// PostgREST surfaces this Postgres code when a filter value cannot be
/// cast to the column type, e.g. `id=eq.abc` on a bigint key
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Failed storage round trip, keeping the service's error code
#[derive(Debug)]
struct RestFailure {
    code: Option<String>,
    message: String,
}

impl RestFailure {
    fn transport(e: reqwest::Error) -> Self {
        Self {
            code: None,
            message: format!("Storage request failed: {}", e),
        }
    }

    /// Parses the service's `{code, message, details}` body, falling back to the raw text
    fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        match serde_json::from_str::<PostgrestError>(body) {
            Ok(PostgrestError { code, message: Some(message), details }) => Self {
                code,
                message: match details {
                    Some(details) if !details.is_empty() => format!("{} ({})", message, details),
                    _ => message,
                },
            },
            _ if !body.trim().is_empty() => Self {
                code: None,
                message: format!("Storage service returned {}: {}", status, body.trim()),
            },
            _ => Self {
                code: None,
                message: format!("Storage service returned {}", status),
            },
        }
    }

    fn is_invalid_id(&self) -> bool {
        self.code.as_deref() == Some(INVALID_TEXT_REPRESENTATION)
    }
}

impl From<RestFailure> for AppError {
    fn from(failure: RestFailure) -> Self {
        AppError::Storage(failure.message)
    }
}

pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    pub fn new(url: &str, service_key: &str) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(service_key)
            .map_err(|e| AppError::Config(format!("Invalid SUPABASE_SERVICE_ROLE_KEY: {}", e)))?;
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|e| AppError::Config(format!("Invalid SUPABASE_SERVICE_ROLE_KEY: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(header::AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build storage client: {}", e)))?;

        log::info!("🗄️  Storage service: {}", url);

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    // ==================== REQUESTS ====================
    // Owner filters are applied here and nowhere else.

    fn upsert_user_request(&self, user: &User) -> RequestBuilder {
        self.client
            .post(self.table("users"))
            .query(&[("on_conflict", "clerk_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[user])
    }

    fn delete_user_request(&self, clerk_id: &str) -> RequestBuilder {
        self.client
            .delete(self.table("users"))
            .query(&[("clerk_id", eq(clerk_id))])
            .header("Prefer", "return=minimal")
    }

    fn find_user_request(&self, clerk_id: &str) -> RequestBuilder {
        self.client
            .get(self.table("users"))
            .query(&[("select", "clerk_id,email".to_string()), ("clerk_id", eq(clerk_id))])
    }

    fn list_leads_request(&self, user_id: &str) -> RequestBuilder {
        self.client.get(self.table("leads")).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ])
    }

    fn insert_lead_request(&self, lead: &NewLead) -> RequestBuilder {
        self.client
            .post(self.table("leads"))
            .header("Prefer", "return=representation")
            .json(&[lead])
    }

    fn delete_lead_request(&self, user_id: &str, id: &str) -> RequestBuilder {
        self.client
            .delete(self.table("leads"))
            .query(&[("id", eq(id)), ("user_id", eq(user_id))])
            .header("Prefer", "return=representation")
    }

    fn ping_request(&self) -> RequestBuilder {
        self.client
            .get(self.table("users"))
            .query(&[("select", "clerk_id"), ("limit", "1")])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RestFailure> {
        let response = request.send().await.map_err(RestFailure::transport)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RestFailure::from_response(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        decode(self.send(request).await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::Storage(format!("Invalid storage response: {}", e)))
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl Store for RestStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.send(self.ping_request()).await?;
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.send(self.upsert_user_request(user)).await?;
        Ok(())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<(), AppError> {
        self.send(self.delete_user_request(clerk_id)).await?;
        Ok(())
    }

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self.send_json(self.find_user_request(clerk_id)).await?;
        Ok(users.into_iter().next())
    }

    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, AppError> {
        self.send_json(self.list_leads_request(user_id)).await
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        let rows: Vec<Lead> = self.send_json(self.insert_lead_request(&lead)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Storage("Insert returned no rows".to_string()))
    }

    async fn delete_lead(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let removed: Vec<Lead> = match self.send(self.delete_lead_request(user_id, id)).await {
            Ok(response) => decode(response).await?,
            // An id the key column cannot hold matches no row
            Err(failure) if failure.is_invalid_id() => return Ok(false),
            Err(failure) => return Err(failure.into()),
        };
        Ok(!removed.is_empty())
    }
}
