use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prospective customer owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Lead {
    #[serde(deserialize_with = "deserialize_lead_id")]
    pub id: String,
    /// External identity id of the owner
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row ids are generated by the backing store: UUID strings or bigint serials
fn deserialize_lead_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("Expected string or numeric lead id")),
    }
}

/// Body of `POST /leads`. Any client-supplied `user_id` is dropped on parse.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
}

/// Validated row ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLead {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LeadResponse {
    pub lead: Lead,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadQuery {
    /// Case-insensitive substring matched against name, email and company
    pub q: Option<String>,
}
