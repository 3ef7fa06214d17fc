use serde::{Deserialize, Serialize};

/// Application-side mirror of an identity-provider account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub clerk_id: String,  // external identity id, unique
    pub email: Option<String>,
}
