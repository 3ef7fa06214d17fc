// ==================== IDENTITY WEBHOOKS ====================
// The identity provider delivers account lifecycle events through Svix.
// Each delivery is signed with HMAC-SHA256 over "{id}.{timestamp}.{body}"
// using the endpoint's `whsec_` secret.

use crate::{
    database::Store,
    models::User,
    utils::AppError,
};
use actix_web::http::header::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

/// Deliveries older or newer than this are treated as replays
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

// ==================== EVENT MODELS ====================

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UserEventData {
    id: Option<String>,
    #[serde(default)]
    email_addresses: Option<Vec<EmailAddress>>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    UserUpserted(String),
    UserDeleted(String),
    Ignored(String),
}

// ==================== SIGNATURE VERIFICATION ====================

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::Config(format!("Invalid CLERK_WEBHOOK_SECRET: {}", e)))?;
        if key.is_empty() {
            return Err(AppError::Config("CLERK_WEBHOOK_SECRET is empty".to_string()));
        }
        Ok(Self { key })
    }

    /// Checks the three Svix headers against `body`; `now` is a unix timestamp
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), AppError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::SignatureVerificationFailed(format!("Missing {} header", name)))
        };

        let msg_id = header(HEADER_ID)?;
        let timestamp = header(HEADER_TIMESTAMP)?;
        let signatures = header(HEADER_SIGNATURE)?;

        let sent_at: i64 = timestamp.parse().map_err(|_| {
            AppError::SignatureVerificationFailed(format!("Invalid timestamp '{}'", timestamp))
        })?;
        if now.abs_diff(sent_at) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            return Err(AppError::SignatureVerificationFailed(format!(
                "Timestamp {} outside tolerance (now {})",
                sent_at, now
            )));
        }

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::SignatureVerificationFailed(e.to_string()))?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        // "v1,<base64> v1,<base64>" - several during secret rotation
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if !matched {
            return Err(AppError::SignatureVerificationFailed(
                "No matching signature found".to_string(),
            ));
        }

        Ok(())
    }
}

// ==================== EVENT HANDLING ====================

/// Only call on a payload that already passed `WebhookVerifier::verify`
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))
}

fn user_data(event: &WebhookEvent) -> Result<(String, Option<String>), AppError> {
    let data: UserEventData = serde_json::from_value(event.data.clone())
        .map_err(|e| AppError::Validation(format!("Invalid {} payload: {}", event.kind, e)))?;

    let id = data
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} event without user id", event.kind)))?;

    let email = data
        .email_addresses
        .and_then(|addresses| addresses.into_iter().next())
        .and_then(|address| address.email_address);

    Ok((id, email))
}

/// Mirrors the provider's account state into the `users` table
pub async fn handle_event(store: &dyn Store, event: &WebhookEvent) -> Result<WebhookOutcome, AppError> {
    match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let (clerk_id, email) = user_data(event)?;
            log::info!("👤 {} - upserting user {}", event.kind, clerk_id);
            store.upsert_user(&User { clerk_id: clerk_id.clone(), email }).await?;
            Ok(WebhookOutcome::UserUpserted(clerk_id))
        }
        "user.deleted" => {
            let (clerk_id, _) = user_data(event)?;
            log::info!("🗑️  user.deleted - removing user {}", clerk_id);
            store.delete_user(&clerk_id).await?;
            Ok(WebhookOutcome::UserDeleted(clerk_id))
        }
        other => {
            log::debug!("Ignoring webhook event type {}", other);
            Ok(WebhookOutcome::Ignored(other.to_string()))
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// base64("test-webhook-signing-key")
    pub const TEST_SECRET: &str = "whsec_dGVzdC13ZWJob29rLXNpZ25pbmcta2V5";

    pub fn sign(secret: &str, msg_id: &str, timestamp: i64, body: &[u8]) -> String {
        let key = STANDARD
            .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
            .unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
        mac.update(body);
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::database::MemoryStore;
    use actix_web::http::header::{HeaderName, HeaderValue};

    const BODY: &[u8] =
        br#"{"type":"user.created","object":"event","data":{"id":"u1","email_addresses":[{"email_address":"a@x.com"},{"email_address":"b@x.com"}]}}"#;

    fn headers(msg_id: &str, timestamp: i64, signature: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(HeaderName::from_static(HEADER_ID), HeaderValue::from_str(msg_id).unwrap());
        map.insert(
            HeaderName::from_static(HEADER_TIMESTAMP),
            HeaderValue::from_str(&timestamp.to_string()).unwrap(),
        );
        map.insert(
            HeaderName::from_static(HEADER_SIGNATURE),
            HeaderValue::from_str(signature).unwrap(),
        );
        map
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(TEST_SECRET).unwrap()
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let now = 1_700_000_000;
        let sig = sign(TEST_SECRET, "msg_1", now, BODY);
        assert!(verifier().verify(&headers("msg_1", now, &sig), BODY, now).is_ok());
    }

    #[test]
    fn test_any_matching_entry_is_accepted() {
        let now = 1_700_000_000;
        let sig = format!("v1,Zm9v {} v2,ignored", sign(TEST_SECRET, "msg_1", now, BODY));
        assert!(verifier().verify(&headers("msg_1", now, &sig), BODY, now).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let now = 1_700_000_000;
        let sig = sign(TEST_SECRET, "msg_1", now, BODY);
        let tampered = br#"{"type":"user.deleted","data":{"id":"u1"}}"#;
        let result = verifier().verify(&headers("msg_1", now, &sig), tampered, now);
        assert!(matches!(result, Err(AppError::SignatureVerificationFailed(_))));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let now = 1_700_000_000;
        let sig = sign("whsec_b3RoZXIta2V5", "msg_1", now, BODY);
        assert!(verifier().verify(&headers("msg_1", now, &sig), BODY, now).is_err());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let sent = 1_700_000_000;
        let sig = sign(TEST_SECRET, "msg_1", sent, BODY);
        let now = sent + TIMESTAMP_TOLERANCE_SECS + 1;
        assert!(verifier().verify(&headers("msg_1", sent, &sig), BODY, now).is_err());
    }

    #[test]
    fn test_extreme_timestamp_is_rejected() {
        let now = 1_700_000_000;
        for sent in [i64::MIN, i64::MAX] {
            let sig = sign(TEST_SECRET, "msg_1", sent, BODY);
            let result = verifier().verify(&headers("msg_1", sent, &sig), BODY, now);
            assert!(matches!(result, Err(AppError::SignatureVerificationFailed(_))));
        }
    }

    #[test]
    fn test_missing_headers_are_rejected() {
        let result = verifier().verify(&HeaderMap::new(), BODY, 1_700_000_000);
        assert!(matches!(result, Err(AppError::SignatureVerificationFailed(_))));
    }

    #[test]
    fn test_secret_without_prefix_is_accepted() {
        assert!(WebhookVerifier::new("dGVzdC13ZWJob29rLXNpZ25pbmcta2V5").is_ok());
        assert!(WebhookVerifier::new("whsec_%%%").is_err());
    }

    #[tokio::test]
    async fn test_created_event_uses_first_email() {
        let store = MemoryStore::new();
        let event = parse_event(BODY).unwrap();

        let outcome = handle_event(&store, &event).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::UserUpserted("u1".into()));

        let user = store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_missing_email_becomes_null() {
        let store = MemoryStore::new();
        let event = parse_event(br#"{"type":"user.updated","data":{"id":"u1","email_addresses":[]}}"#).unwrap();
        handle_event(&store, &event).await.unwrap();

        let user = store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let store = MemoryStore::new();
        let event = parse_event(BODY).unwrap();
        handle_event(&store, &event).await.unwrap();
        let once = store.find_user("u1").await.unwrap();

        handle_event(&store, &event).await.unwrap();
        assert_eq!(store.find_user("u1").await.unwrap(), once);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_of_absent_user_is_noop() {
        let store = MemoryStore::new();
        let event = parse_event(br#"{"type":"user.deleted","data":{"id":"ghost","deleted":true}}"#).unwrap();
        let outcome = handle_event(&store, &event).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::UserDeleted("ghost".into()));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let store = MemoryStore::new();
        let event = parse_event(br#"{"type":"session.created","data":{"id":"sess_1"}}"#).unwrap();
        let outcome = handle_event(&store, &event).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored("session.created".into()));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_event_without_id_is_rejected() {
        let store = MemoryStore::new();
        let event = parse_event(br#"{"type":"user.created","data":{}}"#).unwrap();
        let result = handle_event(&store, &event).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
