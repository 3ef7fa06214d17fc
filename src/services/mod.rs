pub mod leads_service;
pub mod session_service;
pub mod webhook_service;

pub use session_service::{Session, SessionVerifier};
pub use webhook_service::WebhookVerifier;
