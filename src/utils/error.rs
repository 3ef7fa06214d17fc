use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    AuthenticationRequired,
    Validation(String),
    SignatureVerificationFailed(String),
    NotFound(String),
    Storage(String),
    Config(String),
}

impl AppError {
    /// Message placed in the `{ "error": ... }` response body
    pub fn public_message(&self) -> String {
        match self {
            AppError::AuthenticationRequired => "Unauthorized".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::SignatureVerificationFailed(_) => "Invalid signature".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Storage(msg) => msg.clone(),
            AppError::Config(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::AuthenticationRequired => write!(f, "Authentication required"),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::SignatureVerificationFailed(msg) => {
                write!(f, "Signature verification failed: {}", msg)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::SignatureVerificationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("❌ {}", self);
        } else {
            log::warn!("⚠️  {}", self);
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.public_message()
        }))
    }
}
