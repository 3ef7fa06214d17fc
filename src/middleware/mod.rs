pub mod auth;
pub mod security_headers;

pub use auth::SessionGate;
pub use security_headers::SecurityHeaders;
