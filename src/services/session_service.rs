// Session tokens are short-lived JWTs minted by the identity provider.
// They arrive either as a bearer token or in the `__session` cookie.

use crate::utils::AppError;
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

pub const SESSION_COOKIE: &str = "__session";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,           // user id
    pub exp: usize,
    #[serde(default)]
    pub nbf: Option<usize>,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub azp: Option<String>,   // authorized party (origin that requested the token)
    #[serde(default)]
    pub sid: Option<String>,   // provider-side session id
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

pub struct SessionVerifier {
    key: DecodingKey,
    algorithm: Algorithm,
    authorized_parties: Vec<String>,
}

impl SessionVerifier {
    pub fn new(key: DecodingKey, algorithm: Algorithm, authorized_parties: Vec<String>) -> Self {
        Self { key, algorithm, authorized_parties }
    }

    /// Networkless verification against the provider's PEM public key
    pub fn from_rsa_pem(pem: &str, authorized_parties: Vec<String>) -> Result<Self, AppError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid CLERK_JWT_KEY: {}", e)))?;
        Ok(Self::new(key, Algorithm::RS256, authorized_parties))
    }

    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 5;

        let claims = decode::<SessionClaims>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Session token rejected: {}", e);
                AppError::AuthenticationRequired
            })?;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .map(|azp| self.authorized_parties.iter().any(|p| p == azp))
                .unwrap_or(false);
            if !allowed {
                log::debug!("Session token rejected: unauthorized party {:?}", claims.azp);
                return Err(AppError::AuthenticationRequired);
            }
        }

        if claims.sub.is_empty() {
            return Err(AppError::AuthenticationRequired);
        }

        Ok(Session { user_id: claims.sub })
    }

    /// Any failure along the way counts as "no session"
    pub fn resolve(&self, req: &HttpRequest) -> Option<Session> {
        extract_token(req).and_then(|token| self.verify(&token).ok())
    }
}

/// Bearer header wins over the session cookie
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

impl FromRequest for Session {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Session>()
                .cloned()
                .ok_or(AppError::AuthenticationRequired),
        )
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "test-session-secret";

    pub fn verifier() -> SessionVerifier {
        SessionVerifier::new(DecodingKey::from_secret(TEST_SECRET.as_bytes()), Algorithm::HS256, vec![])
    }

    pub fn token_with(claims: &SessionClaims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes())).unwrap()
    }

    pub fn token_for(user_id: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        token_with(&SessionClaims {
            sub: user_id.to_string(),
            exp: now + 60,
            nbf: Some(now - 10),
            iat: Some(now - 10),
            azp: Some("http://localhost:3000".to_string()),
            sid: Some("sess_test".to_string()),
        })
    }
}
