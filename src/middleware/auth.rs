use crate::{services::session_service::SessionVerifier, utils::AppError};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub enum RoutePattern {
    Exact(&'static str),
    /// Matches the prefix followed by anything, like `/sign-in(.*)`
    Prefix(&'static str),
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Exact(p) => path == *p,
            RoutePattern::Prefix(p) => path.starts_with(p),
        }
    }
}

/// Reachable without a session
pub const PUBLIC_ROUTES: &[RoutePattern] = &[
    RoutePattern::Exact("/"),
    RoutePattern::Prefix("/sign-in"),
    RoutePattern::Prefix("/sign-up"),
    RoutePattern::Exact("/webhook"),
    RoutePattern::Exact("/health"),
    RoutePattern::Prefix("/swagger-ui"),
    RoutePattern::Prefix("/api-docs"),
];

/// Protected JSON endpoints answer 401 instead of redirecting
const API_ROUTES: &[RoutePattern] = &[RoutePattern::Exact("/leads"), RoutePattern::Prefix("/leads/")];

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|p| p.matches(path))
}

pub fn is_api_route(path: &str) -> bool {
    API_ROUTES.iter().any(|p| p.matches(path))
}

/// Appends the `redirect_url` the identity provider returns to afterwards
pub fn with_redirect_url(base: &str, return_to: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}redirect_url={}",
        base,
        separator,
        urlencoding::encode(return_to)
    )
}

/// Resolves the caller's session on every request and keeps anonymous
/// callers off protected routes.
pub struct SessionGate {
    verifier: Arc<SessionVerifier>,
    sign_in_url: Arc<str>,
}

impl SessionGate {
    pub fn new(verifier: Arc<SessionVerifier>, sign_in_url: &str) -> Self {
        Self {
            verifier,
            sign_in_url: Arc::from(sign_in_url),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGateService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateService {
            service,
            verifier: self.verifier.clone(),
            sign_in_url: self.sign_in_url.clone(),
        }))
    }
}

pub struct SessionGateService<S> {
    service: S,
    verifier: Arc<SessionVerifier>,
    sign_in_url: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = self.verifier.resolve(req.request());
        let authenticated = session.is_some();

        if let Some(session) = session {
            req.extensions_mut().insert(session);
        }

        let path = req.path().to_string();

        if !authenticated && !is_public_route(&path) {
            let response = if is_api_route(&path) {
                log::debug!("🔒 {} {} - no session, 401", req.method(), path);
                AppError::AuthenticationRequired.error_response()
            } else {
                let return_to = {
                    let conn = req.connection_info();
                    format!("{}://{}{}", conn.scheme(), conn.host(), req.uri())
                };
                log::debug!("🔒 {} {} - no session, redirecting to sign-in", req.method(), path);
                HttpResponse::Found()
                    .insert_header((header::LOCATION, with_redirect_url(&self.sign_in_url, &return_to)))
                    .finish()
            };

            let res = req.into_response(response).map_into_right_body();
            return Box::pin(async move { Ok(res) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
