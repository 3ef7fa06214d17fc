use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leads Service API",
        version = "1.0.0",
        description = "Per-user sales leads tracker.\n\n**Authentication:** lead endpoints require an identity-provider session, sent as a Bearer token or the `__session` cookie.\n\n**Webhooks:** `/webhook` accepts signed account lifecycle events and mirrors them into the users table."
    ),
    paths(
        crate::api::leads::list_leads,
        crate::api::leads::create_lead,
        crate::api::leads::delete_lead,
        crate::api::webhook::receive_webhook,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::Lead,
            crate::models::CreateLeadRequest,
            crate::models::LeadListResponse,
            crate::models::LeadResponse,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Leads", description = "CRUD over the caller's own leads."),
        (name = "Webhooks", description = "Identity provider account lifecycle events."),
        (name = "Health", description = "Service health check."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token issued by the identity provider"))
                        .build()
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("__session"))),
            );
        }
    }
}
