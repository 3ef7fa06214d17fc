use actix_web::{web, HttpRequest, HttpResponse};
use crate::{
    database::Store,
    services::webhook_service::{self, WebhookOutcome, WebhookVerifier},
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhooks",
    request_body(content = String, description = "Raw signed event payload", content_type = "application/json"),
    params(
        ("svix-id" = String, Header, description = "Delivery id"),
        ("svix-timestamp" = String, Header, description = "Unix timestamp of the delivery"),
        ("svix-signature" = String, Header, description = "Space-separated `v1,<base64>` signatures")
    ),
    responses(
        (status = 200, description = "Event applied or ignored"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn receive_webhook(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    log::info!("📨 POST /webhook - {} bytes", body.len());

    // Nothing in the payload is trusted before this passes
    verifier.verify(req.headers(), &body, chrono::Utc::now().timestamp())?;

    let event = webhook_service::parse_event(&body)?;

    match webhook_service::handle_event(store.get_ref(), &event).await? {
        WebhookOutcome::UserUpserted(id) => log::info!("✅ User {} synced", id),
        WebhookOutcome::UserDeleted(id) => log::info!("✅ User {} removed", id),
        WebhookOutcome::Ignored(kind) => log::info!("ℹ️  Event {} acknowledged", kind),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
