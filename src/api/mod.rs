pub mod health;
pub mod leads;
pub mod pages;
pub mod swagger;
pub mod webhook;

use actix_web::web;
use crate::utils::AppError;

/// Malformed JSON bodies get the same `{ "error": ... }` 400 as validation failures
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::Validation(format!("Invalid JSON body: {}", err)).into())
}

/// Registers every route; callers supply app data and wrap the `SessionGate`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Pages
        .route("/", web::get().to(pages::index))
        .route("/dashboard", web::get().to(pages::dashboard))
        .route("/sign-in", web::get().to(pages::sign_in))
        .route("/sign-up", web::get().to(pages::sign_up))
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Identity provider webhooks (public, signature-verified)
        .route("/webhook", web::post().to(webhook::receive_webhook))
        // Leads (session required)
        .service(
            web::resource("/leads")
                .route(web::get().to(leads::list_leads))
                .route(web::post().to(leads::create_lead)),
        )
        .route("/leads/{id}", web::delete().to(leads::delete_lead));
}
