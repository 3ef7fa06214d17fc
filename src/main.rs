mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::pages::HostedPages;
use crate::config::AppConfig;
use crate::services::{SessionVerifier, WebhookVerifier};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;

    log::info!("🚀 Starting Leads Service...");

    let store = database::connect(&config).await.map_err(startup_error)?;
    let store_data: web::Data<dyn database::Store> = web::Data::from(store);

    let session_verifier = Arc::new(
        SessionVerifier::from_rsa_pem(&config.jwt_public_key, config.authorized_parties.clone())
            .map_err(startup_error)?,
    );
    let webhook_verifier = web::Data::new(
        WebhookVerifier::new(&config.webhook_secret).map_err(startup_error)?,
    );
    let hosted_pages = web::Data::new(HostedPages {
        sign_in_url: config.sign_in_url.clone(),
        sign_up_url: config.sign_up_url.clone(),
    });

    let host = config.host.clone();
    let port = config.port;

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = config
            .cors_allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(store_data.clone())
            .app_data(webhook_verifier.clone())
            .app_data(hosted_pages.clone())
            .wrap(middleware::SessionGate::new(session_verifier.clone(), &config.sign_in_url))
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

fn startup_error(e: utils::AppError) -> std::io::Error {
    log::error!("❌ {}", e);
    std::io::Error::other(e.to_string())
}
