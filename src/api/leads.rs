use actix_web::{web, HttpResponse};
use crate::{
    database::Store,
    models::{CreateLeadRequest, LeadListResponse, LeadQuery, LeadResponse},
    services::{leads_service, Session},
    utils::AppError,
};

#[utoipa::path(
    get,
    path = "/leads",
    tag = "Leads",
    params(LeadQuery),
    responses(
        (status = 200, description = "Caller's leads, newest first", body = LeadListResponse),
        (status = 401, description = "No valid session"),
        (status = 500, description = "Storage failure")
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn list_leads(
    session: Session,
    store: web::Data<dyn Store>,
    query: web::Query<LeadQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /leads - user {}", session.user_id);

    let leads = leads_service::list_leads(store.get_ref(), &session, query.q.as_deref()).await?;

    log::info!("✅ Listed {} leads", leads.len());
    Ok(HttpResponse::Ok().json(LeadListResponse { leads }))
}

#[utoipa::path(
    post,
    path = "/leads",
    tag = "Leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 200, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Name is required"),
        (status = 401, description = "No valid session"),
        (status = 500, description = "Storage failure")
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn create_lead(
    session: Session,
    store: web::Data<dyn Store>,
    request: web::Json<CreateLeadRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /leads - user {}", session.user_id);

    let lead = leads_service::create_lead(store.get_ref(), &session, request.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LeadResponse { lead }))
}

#[utoipa::path(
    delete,
    path = "/leads/{id}",
    tag = "Leads",
    params(
        ("id" = String, Path, description = "Lead id")
    ),
    responses(
        (status = 200, description = "Lead deleted"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "No such lead owned by the caller"),
        (status = 500, description = "Storage failure")
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn delete_lead(
    session: Session,
    store: web::Data<dyn Store>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /leads/{} - user {}", id, session.user_id);

    leads_service::delete_lead(store.get_ref(), &session, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
