use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use crate::{
    database::Store,
    middleware::auth::with_redirect_url,
    services::Session,
};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

/// Sign-in and sign-up pages hosted by the identity provider
#[derive(Debug, Clone)]
pub struct HostedPages {
    pub sign_in_url: String,
    pub sign_up_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Where to land once the provider hands the user back
fn dashboard_url(req: &HttpRequest) -> String {
    let conn = req.connection_info();
    format!("{}://{}/dashboard", conn.scheme(), conn.host())
}

/// GET / - landing page, signed-in users go straight to the dashboard
pub async fn index(session: Option<Session>) -> HttpResponse {
    if session.is_some() {
        return redirect("/dashboard");
    }
    html(INDEX_HTML.to_string())
}

/// GET /dashboard - leads UI; data is loaded by the page script from /leads
pub async fn dashboard(session: Session, store: web::Data<dyn Store>) -> HttpResponse {
    log::info!("🖥️  GET /dashboard - user {}", session.user_id);

    let email = match store.find_user(&session.user_id).await {
        Ok(user) => user.and_then(|u| u.email),
        Err(e) => {
            log::warn!("⚠️  Could not load user {}: {}", session.user_id, e);
            None
        }
    };

    let greeting = match email {
        Some(email) => format!("Welcome, {}", escape_html(&email)),
        None => "Welcome".to_string(),
    };

    html(DASHBOARD_HTML.replace("{{greeting}}", &greeting))
}

/// GET /sign-in
pub async fn sign_in(
    req: HttpRequest,
    pages: web::Data<HostedPages>,
    query: web::Query<RedirectQuery>,
) -> HttpResponse {
    let return_to = query.redirect_url.clone().unwrap_or_else(|| dashboard_url(&req));
    redirect(&with_redirect_url(&pages.sign_in_url, &return_to))
}

/// GET /sign-up
pub async fn sign_up(
    req: HttpRequest,
    pages: web::Data<HostedPages>,
    query: web::Query<RedirectQuery>,
) -> HttpResponse {
    let return_to = query.redirect_url.clone().unwrap_or_else(|| dashboard_url(&req));
    redirect(&with_redirect_url(&pages.sign_up_url, &return_to))
}
