// ==================== LEADS ====================
// Every operation is scoped to the session's user id. Client-supplied
// ownership is never read.

use crate::{
    database::Store,
    models::{CreateLeadRequest, Lead, NewLead},
    services::session_service::Session,
    utils::AppError,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds the insert row, rejecting a missing or blank name
pub fn validate(user_id: &str, request: CreateLeadRequest) -> Result<NewLead, AppError> {
    let name = non_blank(request.name)
        .ok_or_else(|| AppError::Validation("Name is required".to_string()))?;

    Ok(NewLead {
        user_id: user_id.to_string(),
        name,
        email: non_blank(request.email),
        company: non_blank(request.company),
    })
}

/// Case-insensitive substring match on name, email and company.
/// An empty query keeps everything.
pub fn filter_leads(leads: Vec<Lead>, query: &str) -> Vec<Lead> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return leads;
    }

    let matches = |field: Option<&str>| {
        field
            .map(|v| v.to_lowercase().contains(&needle))
            .unwrap_or(false)
    };

    leads
        .into_iter()
        .filter(|lead| {
            matches(Some(lead.name.as_str())) || matches(lead.email.as_deref()) || matches(lead.company.as_deref())
        })
        .collect()
}

pub async fn list_leads(store: &dyn Store, session: &Session, query: Option<&str>) -> Result<Vec<Lead>, AppError> {
    let leads = store.list_leads(&session.user_id).await?;
    Ok(match query {
        Some(q) => filter_leads(leads, q),
        None => leads,
    })
}

pub async fn create_lead(store: &dyn Store, session: &Session, request: CreateLeadRequest) -> Result<Lead, AppError> {
    let new_lead = validate(&session.user_id, request)?;
    let lead = store.insert_lead(new_lead).await?;
    log::info!("✅ Lead {} created for user {}", lead.id, session.user_id);
    Ok(lead)
}

/// Absent and foreign rows look the same to the caller
pub async fn delete_lead(store: &dyn Store, session: &Session, id: &str) -> Result<(), AppError> {
    if store.delete_lead(&session.user_id, id).await? {
        log::info!("🗑️  Lead {} deleted by user {}", id, session.user_id);
        Ok(())
    } else {
        Err(AppError::NotFound("Lead not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::Utc;

    fn session(user_id: &str) -> Session {
        Session { user_id: user_id.to_string() }
    }

    fn request(name: Option<&str>, email: Option<&str>, company: Option<&str>) -> CreateLeadRequest {
        CreateLeadRequest {
            name: name.map(String::from),
            email: email.map(String::from),
            company: company.map(String::from),
        }
    }

    fn lead(name: &str, email: Option<&str>, company: Option<&str>) -> Lead {
        Lead {
            id: name.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            email: email.map(String::from),
            company: company.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_requires_name() {
        assert!(matches!(validate("u1", request(None, None, None)), Err(AppError::Validation(_))));
        assert!(matches!(validate("u1", request(Some("   "), None, None)), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_normalizes_blank_optionals() {
        let lead = validate("u1", request(Some(" Jane "), Some(""), Some("Acme"))).unwrap();
        assert_eq!(
            lead,
            NewLead {
                user_id: "u1".into(),
                name: "Jane".into(),
                email: None,
                company: Some("Acme".into()),
            }
        );
    }

    #[test]
    fn test_filter_matches_any_field_case_insensitively() {
        let leads = vec![
            lead("Jane Doe", Some("jane@acme.io"), Some("Acme")),
            lead("Bob", None, Some("Globex")),
            lead("Carol", Some("carol@initech.com"), None),
        ];

        let names = |found: Vec<Lead>| found.into_iter().map(|l| l.name).collect::<Vec<_>>();

        assert_eq!(names(filter_leads(leads.clone(), "ACME")), vec!["Jane Doe"]);
        assert_eq!(names(filter_leads(leads.clone(), "glob")), vec!["Bob"]);
        assert_eq!(names(filter_leads(leads.clone(), "initech")), vec!["Carol"]);
        assert_eq!(filter_leads(leads.clone(), "  ").len(), 3);
        assert!(filter_leads(leads, "nobody").is_empty());
    }

    #[tokio::test]
    async fn test_create_with_empty_name_inserts_nothing() {
        let store = MemoryStore::new();
        let result = create_lead(&store, &session("u1"), request(Some(""), Some("a@x.com"), None)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.list_leads("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_never_returns_other_users_rows() {
        let store = MemoryStore::new();
        create_lead(&store, &session("u1"), request(Some("Mine"), None, None)).await.unwrap();
        create_lead(&store, &session("u2"), request(Some("Theirs"), None, None)).await.unwrap();

        let leads = list_leads(&store, &session("u1"), None).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert!(leads.iter().all(|l| l.user_id == "u1"));
    }

    #[tokio::test]
    async fn test_cross_user_delete_is_not_found() {
        let store = MemoryStore::new();
        let created = create_lead(&store, &session("u1"), request(Some("Jane"), None, None)).await.unwrap();

        let result = delete_lead(&store, &session("u2"), &created.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(list_leads(&store, &session("u1"), None).await.unwrap().len(), 1);
    }
}
