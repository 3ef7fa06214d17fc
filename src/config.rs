use crate::utils::AppError;
use dotenv::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Rest,
    MongoDB,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Ok(StorageBackend::Rest),
            "mongodb" | "mongo" => Ok(StorageBackend::MongoDB),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::Config(format!("Unknown STORAGE_BACKEND '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub database_url: Option<String>,
    pub webhook_secret: String,
    pub jwt_public_key: String,
    pub authorized_parties: Vec<String>,
    pub sign_in_url: String,
    pub sign_up_url: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let required = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", name)))
        };
        let optional = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let host = optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = optional("PORT")
            .unwrap_or_else(|| "3002".to_string())
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("Invalid PORT: {}", e)))?;

        let storage_backend: StorageBackend = optional("STORAGE_BACKEND")
            .unwrap_or_else(|| "rest".to_string())
            .parse()?;

        let (supabase_url, supabase_service_key, database_url) = match storage_backend {
            StorageBackend::Rest => (
                Some(required("SUPABASE_URL")?),
                Some(required("SUPABASE_SERVICE_ROLE_KEY")?),
                None,
            ),
            StorageBackend::MongoDB => (None, None, Some(required("DATABASE_URL")?)),
            StorageBackend::Memory => (None, None, None),
        };

        let config = Self {
            host,
            port,
            storage_backend,
            supabase_url,
            supabase_service_key,
            database_url,
            webhook_secret: required("CLERK_WEBHOOK_SECRET")?,
            // PEM keys in .env files usually carry literal "\n" sequences
            jwt_public_key: required("CLERK_JWT_KEY")?.replace("\\n", "\n"),
            authorized_parties: split_list(optional("CLERK_AUTHORIZED_PARTIES").as_deref()),
            sign_in_url: required("CLERK_SIGN_IN_URL")?,
            sign_up_url: required("CLERK_SIGN_UP_URL")?,
            cors_allowed_origins: split_list(Some(
                optional("CORS_ALLOWED_ORIGINS")
                    .as_deref()
                    .unwrap_or("http://localhost:3000"),
            )),
        };

        log::info!("⚙️  Configuration loaded (storage backend: {:?})", config.storage_backend);

        Ok(config)
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
