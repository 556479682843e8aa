use serde::Deserialize;

/// Seven days, the lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "taskfocus".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "taskfocus-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        };
        Ok(Self { database_url, jwt })
    }
}

/// Settings for the API client side.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("TASKFOCUS_API_URL").unwrap_or_default())
    }

    /// Joins `path` onto the API base with exactly one slash between them.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }
}
