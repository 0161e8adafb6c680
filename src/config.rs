use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Session cookie settings. The http-only and secure flags stay configurable
/// because deployments have historically disagreed on them.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub legacy_names: Vec<String>,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub frontend_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "freelink".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "freelink-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let cookie = CookieConfig {
            name: std::env::var("AUTH_COOKIE_NAME").unwrap_or_else(|_| "auth_token".into()),
            legacy_names: list_var("AUTH_COOKIE_LEGACY_NAMES").unwrap_or_else(|| vec!["token".into()]),
            http_only: bool_var("AUTH_COOKIE_HTTP_ONLY").unwrap_or(false),
            secure: bool_var("AUTH_COOKIE_SECURE").unwrap_or(false),
        };
        let frontend_origins = list_var("FRONTEND_ORIGINS").unwrap_or_default();
        Ok(Self {
            database_url,
            jwt,
            cookie,
            frontend_origins,
        })
    }
}

fn list_var(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    Some(parse_list(&raw))
}

fn bool_var(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| parse_bool(&v))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
