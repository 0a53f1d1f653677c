use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub ttl_seconds: i64,
    pub secure_cookie: bool,
}

/// Credentials for the admin account created at start-up.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub session: SessionConfig,
    pub admin: Option<AdminBootstrap>,
    pub login_attempts_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session = SessionConfig {
            secret: std::env::var("SECRET").context("SECRET is not set")?,
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "session".into()),
            ttl_seconds: env_parse("SESSION_TTL_SECONDS").unwrap_or(3600),
            secure_cookie: env_parse("SESSION_COOKIE_SECURE").unwrap_or(false),
        };
        anyhow::ensure!(!session.secret.is_empty(), "SECRET must not be empty");

        let admin = match (std::env::var("ADMIN_USER"), std::env::var("ADMIN_PASS")) {
            (Ok(username), Ok(password)) => Some(AdminBootstrap { username, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            session,
            admin,
            login_attempts_per_minute: env_parse("LOGIN_ATTEMPTS_PER_MINUTE").unwrap_or(5),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
