//! Server configuration

use serde::{Deserialize, Serialize};

/// Server configuration, read from the environment via `ServerConfig::from_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub db_connection: String,
    pub jwt_secret: Vec<u8>,
    pub access_ttl_min: i64,
    pub refresh_ttl_days: i64,
    pub auto_approve_after_hours: i64,
    pub archive_after_days: i64,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    /// Comma-separated `MM-DD` pairs, e.g. `01-01,04-21`. `None` keeps the
    /// built-in Brazilian federal calendar.
    pub holidays: Option<String>,
    /// Comma-separated `DAY:HH:MM-HH:MM` entries, e.g. `MON:07:00-22:00`.
    /// Days with no entry are closed all day. `None` keeps the built-in hours.
    pub business_hours: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            db_connection: "./salastech.db".to_string(),
            jwt_secret: vec![0u8; 32],
            access_ttl_min: 15,
            refresh_ttl_days: 7,
            auto_approve_after_hours: 24,
            archive_after_days: 90,
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            holidays: None,
            business_hours: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let db_connection = std::env::var("DB_CONNECTION").unwrap_or_else(|_| "./salastech.db".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").map(|s| s.into_bytes()).unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using an insecure default — do not run this in production");
            vec![0u8; 32]
        });

        let access_ttl_min = parse_env_or("ACCESS_TTL_MIN", 15);
        let refresh_ttl_days = parse_env_or("REFRESH_TTL_DAYS", 7);
        let auto_approve_after_hours = parse_env_or("AUTO_APPROVE_AFTER_HOURS", 24);
        let archive_after_days = parse_env_or("ARCHIVE_AFTER_DAYS", 90);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let holidays = std::env::var("HOLIDAYS").ok();
        let business_hours = std::env::var("BUSINESS_HOURS").ok();

        Self {
            bind_address,
            db_connection,
            jwt_secret,
            access_ttl_min,
            refresh_ttl_days,
            auto_approve_after_hours,
            archive_after_days,
            cors_origins,
            log_level,
            holidays,
            business_hours,
        }
    }
}

fn parse_env_or(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
