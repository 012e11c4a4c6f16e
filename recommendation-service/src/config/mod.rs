use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub ai: AiConfig,
    pub auth: AuthConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Settings for the external AI backend that serves both the
/// similarity ranking and the text embedding endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Periodic full vector rebuild (disabled in tests)
    pub vector_refresh_enabled: bool,
    pub vector_refresh_interval_secs: u64,
    pub vector_refresh_initial_delay_secs: u64,
    /// Capacity of the vector write-back queue
    pub write_back_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            ai: AiConfig {
                base_url: std::env::var("AI_SERVICE_BASE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8088".to_string()),
                request_timeout_secs: std::env::var("AI_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET")?,
            },
            jobs: JobsConfig {
                vector_refresh_enabled: std::env::var("VECTOR_REFRESH_ENABLED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                vector_refresh_interval_secs: std::env::var("VECTOR_REFRESH_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()?,
                vector_refresh_initial_delay_secs: std::env::var(
                    "VECTOR_REFRESH_INITIAL_DELAY_SECS",
                )
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
                write_back_capacity: std::env::var("VECTOR_WRITE_BACK_CAPACITY")
                    .unwrap_or_else(|_| "1024".to_string())
                    .parse()?,
            },
        })
    }
}
