//! API configuration.

use vgen_models::ProviderKind;

/// API server configuration.
///
/// Provider credentials, the database URL, and the storage root are read by
/// their own components (`KlingConfig`/`FalConfig`, `PgTaskRepository`,
/// `LocalStorage`); this struct carries what the HTTP layer itself needs.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public domain name, used to build provider callback URLs and
    /// result URLs (`https://{domain}/webhook/{id}`, `/result/{id}`)
    pub domain: String,
    /// Which provider new tasks are routed through
    pub provider: ProviderKind,
    /// Max request body size (multipart image uploads)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            domain: "localhost:8000".to_string(),
            provider: ProviderKind::Fal,
            max_body_size: 50 * 1024 * 1024, // 50MB
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            domain: std::env::var("DOMAIN").unwrap_or_else(|_| "localhost:8000".to_string()),
            provider: std::env::var("VIDEO_PROVIDER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(ProviderKind::Fal),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
