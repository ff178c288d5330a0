use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Immutable application configuration, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub forwarding: ForwardingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub inbound_api_key: String,
}

/// Delivery settings for the external collector endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    /// Bounds total retry time for one request, regardless of per-attempt
    /// timeouts.
    pub overall_deadline_seconds: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub base_delay_seconds: f64,
    pub max_delay_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl ForwardingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_secs(self.overall_deadline_seconds)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with HYDROREPORT prefix
            .add_source(Environment::with_prefix("HYDROREPORT").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                inbound_api_key: "development-key".to_string(),
            },
            forwarding: ForwardingConfig {
                endpoint: "http://localhost:8081/api/data".to_string(),
                api_key: "development-key".to_string(),
                timeout_seconds: 30,
                overall_deadline_seconds: 120,
                retry: RetryConfig {
                    max_attempts: 3,
                    backoff_factor: 2.0,
                    base_delay_seconds: 1.0,
                    max_delay_seconds: 60.0,
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
                file_path: None,
            },
        }
    }
}
