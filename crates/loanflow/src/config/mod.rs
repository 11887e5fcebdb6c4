use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::pipeline::retry::RetryPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("APP_PORT", 3000u16)?;
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the assessment/decision pipeline: provider endpoints, cache
/// TTL, callback retry policy, and event-bus partitioning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub score_provider_url: String,
    pub validation_provider_url: String,
    pub intake_base_url: String,
    pub bureau_cache_ttl: Duration,
    pub callback_retry: RetryPolicy,
    pub event_partitions: usize,
}

impl PipelineConfig {
    fn load() -> Result<Self, ConfigError> {
        let score_provider_url =
            env::var("SCORE_PROVIDER_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string());
        let validation_provider_url = env::var("VALIDATION_PROVIDER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8082".to_string());
        let intake_base_url = env::var("INTAKE_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/api/v1".to_string());

        let cache_ttl_hours = parse_env("BUREAU_CACHE_TTL_HOURS", 24u64)?;
        let max_attempts = parse_env("CALLBACK_MAX_ATTEMPTS", 5u32)?;
        let base_delay_ms = parse_env("CALLBACK_BASE_DELAY_MS", 1000u64)?;
        let multiplier = parse_env("CALLBACK_BACKOFF_MULTIPLIER", 2u32)?;
        let event_partitions = parse_env("EVENT_PARTITIONS", 8usize)?;

        Ok(Self {
            score_provider_url,
            validation_provider_url,
            intake_base_url,
            bureau_cache_ttl: Duration::from_secs(cache_ttl_hours * 60 * 60),
            callback_retry: RetryPolicy::new(
                max_attempts,
                Duration::from_millis(base_delay_ms),
                multiplier,
            ),
            event_partitions,
        })
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str },
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a valid number")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
