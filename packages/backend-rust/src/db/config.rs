use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub primary_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
    pub health_check: HealthCheckConfig,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let primary_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(DbConfigError::Missing {
                key: "DATABASE_URL",
            })?;

        Ok(Self {
            primary_url,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 10),
            acquire_timeout: Duration::from_millis(env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000)),
            run_migrations: env_bool("DB_RUN_MIGRATIONS", true),
            health_check: HealthCheckConfig::from_env(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub failure_threshold: u32,
}

impl HealthCheckConfig {
    fn from_env() -> Self {
        let interval_ms = env_u64("DB_HEALTH_CHECK_INTERVAL_MS", 5000);
        let timeout_ms = env_u64("DB_HEALTH_CHECK_TIMEOUT_MS", 3000);
        let failure_threshold = env_u32("DB_FAILURE_THRESHOLD", 3);

        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            failure_threshold,
        }
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3),
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("Missing required env var: {key}")]
    Missing { key: &'static str },
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
