use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use kaiwa_algo::{
    StudyLimits, DEFAULT_CONTEXT_TURNS, DEFAULT_HISTORY_CAP, DEFAULT_POOL_SAMPLE,
    DEFAULT_STUDY_CAP,
};

const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_WORKSPACE_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            session: SessionConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Tunables of the conversation and study policies
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Non-system turns kept in a session
    pub history_cap: usize,
    /// History turns considered for each request
    pub context_turns: usize,
    pub study_limits: StudyLimits,
    pub generation_timeout: Duration,
    /// Unused account workspaces are dropped from memory after this long
    pub workspace_idle_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            context_turns: DEFAULT_CONTEXT_TURNS,
            study_limits: StudyLimits::default(),
            generation_timeout: Duration::from_millis(DEFAULT_GENERATION_TIMEOUT_MS),
            workspace_idle_ttl: Duration::from_secs(DEFAULT_WORKSPACE_IDLE_SECS),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let history_cap = env_usize("CHAT_HISTORY_CAP", DEFAULT_HISTORY_CAP).max(1);
        let context_turns = env_usize("CHAT_CONTEXT_TURNS", DEFAULT_CONTEXT_TURNS).max(1);
        let study_cap = env_usize("STUDY_BATCH_CAP", DEFAULT_STUDY_CAP).max(1);
        let timeout_ms = env_usize("GENERATION_TIMEOUT_MS", DEFAULT_GENERATION_TIMEOUT_MS as usize);
        let idle_secs =
            env_usize("WORKSPACE_IDLE_SECS", DEFAULT_WORKSPACE_IDLE_SECS as usize).max(1);

        Self {
            history_cap,
            context_turns,
            study_limits: StudyLimits {
                pool_sample: DEFAULT_POOL_SAMPLE,
                study_cap,
            },
            generation_timeout: Duration::from_millis(timeout_ms as u64),
            workspace_idle_ttl: Duration::from_secs(idle_secs as u64),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
