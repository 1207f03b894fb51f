use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tracing: TracingConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TracingConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How far in the past a trigger instant may lie and still be accepted
    /// (default: 30). Instants older than this are rejected outright;
    /// instants inside the window fire immediately.
    #[serde(default = "default_past_tolerance")]
    pub past_tolerance_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            past_tolerance_seconds: default_past_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout for the remote build-server call in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

const fn default_past_tolerance() -> u64 {
    30
}

const fn default_request_timeout() -> u64 {
    30
}
