//! Configuration structures.
//!
//! Configuration is loaded from a JSON config file and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::errors::Result;

/// Global engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// IPC transport configuration.
    #[serde(default)]
    pub ipc: IpcConfig,

    /// Graph engine defaults.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `RAG_LISTEN_ADDR` and `RAG_LOG_FORMAT` overrides.
    pub fn apply_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("RAG_LISTEN_ADDR") {
            if !addr.is_empty() {
                self.server.listen_addr = addr;
            }
        }
        if let Ok(format) = std::env::var("RAG_LOG_FORMAT") {
            self.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        self
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IPC server bind address (TCP).
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50061".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Graph engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Prefix for auto-named processes.
    pub process_prefix: String,

    /// Prefix for auto-named resources.
    pub resource_prefix: String,

    /// Instance count used when a resource is registered without one.
    pub default_instances: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            process_prefix: "P".to_string(),
            resource_prefix: "R".to_string(),
            default_instances: 1,
        }
    }
}

/// IPC transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Maximum concurrent TCP connections. Connections beyond this limit
    /// are dropped on accept.
    pub max_connections: usize,

    /// Per-frame read timeout. Idle connections are dropped after it.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Per-frame write timeout. Slow consumers are dropped after it.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            max_connections: 64,
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(10),
        }
    }
}
