//! Application configuration for the training API server.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `TRAINING_`:
/// - `TRAINING_HOST`: Server bind address (default: "0.0.0.0")
/// - `TRAINING_PORT`: Server port (default: 8090)
/// - `TRAINING_DEBUG`: Enable debug mode (default: false)
/// - `TRAINING_SERVER_NAME`: Server name for identification
/// - `TRAINING_SCHEMA`: Database schema holding the tables (default: "training")
/// - `TRAINING_INIT_SCHEMA`: Apply the embedded DDL at startup (default: true)
/// - `TRAINING_CORS_ORIGINS`: Comma separated allowed origins (default: any)
/// - `TRAINING_LOG_JSON`: Emit JSON log lines (default: false)
/// - `TRAINING_SESSION_SWEEP_INTERVAL`: Seconds between session cache sweeps
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Database schema
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Apply schema DDL on startup
    #[serde(default = "default_true")]
    pub init_schema: bool,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Option<String>,

    /// JSON log output
    #[serde(default)]
    pub log_json: bool,

    /// Session cache sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub session_sweep_interval: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_server_name() -> String {
    "specchem-training".to_string()
}

fn default_schema() -> String {
    "training".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("TRAINING_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed CORS origins; empty means allow any.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            schema: default_schema(),
            init_schema: true,
            cors_origins: None,
            log_json: false,
            session_sweep_interval: default_sweep_interval(),
        }
    }
}
