use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub proxy: ProxySettings,
    #[serde(default)]
    pub usage: UsageSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxySettings {
    /// Base URL of the chat proxy (e.g., http://localhost:8080).
    pub url: String,
    /// Request timeout. Unset means the HTTP client's default (no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsageSettings {
    #[serde(default = "default_requests_limit")]
    pub requests_limit: u64,
    #[serde(default = "default_tokens_limit")]
    pub tokens_limit: u64,
    /// Directory holding the persisted usage state.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Length of the request-counting window.
    #[serde(default = "default_reset_interval_secs")]
    pub reset_interval_secs: u64,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            requests_limit: default_requests_limit(),
            tokens_limit: default_tokens_limit(),
            storage_dir: default_storage_dir(),
            reset_interval_secs: default_reset_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionSettings {
    /// Send earlier turns as history instead of starting fresh on every send.
    #[serde(default)]
    pub keep_history: bool,
}

fn default_requests_limit() -> u64 {
    30
}

fn default_tokens_limit() -> u64 {
    14_400
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".vba-assistant")
}

fn default_reset_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "warn".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("current directory: {}", e)))?;

    // Support running from the workspace root or from inside chat-client.
    let configuration_directory = if base_path.ends_with("chat-client") {
        base_path.join("config")
    } else {
        base_path.join("chat-client").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .set_default("proxy.url", "http://localhost:8080")?
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
