use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

/// Settings shared by every HTTP service.
///
/// Read from an optional `configuration.{yaml,toml,json}` file in the working
/// directory, then overridden by `APP__*` variables (e.g. `APP__PORT=9000`).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint. Traces are only exported when this is set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::with_prefix("APP").separator("__"))
    }

    fn from_environment(env: Environment) -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(env)
            .build()?;

        let config: Config = config.try_deserialize()?;
        if config.otlp_endpoint.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Ok(Config {
                otlp_endpoint: None,
                ..config
            });
        }
        Ok(config)
    }
}
