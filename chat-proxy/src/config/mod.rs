use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama3-70b-8192";
const DEFAULT_TEMPERATURE: f32 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Matches the free-tier quota of the hosted completion API.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 30;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub rate_limit: RateLimitConfig,
}

/// Which completion backend the proxy relays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API (Groq by default).
    Groq,
    /// Canned local responses, for development without an API key.
    Mock,
}

impl ProviderKind {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" | "openai" => Ok(ProviderKind::Groq),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "unknown CHAT_PROVIDER '{}', expected 'groq' or 'mock'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Base URL of the chat completions API, without the `/chat/completions` suffix.
    pub base_url: String,
    pub api_key: Secret<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests admitted per minute on `/api/chat`. Zero disables the limiter.
    pub requests_per_minute: u32,
}

impl ProxyConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let kind = ProviderKind::parse(&get_env("CHAT_PROVIDER", Some("groq"), false)?)?;
        let api_key = match kind {
            ProviderKind::Groq => get_env("GROQ_API_KEY", None, is_prod)?,
            ProviderKind::Mock => env::var("GROQ_API_KEY").unwrap_or_default(),
        };

        Ok(ProxyConfig {
            common: common_config,
            provider: ProviderConfig {
                kind,
                base_url: get_env("CHAT_PROVIDER_BASE_URL", Some(DEFAULT_BASE_URL), false)?,
                api_key: Secret::new(api_key),
                model: get_env("CHAT_MODEL", Some(DEFAULT_MODEL), false)?,
                temperature: parse_or("CHAT_TEMPERATURE", DEFAULT_TEMPERATURE),
                max_tokens: parse_or("CHAT_MAX_TOKENS", DEFAULT_MAX_TOKENS),
                timeout_secs: parse_or("CHAT_PROVIDER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: parse_or(
                    "CHAT_RATE_LIMIT_PER_MINUTE",
                    DEFAULT_REQUESTS_PER_MINUTE,
                ),
            },
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Groq,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Secret::new(String::new()),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting, using default");
            default
        }),
        Err(_) => default,
    }
}
