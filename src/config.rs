//! Environment-derived configuration
//!
//! Read once at startup and passed down; nothing is re-read per request.

use crate::contract::ContractMode;
use crate::error::SupportError;
use crate::evaluator::anthropic::{DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL};
use crate::evaluator::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::Result;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const SERVICE_NAME: &str = "bank-support";

const BUILTIN_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5000"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_BASE_URL,
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_BASE_URL,
        }
    }

    /// Environment variable prefix, e.g. `OPENAI` for `OPENAI_API_KEY`
    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Anthropic => "ANTHROPIC",
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl ProviderConfig {
    /// Provider on its default model and endpoint
    pub fn with_defaults(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
        }
    }

    /// Label such as `openai:gpt-4o`
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind.prefix(), self.model)
    }
}

// Keeps the key out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct TelemetrySettings {
    pub service_name: String,
    /// Observability credential; span output is enabled when present
    pub token: Option<String>,
}

impl TelemetrySettings {
    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for TelemetrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySettings")
            .field("service_name", &self.service_name)
            .field("enabled", &self.enabled())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub primary: Option<ProviderConfig>,
    pub secondary: Option<ProviderConfig>,
    pub llm_timeout: Duration,
    pub contract_mode: ContractMode,
    pub cors_origins: Vec<String>,
    pub telemetry: TelemetrySettings,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| SupportError::ConfigError(format!("PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                SupportError::ConfigError(format!("LLM_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(SupportError::ConfigError(
                "LLM_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let contract_mode = match get("CONTRACT_MODE") {
            Some(raw) => raw.parse::<ContractMode>()?,
            None => ContractMode::default(),
        };

        let provider = |kind: ProviderKind| {
            let prefix = kind.env_prefix();
            get(&format!("{}_API_KEY", prefix)).map(|api_key| {
                let mut config = ProviderConfig::with_defaults(kind, api_key);
                if let Some(model) = get(&format!("{}_MODEL", prefix)) {
                    config.model = model;
                }
                if let Some(base_url) = get(&format!("{}_BASE_URL", prefix)) {
                    config.base_url = base_url;
                }
                config
            })
        };

        let primary = provider(ProviderKind::OpenAi);
        let secondary = provider(ProviderKind::Anthropic);

        let mut cors_origins: Vec<String> = Vec::new();
        let mut add_origin = |origin: String| {
            if !cors_origins.contains(&origin) {
                cors_origins.push(origin);
            }
        };
        BUILTIN_ORIGINS.iter().for_each(|o| add_origin(o.to_string()));
        if let Some(domain) = get("REPLIT_DEV_DOMAIN") {
            add_origin(format!("https://{}", domain));
            add_origin(format!("http://{}", domain));
        }
        if let Some(extra) = get("CORS_ALLOWED_ORIGINS") {
            extra
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .for_each(|o| add_origin(o.to_string()));
        }

        let telemetry = TelemetrySettings {
            service_name: SERVICE_NAME.to_string(),
            token: get("LOGFIRE_TOKEN").or_else(|| get("LOGFIRE_API_KEY")),
        };

        Ok(Self {
            port,
            primary,
            secondary,
            llm_timeout: Duration::from_secs(timeout_secs),
            contract_mode,
            cors_origins,
            telemetry,
        })
    }
}
