use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which language-model backend serves the conversation and grading calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
    /// Offline, deterministic gateway for demos and tests. Needs no API key.
    Scripted,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub grading_model: String,
    pub turn_limit: u32,
    pub pass_threshold: u8,
    pub admin_id: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = var_or("DATABASE_URL", "sqlite://interview_results.db?mode=rwc");

        let provider_str = var_or("LLM_PROVIDER", "gemini");
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            "scripted" => Provider::Scripted,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{other}' is not one of gemini, openai, scripted"),
                ));
            }
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model = var_or("CHAT_MODEL", "gemini-2.5-flash");
        let grading_model = var_or("GRADING_MODEL", "gemini-2.5-flash");

        let turn_limit_str = var_or("TURN_LIMIT", "5");
        let turn_limit = turn_limit_str
            .parse::<u32>()
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TURN_LIMIT".to_string(),
                    format!("'{turn_limit_str}' is not a whole number of at least 1"),
                )
            })?;

        let pass_threshold_str = var_or("PASS_THRESHOLD", "60");
        let pass_threshold = pass_threshold_str
            .parse::<u8>()
            .ok()
            .filter(|threshold| *threshold <= 100)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "PASS_THRESHOLD".to_string(),
                    format!("'{pass_threshold_str}' is not between 0 and 100"),
                )
            })?;

        let admin_id = var_or("ADMIN_ID", "ADMIN123").trim().to_string();
        if admin_id.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ADMIN_ID".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        match provider {
            Provider::OpenAI if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar(
                    "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                ));
            }
            Provider::Gemini if gemini_api_key.is_none() => {
                return Err(ConfigError::MissingVar(
                    "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            bind_address,
            database_url,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            grading_model,
            turn_limit,
            pass_threshold,
            admin_id,
            log_level,
            prompts_path,
        })
    }
}
