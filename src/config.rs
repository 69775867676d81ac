use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docdigest server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Model identifier passed to the generation service.
    pub summary_model: String,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// Window length, in characters, for document chunking.
    pub chunk_size: usize,
    /// Overlap, in characters, shared by adjacent chunks.
    pub chunk_overlap: usize,
    /// Token budget requested per summarization call.
    pub summary_max_tokens: u32,
    /// Maximum number of in-flight per-chunk summarization calls.
    pub summary_concurrency: usize,
    /// Timeout, in seconds, applied to each generation request.
    pub summary_timeout_secs: u64,
    /// Upload size bound enforced before the pipeline runs.
    pub max_upload_bytes: usize,
    /// Default number of records returned by the recent-documents listing.
    pub recent_default_limit: usize,
    /// Upper bound accepted for the recent-documents listing.
    pub recent_max_limit: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_CHUNK_SIZE: usize = 1500;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 150;
const DEFAULT_SUMMARY_CONCURRENCY: usize = 4;
const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_RECENT_LIMIT: usize = 20;
const DEFAULT_RECENT_MAX_LIMIT: usize = 100;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            summary_model: load_env("SUMMARY_MODEL")?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            chunk_size: load_env_usize("CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: load_env_usize("CHUNK_OVERLAP")?.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            summary_max_tokens: load_env_optional("SUMMARY_MAX_TOKENS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SUMMARY_MAX_TOKENS".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_SUMMARY_MAX_TOKENS),
            summary_concurrency: load_env_usize("SUMMARY_CONCURRENCY")?
                .unwrap_or(DEFAULT_SUMMARY_CONCURRENCY)
                .max(1),
            summary_timeout_secs: load_env_optional("SUMMARY_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SUMMARY_TIMEOUT_SECS".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_SUMMARY_TIMEOUT_SECS),
            max_upload_bytes: load_env_usize("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            recent_default_limit: load_env_usize("RECENT_DEFAULT_LIMIT")?
                .unwrap_or(DEFAULT_RECENT_LIMIT),
            recent_max_limit: load_env_usize("RECENT_MAX_LIMIT")?
                .unwrap_or(DEFAULT_RECENT_MAX_LIMIT),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Joined-summaries length above which the reduction stage issues one
    /// further summarization call.
    pub fn reduction_threshold(&self) -> usize {
        self.chunk_size * 3 / 2
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        model = %config.summary_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        concurrency = config.summary_concurrency,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
