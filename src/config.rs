use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BUCKET: &str = "documents";
const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_SUMMARY_CHAR_LIMIT: usize = 10_000;
const DEFAULT_QUESTION_CHAR_LIMIT: usize = 8_000;
const DEFAULT_QUESTION_COUNT: usize = 10;
const DEFAULT_SUMMARY_FALLBACK_CHARS: usize = 500;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

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

/// Runtime configuration for the enrichment service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the REST document store (tables and object storage).
    pub store_url: String,
    /// Service key used to authenticate against the document store.
    pub store_service_key: String,
    /// Bucket that holds uploaded source files.
    pub store_bucket: String,
    /// Backend used for summaries and question generation.
    pub generation_provider: GenerationProvider,
    /// Model identifier passed to the generation backend.
    pub generation_model: String,
    /// API key for the Gemini backend.
    pub gemini_api_key: Option<String>,
    /// Optional override for the Gemini endpoint.
    pub gemini_url: Option<String>,
    /// Optional override for the Ollama endpoint.
    pub ollama_url: Option<String>,
    /// Maximum number of characters of extracted text forwarded to the summary prompt.
    pub summary_char_limit: usize,
    /// Maximum number of characters of extracted text forwarded to the question prompt.
    pub question_char_limit: usize,
    /// Number of questions requested per document.
    pub question_count: usize,
    /// Length of the raw-response prefix kept when a summary cannot be parsed.
    pub summary_fallback_chars: usize,
    /// Deadline applied to every backend and store call, in seconds.
    pub call_timeout_secs: u64,
    /// Directory where downloaded files are staged.
    pub staging_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hosted Gemini `generateContent` API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_provider: GenerationProvider = load_env("GENERATION_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?;
        let gemini_api_key = load_env_optional("GEMINI_API_KEY");
        if generation_provider == GenerationProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".to_string()));
        }

        Ok(Self {
            store_url: load_env("STORE_URL")?,
            store_service_key: load_env("STORE_SERVICE_KEY")?,
            store_bucket: load_env_optional("STORE_BUCKET")
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            generation_provider,
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            gemini_api_key,
            gemini_url: load_env_optional("GEMINI_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            summary_char_limit: parse_optional("SUMMARY_CHAR_LIMIT")?
                .unwrap_or(DEFAULT_SUMMARY_CHAR_LIMIT),
            question_char_limit: parse_optional("QUESTION_CHAR_LIMIT")?
                .unwrap_or(DEFAULT_QUESTION_CHAR_LIMIT),
            question_count: parse_optional("QUESTION_COUNT")?.unwrap_or(DEFAULT_QUESTION_COUNT),
            summary_fallback_chars: parse_optional("SUMMARY_FALLBACK_CHARS")?
                .unwrap_or(DEFAULT_SUMMARY_FALLBACK_CHARS),
            call_timeout_secs: parse_optional("CALL_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            staging_dir: load_env_optional("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Per-call deadline for backend and store requests.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        store_url = %config.store_url,
        bucket = %config.store_bucket,
        provider = ?config.generation_provider,
        model = %config.generation_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Gemini".parse(), Ok(GenerationProvider::Gemini));
        assert_eq!(" ollama ".parse(), Ok(GenerationProvider::Ollama));
        assert_eq!("openai".parse::<GenerationProvider>(), Err(()));
    }

    #[test]
    fn call_timeout_uses_seconds() {
        let config = Config {
            store_url: "http://127.0.0.1:54321".into(),
            store_service_key: "service-key".into(),
            store_bucket: "documents".into(),
            generation_provider: GenerationProvider::Ollama,
            generation_model: "llama3".into(),
            gemini_api_key: None,
            gemini_url: None,
            ollama_url: None,
            summary_char_limit: 10_000,
            question_char_limit: 8_000,
            question_count: 10,
            summary_fallback_chars: 500,
            call_timeout_secs: 7,
            staging_dir: env::temp_dir(),
            server_port: None,
        };
        assert_eq!(config.call_timeout(), Duration::from_secs(7));
    }
}
