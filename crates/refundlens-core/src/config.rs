//! Service configuration.
//!
//! Values are layered with the `config` crate, lowest precedence first:
//! built-in defaults, an optional TOML file, `REFUNDLENS_*` environment
//! variables (`__` separates sections, e.g. `REFUNDLENS_AI__MODEL`), and
//! finally the conventional `OPENAI_API_KEY`, `PORT` and `DB_PATH` variables.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat, Map};
use serde::Deserialize;
use thiserror::Error;

use crate::scheduler::Schedule;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "refundlens";

const ENV_PREFIX: &str = "REFUNDLENS";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value had the wrong type.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values parsed but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address to bind the HTTP server to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: default_address(), allowed_origins: default_allowed_origins() }
    }
}

/// Chat-completion service configuration.
#[derive(Clone, Deserialize)]
pub struct AiConfig {
    /// API credential; AI mode is enabled only when this is non-empty.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Output token budget per explanation.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_max_tokens() -> u32 {
    200
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl AiConfig {
    /// The trimmed credential, or `None` when absent or blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.credential().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Presentation pauses in the explanation stream.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_progress_delay_ms")]
    pub progress_delay_ms: u64,
    #[serde(default = "default_demo_chunk_delay_ms")]
    pub demo_chunk_delay_ms: u64,
}

const fn default_progress_delay_ms() -> u64 {
    300
}

const fn default_demo_chunk_delay_ms() -> u64 {
    400
}

impl PacingConfig {
    pub fn progress_delay(&self) -> Duration {
        Duration::from_millis(self.progress_delay_ms)
    }

    pub fn demo_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.demo_chunk_delay_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            progress_delay_ms: default_progress_delay_ms(),
            demo_chunk_delay_ms: default_demo_chunk_delay_ms(),
        }
    }
}

/// Filing storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; an in-memory database is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Demo insertion scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed interval in seconds; daily at midnight UTC when unset.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

const fn default_true() -> bool {
    true
}

impl SchedulerConfig {
    pub fn schedule(&self) -> Schedule {
        self.interval_secs
            .map_or_else(Schedule::midnight, |secs| Schedule::Every(Duration::from_secs(secs)))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true, interval_secs: None }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Root configuration for refundlens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the optional file and the process environment.
    ///
    /// With `path = None`, `refundlens.toml` in the working directory is used if present.
    ///
    /// # Errors
    /// Returns a `ConfigError` if a source cannot be read, a value has the wrong
    /// type, or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, None)
    }

    /// Like [`Config::load`] but reads environment variables from `env` instead
    /// of the process environment when given.
    ///
    /// # Errors
    /// Same as [`Config::load`].
    pub fn load_from(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let var = |key: &str| -> Option<String> {
            let value = match &env {
                Some(vars) => vars.get(key).cloned(),
                None => std::env::var(key).ok(),
            };
            value.filter(|value| !value.trim().is_empty())
        };

        let openai_key = var("OPENAI_API_KEY");
        let port_address = var("PORT").map(|port| format!("0.0.0.0:{}", port.trim()));
        let db_path = var("DB_PATH");

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env.clone()),
            )
            .set_override_option("ai.api_key", openai_key)?
            .set_override_option("server.address", port_address)?
            .set_override_option("database.path", db_path)?;

        Self::finish(builder.build()?)
    }

    /// Parses configuration from a TOML document, with defaults for missing keys.
    ///
    /// # Errors
    /// Returns a `ConfigError` if the document is malformed or fails validation.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let raw = config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build()?;
        Self::finish(raw)
    }

    fn finish(raw: config::Config) -> Result<Self, ConfigError> {
        let config: Self = raw.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot express constraints for.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.max_tokens == 0 {
            return Err(ConfigError::Invalid("ai.max_tokens must be greater than zero".into()));
        }
        if self.ai.model.trim().is_empty() {
            return Err(ConfigError::Invalid("ai.model must not be empty".into()));
        }
        if self.ai.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "ai.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.scheduler.interval_secs == Some(0) {
            return Err(ConfigError::Invalid("scheduler.interval_secs must be greater than zero".into()));
        }
        if self.server.allowed_origins.iter().any(|origin| origin.trim().is_empty()) {
            return Err(ConfigError::Invalid("server.allowed_origins contains an empty origin".into()));
        }
        Ok(())
    }
}
