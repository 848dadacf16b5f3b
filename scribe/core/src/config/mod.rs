//! TOML Configuration File Support
//!
//! Centralized configuration loading for Scribe, with an optional TOML file
//! at `~/.config/scribe/scribe.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! Provider API keys are never stored in the file. Each provider section
//! names the environment variable that holds its key.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! slow_request_warn_secs = 10
//!
//! [provider]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! temperature = 0.7
//! max_tokens = 1000
//!
//! [mature_provider]
//! enabled = true
//! base_url = "https://api.lambdalabs.com/v1"
//! model = "hermes-3-llama-3.1-405b-fp8"
//! api_key_env = "LAMBDA_API_KEY"
//!
//! [streaming]
//! escape_paragraph_breaks = true
//! refusal_preambles = ["I'm sorry"]
//!
//! [storage]
//! history_file = "chat_history.json"
//! system_prompts_file = "system_prompts.json"
//! chat_parameters_file = "chat_parameters.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ProviderProfile;
use crate::streaming::{DispatchOptions, SegmentMode, SegmenterOptions, DEFAULT_REFUSAL_PREAMBLE};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Bind address
    pub host: Option<String>,

    /// Bind port
    pub port: Option<u16>,

    /// Requests slower than this are logged as warnings
    pub slow_request_warn_secs: Option<u64>,
}

/// Provider section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToml {
    /// Whether this provider is used at all (mature provider only)
    pub enabled: Option<bool>,

    /// Base URL of the OpenAI-compatible API
    pub base_url: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Completion token limit
    pub max_tokens: Option<u32>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Streaming section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingToml {
    /// Rewrite raw paragraph breaks before sentence splitting
    pub escape_paragraph_breaks: Option<bool>,

    /// Phrases that mark a refusal when a stream opens with them
    pub refusal_preambles: Option<Vec<String>>,
}

/// Storage section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    /// Chat history file
    pub history_file: Option<PathBuf>,

    /// System prompt library
    pub system_prompts_file: Option<PathBuf>,

    /// Chat parameter library
    pub chat_parameters_file: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeToml {
    /// Server configuration section
    pub server: ServerToml,

    /// Standard provider section
    pub provider: ProviderToml,

    /// Mature-content provider section
    pub mature_provider: ProviderToml,

    /// Streaming configuration section
    pub streaming: StreamingToml,

    /// Storage configuration section
    pub storage: StorageToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// HTTP server settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Slow-request warning threshold
    pub slow_request_warn: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            slow_request_warn: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One provider's settings
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderConfig {
    /// Defaults for the mature-content provider (Lambda-hosted Hermes)
    #[must_use]
    pub fn mature_default() -> Self {
        Self {
            base_url: "https://api.lambdalabs.com/v1".to_string(),
            model: "hermes-3-llama-3.1-405b-fp8".to_string(),
            api_key_env: "LAMBDA_API_KEY".to_string(),
            ..Self::default()
        }
    }

    /// Resolve into a backend profile, reading the API key from the environment
    #[must_use]
    pub fn to_profile(&self) -> ProviderProfile {
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                variable = %self.api_key_env,
                model = %self.model,
                "No API key in environment, requests will be sent unauthenticated"
            );
        }

        ProviderProfile {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            request_timeout_secs: self.request_timeout.as_secs(),
        }
    }

    fn apply_toml(&mut self, toml: &ProviderToml) {
        if let Some(ref url) = toml.base_url {
            self.base_url.clone_from(url);
        }
        if let Some(ref model) = toml.model {
            self.model.clone_from(model);
        }
        if let Some(ref var) = toml.api_key_env {
            self.api_key_env.clone_from(var);
        }
        if let Some(temperature) = toml.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = toml.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(secs) = toml.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "{section}.base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{section}.model must not be empty"
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "{section}.temperature must be between 0.0 and 2.0"
            )));
        }
        Ok(())
    }
}

/// Segmentation settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamingConfig {
    /// Rewrite raw paragraph breaks before sentence splitting
    pub escape_paragraph_breaks: bool,
    /// Refusal preambles
    pub refusal_preambles: Vec<String>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            escape_paragraph_breaks: true,
            refusal_preambles: vec![DEFAULT_REFUSAL_PREAMBLE.to_string()],
        }
    }
}

impl StreamingConfig {
    /// Dispatch options for a mode under this configuration
    #[must_use]
    pub fn dispatch_options(&self, mode: SegmentMode) -> DispatchOptions {
        DispatchOptions::new(mode)
            .with_segmenter_options(SegmenterOptions {
                escape_paragraph_breaks: self.escape_paragraph_breaks,
            })
            .with_refusal_preambles(self.refusal_preambles.clone())
    }
}

/// Flat-file locations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Chat history file
    pub history_file: PathBuf,
    /// System prompt library
    pub system_prompts_file: PathBuf,
    /// Chat parameter library
    pub chat_parameters_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from("chat_history.json"),
            system_prompts_file: PathBuf::from("system_prompts.json"),
            chat_parameters_file: PathBuf::from("chat_parameters.json"),
        }
    }
}

/// Centralized configuration for Scribe
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ScribeConfigFile {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Standard provider
    pub provider: ProviderConfig,

    /// Mature-content provider (`None` when disabled)
    ///
    /// When loading, a provider the file does not explicitly enable is
    /// dropped if its API key variable is unset, so mature requests fall
    /// back to the standard provider.
    pub mature_provider: Option<ProviderConfig>,

    /// Whether mature mode is on when the process starts
    pub mature_default: bool,

    /// Segmentation settings
    pub streaming: StreamingConfig,

    /// Flat-file locations
    pub storage: StorageConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ScribeConfigFile {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            mature_provider: Some(ProviderConfig::mature_default()),
            mature_default: false,
            streaming: StreamingConfig::default(),
            storage: StorageConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ScribeConfigFile {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would only fail later at request time
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }
        self.provider.validate("provider")?;
        if let Some(ref mature) = self.mature_provider {
            mature.validate("mature_provider")?;
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/scribe/scribe.toml` or
/// `~/.config/scribe/scribe.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scribe").join("scribe.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting configuration is invalid. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<ScribeConfigFile, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if validation fails.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ScribeConfigFile, ConfigError> {
    let mut config = ScribeConfigFile::default();
    let mut mature_enabled = false;

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ScribeToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            mature_enabled = toml_config.mature_provider.enabled == Some(true);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;
    if !mature_enabled {
        drop_keyless_mature(&mut config, |key| std::env::var(key).ok());
    }

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ScribeConfigFile, toml: &ScribeToml) {
    // Server settings
    if let Some(ref host) = toml.server.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = toml.server.port {
        config.server.port = port;
    }
    if let Some(secs) = toml.server.slow_request_warn_secs {
        config.server.slow_request_warn = Duration::from_secs(secs);
    }

    // Providers
    config.provider.apply_toml(&toml.provider);
    if toml.mature_provider.enabled == Some(false) {
        config.mature_provider = None;
    } else {
        let mut mature = config
            .mature_provider
            .take()
            .unwrap_or_else(ProviderConfig::mature_default);
        mature.apply_toml(&toml.mature_provider);
        config.mature_provider = Some(mature);
    }

    // Streaming settings
    if let Some(escape) = toml.streaming.escape_paragraph_breaks {
        config.streaming.escape_paragraph_breaks = escape;
    }
    if let Some(ref preambles) = toml.streaming.refusal_preambles {
        config.streaming.refusal_preambles.clone_from(preambles);
    }

    // Storage settings
    if let Some(ref path) = toml.storage.history_file {
        config.storage.history_file.clone_from(path);
    }
    if let Some(ref path) = toml.storage.system_prompts_file {
        config.storage.system_prompts_file.clone_from(path);
    }
    if let Some(ref path) = toml.storage.chat_parameters_file {
        config.storage.chat_parameters_file.clone_from(path);
    }
}

fn parse_flag(value: &str) -> bool {
    value != "0" && value.to_lowercase() != "false"
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ScribeConfigFile) {
    apply_env_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from any variable lookup
fn apply_env_from<F>(config: &mut ScribeConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Server settings from environment
    if let Some(host) = lookup("SCRIBE_HOST") {
        config.server.host = host;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = lookup("SCRIBE_PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.server.port = port;
            config.source = ConfigSource::Env;
        }
    }

    // Provider settings from environment
    if let Some(url) = lookup("SCRIBE_PROVIDER_URL") {
        config.provider.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = lookup("SCRIBE_MODEL") {
        config.provider.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(ref mut mature) = config.mature_provider {
        if let Some(url) = lookup("SCRIBE_MATURE_PROVIDER_URL") {
            mature.base_url = url;
            config.source = ConfigSource::Env;
        }
        if let Some(model) = lookup("SCRIBE_MATURE_MODEL") {
            mature.model = model;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(flag) = lookup("SCRIBE_MATURE_DEFAULT") {
        config.mature_default = parse_flag(&flag);
        config.source = ConfigSource::Env;
    }

    // Streaming settings from environment
    if let Some(flag) = lookup("SCRIBE_ESCAPE_PARAGRAPHS") {
        config.streaming.escape_paragraph_breaks = parse_flag(&flag);
        config.source = ConfigSource::Env;
    }

    // Storage settings from environment
    if let Some(path) = lookup("SCRIBE_HISTORY_FILE") {
        config.storage.history_file = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
}

/// Drop the mature provider when its API key variable is unset or blank
fn drop_keyless_mature<F>(config: &mut ScribeConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(ref mature) = config.mature_provider else {
        return;
    };
    let has_key = lookup(&mature.api_key_env).is_some_and(|key| !key.trim().is_empty());
    if !has_key {
        tracing::warn!(
            variable = %mature.api_key_env,
            "No API key for the mature provider, mature requests use the standard provider"
        );
        config.mature_provider = None;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Bind address override
    pub host: Option<String>,
    /// Bind port override
    pub port: Option<u16>,
    /// Standard model override
    pub model: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bind address override
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Set bind port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set standard model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ScribeConfigFile) {
        if self.host.is_some() || self.port.is_some() || self.model.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref host) = self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref model) = self.model {
            config.provider.model.clone_from(model);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
