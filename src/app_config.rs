use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::file_utils::FileManager;

/// Application configuration module
/// This module handles loading, validating and saving the settings file.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language name or code (e.g. "Spanish", "es")
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Batch pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Translation client settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Jellyfin renaming defaults
    #[serde(default)]
    pub jellyfin: JellyfinConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI chat completions
    #[default]
    OpenAI,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Batch pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Number of subtitle entries per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of batches in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Only translate the first N entries (None or 0 means all)
    #[serde(default)]
    pub block_limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            block_limit: None,
        }
    }
}

/// Translation client configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Model name (empty means provider default)
    #[serde(default)]
    pub model: String,

    // @field: API key (empty falls back to OPENAI_API_KEY for OpenAI)
    #[serde(default)]
    pub api_key: String,

    // @field: Service URL (empty means provider default)
    #[serde(default)]
    pub endpoint: String,

    /// Texts per outbound request
    #[serde(default = "default_sub_batch_size")]
    pub sub_batch_size: usize,

    /// Outbound requests in flight per batch
    #[serde(default = "default_sub_batch_concurrency")]
    pub sub_batch_concurrency: usize,

    /// Minimum spacing between any two outbound requests
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Maximum attempts per request, including the first
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff time in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Total time budget for backoff waits of a single request
    #[serde(default = "default_max_retry_wait_secs")]
    pub max_retry_wait_secs: u64,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            sub_batch_size: default_sub_batch_size(),
            sub_batch_concurrency: default_sub_batch_concurrency(),
            min_request_interval_ms: default_min_request_interval_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_retry_wait_secs: default_max_retry_wait_secs(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl TranslationConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key, falling back to the environment for OpenAI
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }

        match self.provider {
            TranslationProvider::OpenAI => std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            // LM Studio accepts any key
            TranslationProvider::LMStudio => "lm-studio".to_string(),
            TranslationProvider::Ollama => String::new(),
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }
}

/// Default flags applied by the Jellyfin renamer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JellyfinConfig {
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub sdh: bool,
    /// Delete the original file after a successful copy
    #[serde(default = "default_true")]
    pub cleanup_originals: bool,
}

impl Default for JellyfinConfig {
    fn default() -> Self {
        Self {
            default: false,
            forced: false,
            sdh: false,
            cleanup_originals: default_true(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "Spanish".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_concurrency() -> usize {
    3
}

fn default_sub_batch_size() -> usize {
    20
}

fn default_sub_batch_concurrency() -> usize {
    3
}

fn default_min_request_interval_ms() -> u64 {
    50
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_retry_wait_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_lmstudio_endpoint() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_lmstudio_model() -> String {
    "local-model".to_string()
}

impl Config {
    /// Load the configuration from a JSON file, writing defaults if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Persist the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        FileManager::write_to_file(path, &json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }

        if self.pipeline.batch_size == 0 {
            return Err(anyhow!("Batch size must be greater than zero"));
        }

        if self.pipeline.concurrency == 0 {
            return Err(anyhow!("Concurrency must be greater than zero"));
        }

        let translation = &self.translation;
        if translation.sub_batch_size == 0 || translation.sub_batch_concurrency == 0 {
            return Err(anyhow!("Sub-batch size and concurrency must be greater than zero"));
        }

        if translation.retry_count == 0 {
            return Err(anyhow!("Retry count must allow at least one attempt"));
        }

        let endpoint = translation.get_endpoint();
        Url::parse(&endpoint).with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;

        if translation.provider == TranslationProvider::OpenAI && translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for OpenAI provider (set api_key or OPENAI_API_KEY)"
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            pipeline: PipelineConfig::default(),
            translation: TranslationConfig::default(),
            jellyfin: JellyfinConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
