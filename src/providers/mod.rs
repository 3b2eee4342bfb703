/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported chat backends:
 * - OpenAI: OpenAI chat completions (also used for LM Studio's compatible server)
 * - Ollama: Local LLM server
 * - Mock: deterministic in-process backend for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};

/// A single chat completion request, independent of the backend
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt describing the task
    pub system: String,
    /// User message carrying the payload
    pub user: String,
    /// Ask the backend to constrain its output to a JSON object
    pub json_mode: bool,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_mode: false,
            temperature: 0.3,
        }
    }

    /// Request JSON-only output
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text returned by a backend plus optional token accounting
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// Implementations perform exactly one remote call per `complete`; retries and
/// request spacing are applied by the translation layer.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>, TranslationError> {
    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(TranslationError::Config(format!(
                    "{} requires an API key",
                    config.provider.display_name()
                )));
            }
            Arc::new(openai::OpenAI::new(
                api_key,
                config.get_endpoint(),
                config.get_model(),
                config.timeout_secs,
            ))
        }
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::new(
            config.get_endpoint(),
            config.get_model(),
            config.timeout_secs,
        )),
    };

    Ok(provider)
}

/// Map a transport-level reqwest failure onto the provider taxonomy
pub(crate) fn classify_reqwest_error(service: &str, e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", service, e))
    } else if e.is_decode() {
        ProviderError::ParseError(format!("{}: {}", service, e))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", service, e))
    }
}

/// Map a non-success HTTP status onto the provider taxonomy
pub(crate) fn classify_status(status: reqwest::StatusCode, message: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        code => ProviderError::ApiError {
            status_code: code,
            message,
        },
    }
}

pub mod mock;
pub mod ollama;
pub mod openai;
