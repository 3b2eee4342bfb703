/*!
 * Core translation service implementation.
 *
 * `TranslationService` turns an ordered list of texts into an equally long,
 * equally ordered list of translations. The list is split into sub-batches
 * that run with bounded concurrency; every outbound call goes through the
 * shared rate gate and the retry policy, and results are put back in order by
 * their id tags.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use parking_lot::Mutex;

use crate::app_config::TranslationConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{self, CompletionRequest, CompletionResponse, Provider};

use super::payload::{self, TaggedText};
use super::rate_limit::RateGate;
use super::retry::{retry_with_backoff, RetryPolicy};

/// Anything that can translate an ordered list of texts
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `texts` into `target_language`; `result[i]` is the translation of `texts[i]`
    async fn translate(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError>;
}

/// Token usage statistics for tracking API consumption
#[derive(Clone, Debug)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
    /// Number of successful requests
    pub requests: u64,
    /// Start time of token tracking
    pub start_time: Instant,
    /// Total time spent inside successful API requests
    pub api_duration: Duration,
    /// Provider name
    pub provider: String,
    /// Model name
    pub model: String,
}

impl TokenUsageStats {
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::ZERO,
            provider,
            model,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    fn record(&mut self, response: &CompletionResponse, elapsed: Duration) {
        self.prompt_tokens += response.prompt_tokens.unwrap_or(0);
        self.completion_tokens += response.completion_tokens.unwrap_or(0);
        self.requests += 1;
        self.api_duration += elapsed;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = if self.api_duration > Duration::ZERO {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if minutes > 0.0 {
            self.total_tokens() as f64 / minutes
        } else {
            0.0
        }
    }

    /// One-line summary for the end of a run
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} requests, {} prompt + {} completion tokens, {:.0} tokens/min",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.tokens_per_minute()
        )
    }
}

/// Translation client over a chat provider
#[derive(Clone)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    gate: Arc<RateGate>,
    policy: RetryPolicy,
    sub_batch_size: usize,
    sub_batch_concurrency: usize,
    temperature: f32,
    usage: Arc<Mutex<TokenUsageStats>>,
}

impl TranslationService {
    /// Build the service and its provider from configuration
    pub fn new(config: &TranslationConfig) -> Result<Self, TranslationError> {
        let provider = providers::create_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Build the service around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, config: &TranslationConfig) -> Self {
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string(), config.get_model());
        Self {
            gate: Arc::new(RateGate::new(Duration::from_millis(config.min_request_interval_ms))),
            policy: RetryPolicy::from_config(config),
            sub_batch_size: config.sub_batch_size.max(1),
            sub_batch_concurrency: config.sub_batch_concurrency.max(1),
            temperature: config.temperature,
            usage: Arc::new(Mutex::new(usage)),
            provider,
        }
    }

    /// Check that the provider is reachable
    pub async fn test_connection(&self) -> Result<(), TranslationError> {
        self.provider.test_connection().await.map_err(map_provider_error)
    }

    /// Token usage accumulated so far
    pub fn token_usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Translate one sub-batch with rate limiting and retries
    async fn translate_chunk(&self, items: Vec<TaggedText>, target_language: &str) -> Result<Vec<TaggedText>, TranslationError> {
        let system = payload::build_system_prompt(target_language);
        let user = payload::build_user_prompt(&items);
        let label = format!(
            "Sub-batch {}..{}",
            items.first().map(|t| t.id).unwrap_or(0),
            items.last().map(|t| t.id).unwrap_or(0)
        );

        retry_with_backoff(&self.policy, &label, |attempt| {
            let request = CompletionRequest::new(system.as_str(), user.as_str())
                .json()
                .temperature(self.temperature);
            let items = &items;
            let label = &label;

            async move {
                self.gate.wait().await;
                debug!("{} attempt {}: sending {} texts", label, attempt, items.len());

                let started = Instant::now();
                let response = self.provider.complete(request).await.map_err(map_provider_error)?;
                self.usage.lock().record(&response, started.elapsed());

                payload::parse_response(&response.text, items)
            }
        })
        .await
    }
}

/// A reply the provider could not decode counts as a malformed response
fn map_provider_error(error: ProviderError) -> TranslationError {
    match error {
        ProviderError::ParseError(msg) => TranslationError::MalformedResponse(msg),
        other => TranslationError::Provider(other),
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let tagged = payload::tag_texts(texts, 0);
        let chunks: Vec<Vec<TaggedText>> = tagged.chunks(self.sub_batch_size).map(|c| c.to_vec()).collect();
        debug!("Translating {} texts in {} sub-batches", texts.len(), chunks.len());

        let results: Vec<Vec<TaggedText>> = stream::iter(chunks)
            .map(|chunk| self.translate_chunk(chunk, target_language))
            .buffer_unordered(self.sub_batch_concurrency)
            .try_collect()
            .await?;

        let mut merged: Vec<TaggedText> = results.into_iter().flatten().collect();
        merged.sort_by_key(|t| t.id);

        let in_order = merged.len() == texts.len() && merged.iter().enumerate().all(|(i, t)| t.id == i);
        if !in_order {
            return Err(TranslationError::MalformedResponse(format!(
                "reassembled {} translations for {} texts",
                merged.len(),
                texts.len()
            )));
        }

        Ok(merged.into_iter().map(|t| t.text).collect())
    }
}
