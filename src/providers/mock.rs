/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the id-tagged payload used by the translation layer and
 * answers it according to a [`MockBehavior`]:
 * - `MockProvider::working()` - Always succeeds with `[TRANSLATED] <text>`
 * - `MockProvider::reversing()` - Succeeds but lists translations in reverse order
 * - `MockProvider::failing()` - Always fails with a non-retryable error
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::translation::payload::{self, TaggedText, TranslationPayload};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds, but the translations array comes back in reverse order
    Reversing,
    /// Fails with a transient error on every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an authentication error
    Failing,
    /// Always fails with a transient server error
    Unavailable,
    /// Returns JSON without the `translations` key
    Malformed,
    /// Drops the last translation of every request
    MissingItem,
    /// Returns empty response
    Empty,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Requests currently inside `complete`
    in_flight: Arc<AtomicUsize>,
    /// Highest observed value of `in_flight`
    max_in_flight: Arc<AtomicUsize>,
    /// Custom per-item translation (optional)
    custom_response: Option<fn(&TaggedText) -> String>,
    /// Extra latency chosen from the request items (optional)
    delay_for: Option<fn(&[TaggedText]) -> u64>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            delay_for: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn reversing() -> Self {
        Self::new(MockBehavior::Reversing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unavailable() -> Self {
        Self::new(MockBehavior::Unavailable)
    }

    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    pub fn missing_item() -> Self {
        Self::new(MockBehavior::MissingItem)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom per-item translation
    pub fn with_custom_response(mut self, generator: fn(&TaggedText) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Delay each request by an amount derived from its items
    pub fn with_delay(mut self, delay_for: fn(&[TaggedText]) -> u64) -> Self {
        self.delay_for = Some(delay_for);
        self
    }

    /// Number of `complete` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous `complete` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Translation the mock produces for one item
    pub fn translate_item(&self, item: &TaggedText) -> String {
        match self.custom_response {
            Some(generator) => generator(item),
            None => format!("[TRANSLATED] {}", item.text),
        }
    }

    fn render(&self, items: Vec<TaggedText>) -> String {
        let payload = TranslationPayload { translations: items };
        serde_json::to_string(&payload).unwrap_or_default()
    }

    async fn respond(&self, request: &CompletionRequest, count: usize) -> Result<CompletionResponse, ProviderError> {
        let items = payload::parse_request_items(&request.user)
            .ok_or_else(|| ProviderError::ParseError("mock could not read request items".to_string()))?;

        if let Some(delay_for) = self.delay_for {
            tokio::time::sleep(Duration::from_millis(delay_for(&items))).await;
        }

        let translated: Vec<TaggedText> = items
            .iter()
            .map(|item| TaggedText {
                id: item.id,
                text: self.translate_item(item),
            })
            .collect();

        let text = match self.behavior {
            MockBehavior::Working => self.render(translated),
            MockBehavior::Reversing => self.render(translated.into_iter().rev().collect()),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    });
                }
                self.render(translated)
            }
            MockBehavior::Failing => {
                return Err(ProviderError::AuthenticationError(
                    "Simulated provider failure".to_string(),
                ))
            }
            MockBehavior::Unavailable => {
                return Err(ProviderError::ApiError {
                    message: "Simulated outage".to_string(),
                    status_code: 503,
                })
            }
            MockBehavior::Malformed => r#"{"result": []}"#.to_string(),
            MockBehavior::MissingItem => {
                let mut translated = translated;
                translated.pop();
                self.render(translated)
            }
            MockBehavior::Empty => String::new(),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                self.render(translated)
            }
        };

        Ok(CompletionResponse {
            prompt_tokens: Some(request.user.len() as u64),
            completion_tokens: Some(text.len() as u64),
            text,
        })
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            custom_response: self.custom_response,
            delay_for: self.delay_for,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = self.respond(&request, count).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::AuthenticationError("mock".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
