/*!
 * Tests for the translation client against mock providers
 */

use std::sync::Arc;

use subtrans::errors::{ProviderError, TranslationError};
use subtrans::providers::mock::MockProvider;
use subtrans::translation::payload::TaggedText;
use subtrans::translation::{TranslationService, Translator};

use crate::common;

fn texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Text {}", i)).collect()
}

fn service(provider: &MockProvider) -> TranslationService {
    TranslationService::with_provider(Arc::new(provider.clone()), &common::fast_translation_config())
}

/// Test that transient failures are retried until they succeed
#[tokio::test]
async fn test_translate_withIntermittentProvider_shouldRetryAndSucceed() {
    // Every second request fails
    let provider = MockProvider::intermittent(2);
    let service = service(&provider);
    service.translate(&texts(1), "Spanish").await.unwrap();
    let result = service.translate(&texts(3), "Spanish").await.unwrap();

    assert_eq!(result, vec!["[TRANSLATED] Text 0", "[TRANSLATED] Text 1", "[TRANSLATED] Text 2"]);
    assert_eq!(provider.request_count(), 3);
}

/// Test that persistent outages end in RetriesExhausted after every attempt
#[tokio::test]
async fn test_translate_withUnavailableProvider_shouldExhaustRetries() {
    let provider = MockProvider::unavailable();
    let result = service(&provider).translate(&texts(2), "Spanish").await;

    match result {
        Err(TranslationError::RetriesExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(provider.request_count(), 3);
}

/// Test that authentication failures are not retried
#[tokio::test]
async fn test_translate_withAuthFailure_shouldFailImmediately() {
    let provider = MockProvider::failing();
    let result = service(&provider).translate(&texts(2), "Spanish").await;

    assert!(matches!(
        result,
        Err(TranslationError::Provider(ProviderError::AuthenticationError(_)))
    ));
    assert_eq!(provider.request_count(), 1);
}

/// Test that payloads without the translations key are retried and then reported as malformed
#[tokio::test]
async fn test_translate_withMalformedPayload_shouldFailMalformed() {
    let provider = MockProvider::malformed();
    let result = service(&provider).translate(&texts(2), "Spanish").await;

    assert!(matches!(result, Err(TranslationError::MalformedResponse(_))));
    assert_eq!(provider.request_count(), 3);
}

/// Test that an empty reply counts as malformed
#[tokio::test]
async fn test_translate_withEmptyReply_shouldFailMalformed() {
    let provider = MockProvider::empty();
    let result = service(&provider).translate(&texts(1), "Spanish").await;

    assert!(matches!(result, Err(TranslationError::MalformedResponse(_))));
}

/// Test that ids stay unique across sub-batches so results map back by position
#[tokio::test]
async fn test_translate_withSeveralSubBatches_shouldKeepGlobalOrder() {
    fn echo_id(item: &TaggedText) -> String {
        format!("#{}", item.id)
    }
    // Later sub-batches answer first
    fn later_is_faster(items: &[TaggedText]) -> u64 {
        let first = items.first().map(|t| t.id).unwrap_or(0) as u64;
        60u64.saturating_sub(first)
    }

    let provider = MockProvider::reversing()
        .with_custom_response(echo_id)
        .with_delay(later_is_faster);
    let result = service(&provider).translate(&texts(50), "French").await.unwrap();

    let expected: Vec<String> = (0..50).map(|i| format!("#{}", i)).collect();
    assert_eq!(result, expected);
    assert_eq!(provider.request_count(), 3);
}

/// Test that token usage is collected from every response
#[tokio::test]
async fn test_token_usage_afterTranslation_shouldCountRequests() {
    let provider = MockProvider::working();
    let service = service(&provider);
    service.translate(&texts(45), "Spanish").await.unwrap();

    let usage = service.token_usage();
    assert_eq!(usage.requests, 3);
    assert!(usage.prompt_tokens > 0);
    assert!(usage.completion_tokens > 0);
    assert_eq!(usage.total_tokens(), usage.prompt_tokens + usage.completion_tokens);
}
