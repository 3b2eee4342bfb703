/*!
 * Tests for configuration loading and validation
 */

use std::str::FromStr;

use anyhow::Result;
use subtrans::app_config::{Config, LogLevel, TranslationProvider};

use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.pipeline.batch_size, 10);
    assert_eq!(config.pipeline.concurrency, 3);
    assert_eq!(config.translation.sub_batch_size, 20);
    assert_eq!(config.translation.retry_count, 5);
    assert_eq!(config.translation.retry_backoff_ms, 1000);
    assert_eq!(config.translation.max_retry_wait_secs, 300);
    assert!(config.jellyfin.cleanup_originals);
    Ok(())
}

/// Test that partial files fill the remaining fields with defaults
#[test]
fn test_load_or_create_withPartialFile_shouldUseDefaultsForMissingFields() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "target_language": "French",
            "pipeline": { "batch_size": 25, "block_limit": 100 },
            "translation": { "provider": "ollama", "model": "mistral" },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_language, "French");
    assert_eq!(config.pipeline.batch_size, 25);
    assert_eq!(config.pipeline.concurrency, 3);
    assert_eq!(config.pipeline.block_limit, Some(100));
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.get_model(), "mistral");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

/// Test that saving and loading keeps every value
#[test]
fn test_save_thenLoad_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    let mut config = common::test_config(7, 2);
    config.jellyfin.forced = true;

    config.save(&path)?;
    let loaded = Config::load_or_create(&path)?;

    assert_eq!(loaded.pipeline.batch_size, 7);
    assert_eq!(loaded.pipeline.concurrency, 2);
    assert_eq!(loaded.translation.retry_backoff_ms, 1);
    assert!(loaded.jellyfin.forced);
    Ok(())
}

/// Test that malformed JSON is reported instead of being overwritten
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path)?, "{ not json");
    Ok(())
}

/// Test the validation rules
#[test]
fn test_validate_shouldRejectInconsistentValues() {
    assert!(common::test_config(10, 3).validate().is_ok());
    assert!(common::test_config(0, 3).validate().is_err());
    assert!(common::test_config(10, 0).validate().is_err());

    let mut config = common::test_config(10, 3);
    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = common::test_config(10, 3);
    config.target_language = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = common::test_config(10, 3);
    config.translation.retry_count = 0;
    assert!(config.validate().is_err());
}

/// Test that OpenAI without a key is rejected while LM Studio needs none
#[test]
fn test_validate_withOpenAIKey_shouldRequireKeyOnlyForOpenAI() {
    let mut config = common::test_config(10, 3);
    config.translation.provider = TranslationProvider::LMStudio;
    assert!(config.validate().is_ok());

    config.translation.provider = TranslationProvider::OpenAI;
    config.translation.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_translation_provider_fromStr_shouldParseCaseInsensitively() {
    assert_eq!(TranslationProvider::from_str("OpenAI").unwrap(), TranslationProvider::OpenAI);
    assert_eq!(TranslationProvider::from_str("ollama").unwrap(), TranslationProvider::Ollama);
    assert_eq!(TranslationProvider::from_str("LMStudio").unwrap(), TranslationProvider::LMStudio);
    assert!(TranslationProvider::from_str("deepl").is_err());
    assert_eq!(TranslationProvider::LMStudio.to_string(), "lmstudio");
}

#[test]
fn test_log_level_toLevelFilter_shouldMapEveryLevel() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
}
