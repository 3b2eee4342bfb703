/*!
 * End-to-end tests for the batch translation pipeline
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use subtrans::app_config::PipelineConfig;
use subtrans::errors::{ParseError, PipelineError, TranslationError};
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle_processor::SubtitleDocument;
use subtrans::translation::{
    CancellationFlag, JobOutcome, JobStatus, TranslationPipeline, TranslationService, Translator,
};

use crate::common;

fn pipeline_config(batch_size: usize, concurrency: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        concurrency,
        block_limit: None,
    }
}

fn mock_pipeline(provider: &MockProvider, batch_size: usize, concurrency: usize) -> TranslationPipeline {
    common::init_test_logging();
    let service = TranslationService::with_provider(Arc::new(provider.clone()), &common::fast_translation_config());
    TranslationPipeline::new(Arc::new(service), pipeline_config(batch_size, concurrency))
}

/// Translator that answers `T:<text>` and sleeps longer for earlier batches
struct StaggeredTranslator {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Translator for StaggeredTranslator {
    async fn translate(&self, texts: &[String], _target: &str) -> Result<Vec<String>, TranslationError> {
        let first = texts.first().cloned().unwrap_or_default();
        let line: u64 = first.trim_start_matches("Line ").parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(100u64.saturating_sub(line * 5))).await;
        self.calls.lock().push(first);
        Ok(texts.iter().map(|t| format!("T:{}", t)).collect())
    }
}

/// Translator that requests cancellation as soon as it is called
struct CancellingTranslator {
    cancel: CancellationFlag,
}

#[async_trait]
impl Translator for CancellingTranslator {
    async fn translate(&self, texts: &[String], _target: &str) -> Result<Vec<String>, TranslationError> {
        self.cancel.cancel();
        Ok(texts.to_vec())
    }
}

/// Translator that returns one translation too few
struct ShortTranslator;

#[async_trait]
impl Translator for ShortTranslator {
    async fn translate(&self, texts: &[String], _target: &str) -> Result<Vec<String>, TranslationError> {
        Ok(texts.iter().skip(1).cloned().collect())
    }
}

fn texts_of(path: &Path) -> Vec<String> {
    SubtitleDocument::from_file(path)
        .map(|doc| doc.entries.into_iter().map(|e| e.text).collect())
        .unwrap_or_default()
}

/// Test that 25 entries in batches of 10 come back complete and numbered 1..25
#[tokio::test]
async fn test_translate_file_with25Entries_shouldWriteAllInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let provider = MockProvider::working();
    let pipeline = mock_pipeline(&provider, 10, 3);

    let outcome = pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    let output = temp_dir.path().join("movie.spa.srt");
    assert_eq!(outcome, JobOutcome::Completed { output_path: output.clone(), entries: 25 });

    let document = SubtitleDocument::from_file(&output)?;
    let numbers: Vec<usize> = document.entries.iter().map(|e| e.seq_num).collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<_>>());
    for (i, entry) in document.entries.iter().enumerate() {
        assert_eq!(entry.text, format!("[TRANSLATED] Line {}", i + 1));
        assert_eq!(entry.start_time_ms, i as u64 * 2000);
    }
    assert_eq!(provider.request_count(), 3);
    Ok(())
}

/// Test that batches finishing out of order are still merged in index order
#[tokio::test]
async fn test_run_withOutOfOrderCompletion_shouldKeepIndexOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 20)?;
    let translator = Arc::new(StaggeredTranslator { calls: Mutex::new(Vec::new()) });
    let pipeline = TranslationPipeline::new(translator.clone(), pipeline_config(4, 5));

    pipeline.translate_file(&input, "fr", CancellationFlag::new()).await?;

    let calls = translator.calls.lock().clone();
    assert_eq!(calls.first().map(String::as_str), Some("Line 17"), "last batch should finish first");

    let expected: Vec<String> = (1..=20).map(|i| format!("T:Line {}", i)).collect();
    assert_eq!(texts_of(&temp_dir.path().join("movie.fre.srt")), expected);
    Ok(())
}

/// Test that a backend answering in reverse order does not swap texts
#[tokio::test]
async fn test_translate_file_withReversingBackend_shouldMatchById() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "greeting.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n",
    )?;
    let pipeline = mock_pipeline(&MockProvider::reversing(), 10, 1);

    pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    assert_eq!(
        texts_of(&temp_dir.path().join("greeting.spa.srt")),
        vec!["[TRANSLATED] Hello", "[TRANSLATED] World"]
    );
    Ok(())
}

/// Test that a job cancelled before it starts writes nothing
#[tokio::test]
async fn test_run_job_withCancelBeforeStart_shouldWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 12)?;
    let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
    let provider = MockProvider::working();
    let sink_statuses = statuses.clone();
    let pipeline = mock_pipeline(&provider, 5, 2)
        .with_status_sink(Arc::new(move |msg: &str| sink_statuses.lock().push(msg.to_string())));

    let cancel = CancellationFlag::new();
    cancel.cancel();
    let outcome = pipeline.translate_file(&input, "Spanish", cancel).await?;

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(!temp_dir.path().join("movie.spa.srt").exists());
    assert_eq!(provider.request_count(), 0);
    assert_eq!(statuses.lock().last().map(String::as_str), Some("Translation cancelled"));
    Ok(())
}

/// Test that cancelling while batches are in flight stops without output
#[tokio::test]
async fn test_run_job_withCancelDuringRun_shouldEndCancelled() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 30)?;
    let cancel = CancellationFlag::new();
    let translator = Arc::new(CancellingTranslator { cancel: cancel.clone() });
    let pipeline = TranslationPipeline::new(translator, pipeline_config(5, 1));

    let document = SubtitleDocument::from_file(&input)?;
    let output = temp_dir.path().join("movie.spa.srt");
    let job = pipeline.create_job(document, "Spanish", output.clone(), cancel);
    let outcome = pipeline.run_job(&job).await?;

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert_eq!(job.status(), JobStatus::Cancelled);
    assert!(job.progress().completed_batches < 6);
    assert!(!output.exists());
    Ok(())
}

/// Test that a terminal provider failure fails the job and writes nothing
#[tokio::test]
async fn test_run_job_withFailingProvider_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 12)?;
    let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_statuses = statuses.clone();
    let pipeline = mock_pipeline(&MockProvider::failing(), 5, 2)
        .with_status_sink(Arc::new(move |msg: &str| sink_statuses.lock().push(msg.to_string())));

    let document = SubtitleDocument::from_file(&input)?;
    let output = temp_dir.path().join("movie.spa.srt");
    let job = pipeline.create_job(document, "Spanish", output.clone(), CancellationFlag::new());
    let result = pipeline.run_job(&job).await;

    assert!(matches!(result, Err(PipelineError::Translation { .. })));
    assert_eq!(job.status(), JobStatus::Failed);
    assert!(job.status().is_terminal());
    assert!(!output.exists());
    let last = statuses.lock().last().cloned().unwrap_or_default();
    assert!(last.starts_with("Translation failed"), "unexpected status: {}", last);
    Ok(())
}

/// Test that a translator returning the wrong count fails the batch
#[tokio::test]
async fn test_run_withShortTranslation_shouldFailMalformed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let pipeline = TranslationPipeline::new(Arc::new(ShortTranslator), pipeline_config(10, 1));

    let result = pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await;

    match result {
        Err(PipelineError::Translation { batch, source }) => {
            assert_eq!(batch, 1);
            assert!(matches!(source, TranslationError::MalformedResponse(_)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!temp_dir.path().join("movie.spa.srt").exists());
    Ok(())
}

/// Test that progress only moves forward and ends at 100
#[tokio::test]
async fn test_progress_duringRun_shouldBeMonotonicAndReach100() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 23)?;
    let values = Arc::new(Mutex::new(Vec::<f64>::new()));
    let sink_values = values.clone();
    let pipeline = mock_pipeline(&MockProvider::slow(5), 4, 3)
        .with_progress_sink(Arc::new(move |p: f64| sink_values.lock().push(p)));

    pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    let values = values.lock().clone();
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", values);
    assert!(values.iter().all(|p| (0.0..=100.0).contains(p)));

    // Six batch updates plus the final completion report
    assert_eq!(values.len(), 7, "unexpected progress values: {:?}", values);
    assert!(values[..5].iter().all(|p| *p < 100.0), "100 reached early: {:?}", values);
    assert_eq!(values[5], 100.0);
    assert_eq!(values.last().copied(), Some(100.0));
    Ok(())
}

/// Test that translations with blank lines still produce one SRT block per entry
#[tokio::test]
async fn test_translate_file_withBlankLinesInTranslation_shouldKeepEveryEntry() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let provider = MockProvider::working().with_custom_response(|item| {
        if item.text == "Line 3" {
            "Hola\n\nmundo\n".to_string()
        } else {
            format!("T {}", item.text)
        }
    });
    let pipeline = mock_pipeline(&provider, 10, 3);

    let outcome = pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    assert!(matches!(outcome, JobOutcome::Completed { entries: 25, .. }));
    let texts = texts_of(&temp_dir.path().join("movie.spa.srt"));
    assert_eq!(texts.len(), 25);
    assert_eq!(texts[2], "Hola\nmundo");
    assert_eq!(texts[3], "T Line 4");
    assert_eq!(texts[24], "T Line 25");
    Ok(())
}

/// Test that an empty translation is rejected instead of being written
#[tokio::test]
async fn test_translate_file_withEmptyTranslation_shouldFailMalformed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let provider = MockProvider::working().with_custom_response(|item| {
        if item.text == "Line 5" {
            String::new()
        } else {
            format!("T {}", item.text)
        }
    });
    let pipeline = mock_pipeline(&provider, 10, 1);

    let result = pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await;

    match result {
        Err(PipelineError::Translation { batch, source }) => {
            assert_eq!(batch, 1);
            assert!(matches!(source, TranslationError::MalformedResponse(_)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!temp_dir.path().join("movie.spa.srt").exists());
    Ok(())
}

/// Test that no more batches run at once than the concurrency limit
#[tokio::test]
async fn test_run_withConcurrencyLimit_shouldNeverExceedIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 40)?;
    let provider = MockProvider::slow(20);
    let pipeline = mock_pipeline(&provider, 5, 2);

    pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    assert_eq!(provider.request_count(), 8);
    assert!(provider.max_in_flight() <= 2, "max in flight: {}", provider.max_in_flight());
    Ok(())
}

/// Test that the block limit translates only the first entries
#[tokio::test]
async fn test_translate_file_withBlockLimit_shouldTranslatePrefix() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 30)?;
    let service = TranslationService::with_provider(
        Arc::new(MockProvider::working()),
        &common::fast_translation_config(),
    );
    let config = PipelineConfig {
        block_limit: Some(7),
        ..pipeline_config(5, 2)
    };
    let pipeline = TranslationPipeline::new(Arc::new(service), config);

    let outcome = pipeline.translate_file(&input, "German", CancellationFlag::new()).await?;

    assert!(matches!(outcome, JobOutcome::Completed { entries: 7, .. }));
    assert_eq!(texts_of(&temp_dir.path().join("movie.ger.srt")).len(), 7);
    Ok(())
}

/// Test that non-SRT inputs are rejected before any request
#[tokio::test]
async fn test_translate_file_withWrongFileType_shouldFailParse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", &common::srt_with_entries(2))?;
    let provider = MockProvider::working();
    let pipeline = mock_pipeline(&provider, 10, 1);

    let result = pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await;

    assert!(matches!(result, Err(PipelineError::Parse(ParseError::WrongFileType(_)))));
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

/// Test that an existing output is replaced in full
#[tokio::test]
async fn test_translate_file_withExistingOutput_shouldReplaceIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 2)?;
    let output = common::create_test_subtitle(temp_dir.path(), "movie.spa.srt", 9)?;
    let pipeline = mock_pipeline(&MockProvider::working(), 10, 1);

    pipeline.translate_file(&input, "Spanish", CancellationFlag::new()).await?;

    assert_eq!(texts_of(&output), vec!["[TRANSLATED] Line 1", "[TRANSLATED] Line 2"]);
    Ok(())
}
