/*!
 * Controller tests covering file, folder, shift and rename workflows
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;

use subtrans::app_controller::{Controller, FileOutcome};
use subtrans::jellyfin::JellyfinFlags;
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle_processor::SubtitleDocument;
use subtrans::translation::CancellationFlag;

use crate::common;

fn controller(provider: &MockProvider) -> Controller {
    Controller::with_provider(common::test_config(10, 2), Arc::new(provider.clone())).without_progress()
}

/// Test that a single subtitle file is translated next to the input
#[tokio::test]
async fn test_run_file_withSubtitle_shouldWriteTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt", 15)?;
    let provider = MockProvider::working();

    let outcome = controller(&provider).run_file(&input, false, &CancellationFlag::new()).await?;

    let output = temp_dir.path().join("episode.spa.srt");
    assert_eq!(outcome, FileOutcome::Translated { output_path: output.clone(), entries: 15 });
    assert_eq!(SubtitleDocument::from_file(&output)?.len(), 15);
    Ok(())
}

/// Test that an existing translation is skipped unless forced
#[tokio::test]
async fn test_run_file_withExistingTranslation_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt", 3)?;
    common::create_test_subtitle(temp_dir.path(), "episode.spa.srt", 1)?;
    let provider = MockProvider::working();
    let controller = controller(&provider);

    let skipped = controller.run_file(&input, false, &CancellationFlag::new()).await?;
    assert_eq!(skipped, FileOutcome::Skipped);
    assert_eq!(provider.request_count(), 0);

    let forced = controller.run_file(&input, true, &CancellationFlag::new()).await?;
    assert!(matches!(forced, FileOutcome::Translated { entries: 3, .. }));
    Ok(())
}

/// Test that unknown file types are reported as errors
#[tokio::test]
async fn test_run_file_withUnknownType_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "readme.txt", "nothing to see")?;

    let result = controller(&MockProvider::working()).run_file(&input, false, &CancellationFlag::new()).await;

    assert!(result.is_err());
    Ok(())
}

/// Test that folder mode translates sources and ignores generated files
#[tokio::test]
async fn test_run_folder_withMixedFiles_shouldTranslateSourcesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    fs::create_dir(dir.join("season1"))?;
    common::create_test_subtitle(dir, "a.srt", 4)?;
    common::create_test_subtitle(&dir.join("season1"), "b.srt", 6)?;
    common::create_test_subtitle(dir, "c.srt", 2)?;
    common::create_test_subtitle(dir, "c.spa.srt", 2)?;
    common::create_test_subtitle(dir, "d_stream_2.srt", 2)?;
    let provider = MockProvider::working();

    let summary = controller(&provider).run_folder(dir, false, &CancellationFlag::new()).await?;

    assert_eq!(summary.translated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert!(dir.join("a.spa.srt").exists());
    assert!(dir.join("season1").join("b.spa.srt").exists());
    assert!(!dir.join("c.spa.spa.srt").exists());
    assert!(!dir.join("d_stream_2.spa.srt").exists());
    Ok(())
}

/// Test that a cancelled folder run stops before the next file
#[tokio::test]
async fn test_run_folder_withCancelledFlag_shouldStop() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.srt", 4)?;
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let summary = controller(&MockProvider::working())
        .run_folder(temp_dir.path(), false, &cancel)
        .await?;

    assert!(summary.cancelled);
    assert_eq!(summary.translated, 0);
    assert!(!temp_dir.path().join("a.spa.srt").exists());
    Ok(())
}

/// Test that a failing provider is counted per file without aborting the folder
#[tokio::test]
async fn test_run_folder_withFailingProvider_shouldCountFailures() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.srt", 4)?;
    common::create_test_subtitle(temp_dir.path(), "b.srt", 4)?;

    let summary = controller(&MockProvider::failing())
        .run_folder(temp_dir.path(), false, &CancellationFlag::new())
        .await?;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.translated, 0);
    Ok(())
}

/// Test that an empty folder is an error
#[tokio::test]
async fn test_run_folder_withNoInputs_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "notes.txt", "hello")?;

    let result = controller(&MockProvider::working())
        .run_folder(temp_dir.path(), false, &CancellationFlag::new())
        .await;

    assert!(result.is_err());
    Ok(())
}

/// Test that a full run checks the provider before translating
#[tokio::test]
async fn test_run_withWorkingProvider_shouldTranslate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt", 5)?;

    controller(&MockProvider::working()).run(input, false).await?;

    assert_eq!(SubtitleDocument::from_file(temp_dir.path().join("episode.spa.srt"))?.len(), 5);
    Ok(())
}

/// Test that an unreachable provider stops the run before any request
#[tokio::test]
async fn test_run_withFailingConnection_shouldFailBeforeTranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt", 5)?;
    let provider = MockProvider::failing();

    let result = controller(&provider).run(input, false).await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 0);
    assert!(!temp_dir.path().join("episode.spa.srt").exists());
    Ok(())
}

/// Test that the shift command rewrites timings in place
#[test]
fn test_shift_withPositiveDelta_shouldRewriteFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 2)?;

    let count = Controller::shift(&input, 1500)?;

    assert_eq!(count, 2);
    let document = SubtitleDocument::from_file(&input)?;
    assert_eq!(document.entries[0].start_time_ms, 1500);
    assert_eq!(document.entries[1].end_time_ms, 5000);
    Ok(())
}

/// Test that a rename dry run leaves files untouched
#[test]
fn test_rename_withDryRun_shouldNotTouchFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "movie.eng.srt", "x")?;

    let report = Controller::rename(temp_dir.path(), &JellyfinFlags::default(), true, true)?;

    assert!(report.renamed.is_empty());
    assert!(temp_dir.path().join("movie.eng.srt").exists());
    assert!(!temp_dir.path().join("movie.en.srt").exists());
    Ok(())
}
