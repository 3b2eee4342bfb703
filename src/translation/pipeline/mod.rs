/*!
 * Batch translation pipeline.
 *
 * The pipeline loads a subtitle document, slices it into fixed-size batches,
 * translates them with bounded concurrency, and writes the merged result next
 * to the input as `<stem>.<code>.srt`. Each run is a [`TranslationJob`] that
 * owns its progress, partial results and cancellation flag.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::app_config::PipelineConfig;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::subtitle_processor::SubtitleDocument;

use super::core::Translator;

pub mod job;
pub mod progress;

pub use self::job::{CancellationFlag, JobOutcome, JobStatus, TranslationJob};
pub use self::progress::{ProgressSink, ProgressSnapshot, ProgressTracker, StatusSink};

/// Entry point that turns subtitle files into translated subtitle files
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    progress_sink: Option<ProgressSink>,
    status_sink: Option<StatusSink>,
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig) -> Self {
        Self {
            translator,
            config,
            progress_sink: None,
            status_sink: None,
        }
    }

    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn with_status_sink(mut self, sink: StatusSink) -> Self {
        self.status_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Where the translation of `input` into `target_language` is written
    pub fn output_path_for(input: &Path, target_language: &str) -> PathBuf {
        let code = language_utils::output_language_code(target_language);
        FileManager::generate_output_path(input, &code)
    }

    /// Prepare a job for an already loaded document
    pub fn create_job(
        &self,
        document: SubtitleDocument,
        target_language: &str,
        output_path: PathBuf,
        cancel: CancellationFlag,
    ) -> TranslationJob {
        TranslationJob::new(
            document,
            target_language,
            output_path,
            &self.config,
            cancel,
            self.progress_sink.clone(),
            self.status_sink.clone(),
        )
    }

    /// Run a prepared job
    pub async fn run_job(&self, job: &TranslationJob) -> Result<JobOutcome, PipelineError> {
        job.run(self.translator.as_ref()).await
    }

    /// Load `input`, translate it and write `<stem>.<code>.srt` next to it
    pub async fn translate_file(
        &self,
        input: &Path,
        target_language: &str,
        cancel: CancellationFlag,
    ) -> Result<JobOutcome, PipelineError> {
        let document = match SubtitleDocument::from_file(input) {
            Ok(document) => document,
            Err(e) => {
                if let Some(sink) = &self.status_sink {
                    sink(&format!("Failed to load {}: {}", input.display(), e));
                }
                return Err(e.into());
            }
        };

        info!(
            "Loaded {} entries from {} ({})",
            document.len(),
            input.display(),
            document.encoding
        );

        let output_path = Self::output_path_for(input, target_language);
        let job = self.create_job(document, target_language, output_path, cancel);
        self.run_job(&job).await
    }
}
