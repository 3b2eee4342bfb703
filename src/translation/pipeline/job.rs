/*!
 * A single translation run over one subtitle document.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::app_config::PipelineConfig;
use crate::errors::{PipelineError, TranslationError};
use crate::subtitle_processor::{SubtitleDocument, SubtitleEntry};
use crate::translation::batch::{self, Batch};
use crate::translation::core::Translator;

use super::progress::{ProgressSink, ProgressSnapshot, ProgressTracker, StatusSink};

/// Lifecycle of a translation job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Cooperative cancellation shared between a job and whoever may stop it
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a job ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Every entry was translated and written
    Completed { output_path: PathBuf, entries: usize },
    /// The run was stopped and nothing was written
    Cancelled,
}

/// Per-run state: the working entries, progress, partial results and status
pub struct TranslationJob {
    document: SubtitleDocument,
    target_language: String,
    output_path: PathBuf,
    batch_size: usize,
    concurrency: usize,
    cancel: CancellationFlag,
    progress: ProgressTracker,
    results: Mutex<BTreeMap<usize, String>>,
    status: Mutex<JobStatus>,
}

impl TranslationJob {
    /// Create a job over `document`; the block limit is applied here, before batching
    pub fn new(
        mut document: SubtitleDocument,
        target_language: &str,
        output_path: PathBuf,
        config: &PipelineConfig,
        cancel: CancellationFlag,
        progress_sink: Option<ProgressSink>,
        status_sink: Option<StatusSink>,
    ) -> Self {
        document.truncate(config.block_limit);

        let batch_size = config.batch_size.max(1);
        let total = document.len();
        let progress = ProgressTracker::new(
            total,
            batch::batch_count(total, batch_size),
            progress_sink,
            status_sink,
        );

        Self {
            document,
            target_language: target_language.to_string(),
            output_path,
            batch_size,
            concurrency: config.concurrency.max(1),
            cancel,
            progress,
            results: Mutex::new(BTreeMap::new()),
            status: Mutex::new(JobStatus::Idle),
        }
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn entry_count(&self) -> usize {
        self.document.len()
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    fn set_status(&self, status: JobStatus) {
        debug!("Job status -> {:?}", status);
        *self.status.lock() = status;
    }

    /// Run the job to a terminal state
    pub async fn run(&self, translator: &dyn Translator) -> Result<JobOutcome, PipelineError> {
        self.set_status(JobStatus::Running);

        let batches = batch::partition(&self.document.entries, self.batch_size);
        self.progress.status(&format!(
            "Translating {} entries in {} batches",
            self.document.len(),
            batches.len()
        ));

        if let Err(e) = self.dispatch(translator, batches).await {
            error!("{}", e);
            self.progress.status(&format!("Translation failed: {}", e));
            self.set_status(JobStatus::Failed);
            return Err(e);
        }

        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }

        let merged = match self.merge() {
            Ok(merged) => merged,
            Err(e) => {
                self.progress.status(&format!("Translation failed: {}", e));
                self.set_status(JobStatus::Failed);
                return Err(e);
            }
        };

        // Last checkpoint before anything touches the disk
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }

        if let Err(source) = merged.write_to_srt(&self.output_path) {
            let e = PipelineError::Output {
                path: self.output_path.clone(),
                source,
            };
            error!("{}", e);
            self.progress.status(&format!("Failed to write output: {}", e));
            self.set_status(JobStatus::Failed);
            return Err(e);
        }

        let entries = merged.len();
        info!("Wrote {} translated entries to {}", entries, self.output_path.display());
        self.progress.finish(&format!(
            "Translation complete: {} entries written to {}",
            entries,
            self.output_path.display()
        ));
        self.set_status(JobStatus::Completed);

        Ok(JobOutcome::Completed {
            output_path: self.output_path.clone(),
            entries,
        })
    }

    fn cancelled(&self) -> JobOutcome {
        warn!("Translation cancelled, no output written");
        self.progress.status("Translation cancelled");
        self.set_status(JobStatus::Cancelled);
        JobOutcome::Cancelled
    }

    /// Dispatch batches with bounded concurrency, stopping at the first failure or cancellation
    async fn dispatch(&self, translator: &dyn Translator, batches: Vec<Batch>) -> Result<(), PipelineError> {
        let mut completions = stream::iter(batches)
            .map(|batch| self.translate_batch(translator, batch))
            .buffer_unordered(self.concurrency);

        while let Some(completion) = completions.next().await {
            if let Some((batch, translations)) = completion? {
                self.store(&batch, translations);
            }

            if self.cancel.is_cancelled() {
                debug!("Cancellation requested, abandoning remaining batches");
                break;
            }
        }

        Ok(())
    }

    async fn translate_batch(
        &self,
        translator: &dyn Translator,
        batch: Batch,
    ) -> Result<Option<(Batch, Vec<String>)>, PipelineError> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        debug!(
            "Batch {} started ({} entries from offset {})",
            batch.number,
            batch.len(),
            batch.offset
        );

        let texts = batch.cleaned_texts();
        let translations = translator
            .translate(&texts, &self.target_language)
            .await
            .map_err(|source| PipelineError::Translation {
                batch: batch.number,
                source,
            })?;

        if translations.len() != batch.len() {
            return Err(PipelineError::Translation {
                batch: batch.number,
                source: TranslationError::MalformedResponse(format!(
                    "expected {} translations, got {}",
                    batch.len(),
                    translations.len()
                )),
            });
        }

        Ok(Some((batch, translations)))
    }

    fn store(&self, batch: &Batch, translations: Vec<String>) {
        {
            let mut results = self.results.lock();
            for (entry, text) in batch.entries.iter().zip(translations) {
                results.insert(entry.seq_num, text);
            }
        }
        self.progress.record_batch(batch.len());
    }

    /// Join translations back onto their entries in original index order
    fn merge(&self) -> Result<SubtitleDocument, PipelineError> {
        let results = self.results.lock();
        let entries = &self.document.entries;

        if results.len() != entries.len() {
            return Err(PipelineError::IncompleteResults {
                expected: entries.len(),
                actual: results.len(),
            });
        }

        let mut merged: Vec<SubtitleEntry> = Vec::with_capacity(entries.len());
        for (seq_num, text) in results.iter() {
            let Ok(position) = entries.binary_search_by_key(seq_num, |e| e.seq_num) else {
                return Err(PipelineError::IncompleteResults {
                    expected: entries.len(),
                    actual: merged.len(),
                });
            };
            // A source that cleans to nothing keeps its original text
            let original = &entries[position];
            let text = if text.is_empty() { original.text.clone() } else { text.clone() };
            merged.push(SubtitleEntry {
                text,
                ..original.clone()
            });
        }

        Ok(SubtitleDocument::new(
            self.output_path.clone(),
            merged,
            self.document.encoding,
        ))
    }
}
