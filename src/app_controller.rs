use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::app_config::Config;
use crate::file_utils::{FileManager, FileType, VIDEO_EXTENSIONS};
use crate::jellyfin::{JellyfinFlags, JellyfinRenamer, RenameReport};
use crate::language_utils;
use crate::providers::Provider;
use crate::subtitle_extractor::{self, SubtitleExtractor, SubtitleStream};
use crate::subtitle_processor::SubtitleDocument;
use crate::translation::{CancellationFlag, JobOutcome, TranslationPipeline, TranslationService};

// @module: Application controller for the command-line front end

/// What happened to one input file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Translated { output_path: PathBuf, entries: usize },
    Skipped,
    Cancelled,
}

/// Counters for a folder run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Main application controller for subtitle translation
pub struct Controller {
    config: Config,
    service: TranslationService,
    extractor: SubtitleExtractor,
    show_progress: bool,
}

impl Controller {
    /// Build a controller whose provider comes from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let service = TranslationService::new(&config.translation)
            .context("Failed to create translation service")?;
        Ok(Self::assemble(config, service))
    }

    /// Build a controller around an existing provider
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        let service = TranslationService::with_provider(provider, &config.translation);
        Self::assemble(config, service)
    }

    fn assemble(config: Config, service: TranslationService) -> Self {
        Self {
            config,
            service,
            extractor: SubtitleExtractor::default(),
            show_progress: true,
        }
    }

    /// Disable progress bars, e.g. when output is not a terminal
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate a file or every eligible file in a folder; Ctrl-C cancels the run
    pub async fn run(&self, input_path: PathBuf, force_overwrite: bool) -> Result<()> {
        if !input_path.exists() {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        }

        self.service
            .test_connection()
            .await
            .context("Translation provider is not reachable")?;
        debug!("Provider connection verified");

        let cancel = CancellationFlag::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling translation");
                    cancel.cancel();
                }
            })
        };

        let start_time = Instant::now();
        let result = if input_path.is_dir() {
            self.run_folder(&input_path, force_overwrite, &cancel).await.map(|summary| {
                info!(
                    "Folder processing completed: {} translated, {} skipped, {} errors",
                    summary.translated, summary.skipped, summary.failed
                );
            })
        } else {
            self.run_file(&input_path, force_overwrite, &cancel).await.map(|_| ())
        };
        interrupt.abort();

        let usage = self.service.token_usage();
        if usage.requests > 0 {
            info!("{}", usage.summary());
        }
        info!("Finished in {}", Self::format_duration(start_time.elapsed()));

        result
    }

    /// Translate one subtitle or video file
    pub async fn run_file(&self, input_file: &Path, force_overwrite: bool, cancel: &CancellationFlag) -> Result<FileOutcome> {
        let code = language_utils::output_language_code(&self.config.target_language);

        if !force_overwrite && FileManager::check_existing_translation(input_file, &code) {
            warn!(
                "Skipping {}, translation already exists (use --force to overwrite)",
                input_file.display()
            );
            return Ok(FileOutcome::Skipped);
        }

        let document = match FileManager::detect_file_type(input_file)? {
            FileType::Subtitle => SubtitleDocument::from_file(input_file)
                .with_context(|| format!("Failed to load subtitles: {}", input_file.display()))?,
            FileType::Video => self.load_from_video(input_file).await?,
            FileType::Unknown => {
                return Err(anyhow!("Unsupported input file: {}", input_file.display()));
            }
        };

        let output_path = TranslationPipeline::output_path_for(input_file, &self.config.target_language);
        self.translate_document(document, output_path, cancel).await
    }

    /// Translate every video and subtitle file under `input_dir`
    pub async fn run_folder(&self, input_dir: &Path, force_overwrite: bool, cancel: &CancellationFlag) -> Result<FolderSummary> {
        let inputs = self.collect_folder_inputs(input_dir)?;
        if inputs.is_empty() {
            return Err(anyhow!("No video or subtitle files found in directory: {:?}", input_dir));
        }
        info!("Found {} files to process in {}", inputs.len(), input_dir.display());

        let mut summary = FolderSummary::default();
        for input in &inputs {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match self.run_file(input, force_overwrite, cancel).await {
                Ok(FileOutcome::Translated { .. }) => summary.translated += 1,
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Ok(FileOutcome::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", input.display(), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Videos and source subtitles in `input_dir`, leaving out our own outputs and extraction artifacts
    fn collect_folder_inputs(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let code = language_utils::output_language_code(&self.config.target_language);
        let mut inputs = Vec::new();
        for ext in VIDEO_EXTENSIONS {
            inputs.extend(FileManager::find_files(input_dir, ext)?);
        }

        let subtitles = FileManager::find_files(input_dir, "srt")?;
        inputs.extend(subtitles.into_iter().filter(|path| {
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            let generated = stem.contains("_stream_")
                || stem.ends_with(&format!(".{}", code))
                || stem.ends_with(&format!("_{}", code));
            if generated {
                debug!("Ignoring generated subtitle file {}", path.display());
            }
            !generated
        }));

        inputs.sort();
        Ok(inputs)
    }

    /// Extract the English text stream of a video and load it
    async fn load_from_video(&self, video: &Path) -> Result<SubtitleDocument> {
        SubtitleExtractor::check_ffmpeg().await?;
        let streams = self.extractor.list_subtitle_streams(video).await?;
        let stream = subtitle_extractor::find_english_stream(&streams)
            .ok_or_else(|| anyhow!("No English text subtitle stream found in {}", video.display()))?;

        info!("Using subtitle stream {} ({}) from {}", stream.index, stream.title, video.display());
        let extracted = self.extractor.extract_stream(video, stream, None).await?;
        SubtitleDocument::from_file(&extracted)
            .with_context(|| format!("Failed to load extracted subtitles: {}", extracted.display()))
    }

    async fn translate_document(
        &self,
        document: SubtitleDocument,
        output_path: PathBuf,
        cancel: &CancellationFlag,
    ) -> Result<FileOutcome> {
        let progress_bar = self.progress_bar();
        let pipeline = self.pipeline(&progress_bar);
        let job = pipeline.create_job(document, &self.config.target_language, output_path, cancel.clone());

        info!(
            "{} - {}: translating {} entries into {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            job.entry_count(),
            language_utils::display_language_name(&self.config.target_language)
        );

        let started = Instant::now();
        let result = pipeline.run_job(&job).await;
        progress_bar.finish_and_clear();

        match result? {
            JobOutcome::Completed { output_path, entries } => {
                info!(
                    "Success: {} ({} entries in {})",
                    output_path.display(),
                    entries,
                    Self::format_duration(started.elapsed())
                );
                Ok(FileOutcome::Translated { output_path, entries })
            }
            JobOutcome::Cancelled => Ok(FileOutcome::Cancelled),
        }
    }

    fn pipeline(&self, progress_bar: &ProgressBar) -> TranslationPipeline {
        let progress = progress_bar.clone();
        let status = progress_bar.clone();

        TranslationPipeline::new(Arc::new(self.service.clone()), self.config.pipeline.clone())
            .with_progress_sink(Arc::new(move |percent: f64| {
                progress.set_position(percent.round() as u64);
            }))
            .with_status_sink(Arc::new(move |message: &str| {
                debug!("{}", message);
                status.set_message(message.to_string());
            }))
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Subtitle streams in a video file
    pub async fn list_streams(video: &Path) -> Result<Vec<SubtitleStream>> {
        let streams = SubtitleExtractor::default().list_subtitle_streams(video).await?;
        if streams.is_empty() {
            warn!("No subtitle streams found in {}", video.display());
        }
        for stream in &streams {
            info!(
                "Stream {}: {} [{}] {}{}",
                stream.index,
                stream.language,
                stream.codec,
                stream.title,
                if stream.is_bitmap() { " (bitmap)" } else { "" }
            );
        }
        Ok(streams)
    }

    /// Extract one stream, or the English one when `index` is `None`
    pub async fn extract(video: &Path, index: Option<usize>) -> Result<PathBuf> {
        SubtitleExtractor::check_ffmpeg().await?;
        let extractor = SubtitleExtractor::default();
        let streams = extractor.list_subtitle_streams(video).await?;

        let stream = match index {
            Some(index) => streams
                .iter()
                .find(|s| s.index == index)
                .ok_or_else(|| anyhow!("Stream {} not found in {}", index, video.display()))?,
            None => subtitle_extractor::find_english_stream(&streams)
                .ok_or_else(|| anyhow!("No English text subtitle stream found in {}", video.display()))?,
        };

        let output = extractor.extract_stream(video, stream, None).await?;
        info!("Success: {}", output.display());
        Ok(output)
    }

    /// Rename subtitles in `folder` to Jellyfin names, or only list the changes on a dry run
    pub fn rename(folder: &Path, flags: &JellyfinFlags, cleanup_originals: bool, dry_run: bool) -> Result<RenameReport> {
        if !FileManager::dir_exists(folder) {
            return Err(anyhow!("Folder does not exist: {:?}", folder));
        }

        if dry_run {
            let changes = JellyfinRenamer::preview_changes(folder, flags)?;
            if changes.is_empty() {
                info!("All subtitle files already follow Jellyfin naming");
            }
            for (old, new) in &changes {
                info!("{} -> {}", old, new);
            }
            return Ok(RenameReport::default());
        }

        let report = JellyfinRenamer::rename_subtitles(folder, flags, cleanup_originals)?;
        info!(
            "Renamed {} files, removed {} originals, {} errors",
            report.renamed.len(),
            report.deleted.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Shift every timing in an SRT file and rewrite it in place
    pub fn shift(path: &Path, delta_ms: i64) -> Result<usize> {
        let mut document = SubtitleDocument::from_file(path)
            .with_context(|| format!("Failed to load subtitles: {}", path.display()))?;
        document.shift(delta_ms);
        document
            .write_to_srt(path)
            .with_context(|| format!("Failed to write subtitles: {}", path.display()))?;

        info!("Shifted {} entries by {} ms in {}", document.len(), delta_ms, path.display());
        Ok(document.len())
    }

    // Format duration as "1h 2m 3s", "2m 3s" or "3.042s"
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
