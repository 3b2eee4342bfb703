/*!
 * # subtrans - batch subtitle translation with AI
 *
 * A Rust library for translating SRT subtitles through chat-style AI providers.
 *
 * ## Features
 *
 * - Parse SRT files in UTF-8, Windows-1252 or Latin-1
 * - Translate subtitles using various AI providers:
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Ollama (local LLM)
 * - Fixed-size batches translated with bounded concurrency
 * - Id-tagged requests so translations are matched back by id, never by position
 * - Retries with exponential backoff and request spacing
 * - Progress reporting and cooperative cancellation
 * - Atomic output writing
 * - Subtitle stream extraction from videos (ffmpeg) and Jellyfin renaming
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing, cleaning and serialization
 * - `translation`: AI-powered translation:
 *   - `translation::core`: Translation client and the `Translator` trait
 *   - `translation::payload`: Id-tagged request/response format
 *   - `translation::pipeline`: Batch scheduling, progress and cancellation
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for LLM providers
 * - `subtitle_extractor`: ffprobe/ffmpeg stream extraction
 * - `jellyfin`: Jellyfin subtitle naming
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod jellyfin;
pub mod language_utils;
pub mod providers;
pub mod subtitle_extractor;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{ParseError, PipelineError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use subtitle_processor::{SubtitleDocument, SubtitleEntry};
pub use translation::{CancellationFlag, JobOutcome, JobStatus, TranslationPipeline, TranslationService, Translator};
