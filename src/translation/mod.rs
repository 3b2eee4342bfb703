/*!
 * Translation of subtitle entries through AI providers.
 *
 * - `core`: the translation client (`TranslationService`) and the `Translator` trait
 * - `payload`: id-tagged request/response format and its validation
 * - `retry`: exponential backoff policy
 * - `rate_limit`: minimum spacing between outbound calls
 * - `batch`: fixed-size batching of subtitle entries
 * - `pipeline`: batch scheduling, progress, cancellation and output
 */

// Re-export main types for easier usage
pub use self::batch::Batch;
pub use self::core::{TokenUsageStats, TranslationService, Translator};
pub use self::pipeline::{CancellationFlag, JobOutcome, JobStatus, TranslationJob, TranslationPipeline};
pub use self::rate_limit::RateGate;
pub use self::retry::RetryPolicy;

// Submodules
pub mod batch;
pub mod core;
pub mod payload;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
