/*!
 * Error types for the subtrans library.
 *
 * Each stage of a translation run has its own error enum so callers can tell
 * a bad input file apart from a failed remote call or a failed final write.
 * Application glue (CLI, controller) wraps these in `anyhow`.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to a provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors raised while loading a subtitle file
#[derive(Error, Debug)]
pub enum ParseError {
    /// The input does not carry a subtitle extension
    #[error("Input file must be a .srt subtitle file: {0}")]
    WrongFileType(PathBuf),

    /// No encoding in the priority list produced a usable document
    #[error("Failed to load subtitle file with any supported encoding (tried {tried})")]
    UnsupportedEncoding {
        /// Comma separated list of the encodings attempted
        tried: String,
    },

    /// Decoding with the requested encoding failed
    #[error("Content is not valid {0}")]
    Decode(&'static str),

    /// The decoded text contains no subtitle entries
    #[error("No valid subtitle entries were found")]
    NoEntries,

    /// The file could not be read
    #[error("Failed to read subtitle file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Non-transient error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Transient failures persisted until the retry budget ran out
    #[error("Translation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: String,
    },

    /// The provider answered, but not with a usable payload
    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    /// The translation service could not be built from configuration
    #[error("Invalid translation configuration: {0}")]
    Config(String),
}

impl TranslationError {
    /// Whether the retry loop should try the call again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
            Self::MalformedResponse(_) => true,
            Self::RetriesExhausted { .. } | Self::Config(_) => false,
        }
    }
}

/// Errors that terminate a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input document could not be loaded
    #[error("Subtitle error: {0}")]
    Parse(#[from] ParseError),

    /// A batch failed terminally
    #[error("Batch {batch} failed: {source}")]
    Translation {
        /// 1-based batch number
        batch: usize,
        #[source]
        source: TranslationError,
    },

    /// Merged results did not cover every entry
    #[error("Translated {actual} of {expected} entries")]
    IncompleteResults { expected: usize, actual: usize },

    /// Every batch succeeded but the output could not be written
    #[error("Failed to write translated subtitles to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
