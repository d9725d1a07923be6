//! Error types for the trlscope library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the report cannot be produced at all
//!   (unreadable PDF, missing credentials, LLM API failure). Returned as
//!   `Err(ReportError)` from the top-level `generate_report*` functions.
//!
//! * [`SearchError`] — **Non-fatal**: a single web search failed. Search
//!   failures never cross the pipeline boundary; the agent loop renders them
//!   into an observation string that is fed back to the model, so the
//!   research step can still complete on whatever the model already knows.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the trlscope library.
///
/// Search-level failures use [`SearchError`] and are absorbed by the agent
/// loop rather than propagated here.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not open or read the document.
    #[error("Failed to extract text from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// The extracted text is too short to analyse — the document is likely
    /// image-only or corrupt.
    #[error(
        "Extracted only {chars} characters of text (minimum: {min}).\n\
         The PDF likely contains scanned images rather than selectable text."
    )]
    InsufficientText { chars: usize, min: usize },

    // ── Credential errors ─────────────────────────────────────────────────
    /// A required API key could not be found in any source of the lookup
    /// chain. Raised before any network call is attempted.
    #[error("Missing credentials: {hint}")]
    MissingCredentials { hint: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The chat API returned a non-retryable error, or retries ran out.
    #[error("LLM API error: {message}")]
    LlmApi { message: String },

    /// The chat API rejected the key (401/403) — retry will not help.
    #[error("Authentication failed against the LLM API: {detail}")]
    AuthFailed { detail: String },

    /// HTTP 429 survived every retry — caller should back off.
    #[error("LLM API rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A chat API call timed out.
    #[error("LLM API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error from the web-search tool.
///
/// The agent loop converts these into observation text for the model
/// instead of aborting the pipeline.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The search API request failed (network or HTTP-level).
    #[error("search request failed: {0}")]
    RequestFailed(String),

    /// HTTP 429 from the search API.
    #[error("search API quota exceeded")]
    QuotaExceeded,

    /// The search request timed out.
    #[error("search request timed out")]
    Timeout,

    /// The search API rejected the key.
    #[error("search API key rejected")]
    InvalidApiKey,

    /// Client-side configuration problem.
    #[error("search configuration error: {0}")]
    Config(String),
}
