//! Error types for the md2pdf library.
//!
//! Every fatal condition is a variant of [`Md2PdfError`]. A conversion is a
//! single request-scoped unit of work, so there is no partial success to
//! report: either the whole document is produced or the caller gets one of
//! these variants.
//!
//! Callers that need to react by category (the HTTP surface maps categories
//! to status codes) use [`Md2PdfError::kind`] instead of matching on every
//! variant.

use std::path::PathBuf;
use thiserror::Error;

/// Message returned when the required Markdown/HTML field is absent or empty.
///
/// The HTTP surface sends this text verbatim as `{"error": "..."}`.
pub const MISSING_CONTENT_MESSAGE: &str = "Markdown content is missing";

/// All fatal errors returned by the md2pdf library.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The Markdown or HTML source was missing or empty.
    #[error("Markdown content is missing")]
    MissingContent,

    /// The request carried a script but script injection is not enabled.
    #[error("Script injection is disabled; enable it explicitly to run caller-supplied JavaScript")]
    ScriptsDisabled,

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The Markdown parser failed on the input.
    #[error("Failed to parse Markdown: {detail}")]
    Parse { detail: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The headless browser could not be started.
    #[error(
        "Failed to launch headless browser: {detail}\n\
Install Chrome or Chromium, or point --chrome / MD2PDF_CHROME at the executable."
    )]
    BrowserLaunch { detail: String },

    /// The document could not be loaded into the page.
    #[error("Failed to load document into the browser page: {detail}")]
    PageLoad { detail: String },

    /// The page never reached network idle within the load timeout.
    #[error("Page did not reach network idle within {secs}s ({inflight} request(s) still in flight)")]
    NetworkIdleTimeout { secs: u64, inflight: usize },

    /// The injected script threw or could not be evaluated.
    #[error("Injected script failed: {detail}")]
    Script { detail: String },

    /// The browser failed to print the page to PDF.
    #[error("PDF capture failed: {detail}")]
    PdfCapture { detail: String },

    /// The whole render (launch → load → script → capture) exceeded its budget.
    #[error("Rendering timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input file is not valid UTF-8 text.
    #[error("Input '{input}' is not valid UTF-8 text")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
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

/// Coarse classification of [`Md2PdfError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unacceptable (missing content, scripts disabled).
    Validation,
    /// The Markdown parser failed.
    Parse,
    /// The render engine failed to launch, load, run the script or capture.
    Render,
    /// The CLI input could not be read or downloaded.
    Input,
    /// The output could not be written.
    Output,
    /// The configuration was rejected.
    Config,
    /// Anything else.
    Internal,
}

impl Md2PdfError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Md2PdfError::MissingContent | Md2PdfError::ScriptsDisabled => ErrorKind::Validation,
            Md2PdfError::Parse { .. } => ErrorKind::Parse,
            Md2PdfError::BrowserLaunch { .. }
            | Md2PdfError::PageLoad { .. }
            | Md2PdfError::NetworkIdleTimeout { .. }
            | Md2PdfError::Script { .. }
            | Md2PdfError::PdfCapture { .. }
            | Md2PdfError::RenderTimeout { .. } => ErrorKind::Render,
            Md2PdfError::FileNotFound { .. }
            | Md2PdfError::PermissionDenied { .. }
            | Md2PdfError::InvalidInput { .. }
            | Md2PdfError::DownloadFailed { .. }
            | Md2PdfError::DownloadTimeout { .. } => ErrorKind::Input,
            Md2PdfError::OutputWriteFailed { .. } => ErrorKind::Output,
            Md2PdfError::InvalidConfig(_) => ErrorKind::Config,
            Md2PdfError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the error was caused by the caller's request rather than
    /// by the pipeline.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
