//! # md2pdf
//!
//! Convert Markdown (or ready-made HTML) into a styled HTML document or a
//! PDF printed by headless Chromium.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown / HTML
//!  │
//!  ├─ 1. Normalize  strip BOM and zero-width chars, CRLF → LF, front matter
//!  ├─ 2. Parse      pulldown-cmark → HTML fragment (+ optional TOC)
//!  ├─ 3. Assemble   title + stylesheet + fragment → complete document
//!  └─ 4. Render     headless Chromium: load, network idle, script, print
//! ```
//!
//! HTML → PDF skips steps 1–3 and prints the caller's HTML verbatim.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{markdown_to_pdf, ConversionConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let request = ConversionRequest::new("# Hello\n\nWorld").title("Greeting");
//!     let output = markdown_to_pdf(request, &config).await?;
//!     std::fs::write("hello.pdf", &output.bytes)?;
//!     eprintln!("rendered in {}ms", output.stats.render_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`] and the `md2pdf-server` binary (axum) |
//!
//! Disable both when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Scripts
//!
//! A request may carry JavaScript to run in the page before capture. It runs
//! with full page privileges, so it is refused with
//! [`Md2PdfError::ScriptsDisabled`] unless
//! [`ConversionConfig::allow_scripts`] is set.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, MarkdownOptions, PageFormat, PageMargins};
pub use convert::{
    convert, convert_file, convert_sync, html_to_pdf, markdown_to_html, markdown_to_pdf,
    FileConversion, FileOptions,
};
pub use error::{ErrorKind, Md2PdfError};
pub use output::{ConversionOutput, ConversionStats, OutputFormat};
pub use pipeline::chromium::ChromiumEngine;
pub use pipeline::render::{InstanceGauge, PdfOptions, RenderEngine, RenderJob};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use request::{ConversionMode, ConversionRequest};
