//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through parsing, assembly and rendering.
//! Rendering dominates wall-clock time (browser launch plus network idle),
//! so the CLI uses these events to keep a spinner honest about what it is
//! waiting for.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl ConversionProgressCallback for StageLogger {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} finished in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::request::ConversionMode;
use std::fmt;
use std::sync::Arc;

/// One step of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Markdown → HTML fragment.
    Parse,
    /// Fragment + title + CSS → full HTML document.
    Assemble,
    /// HTML document → PDF bytes in the render engine.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Assemble => "assemble",
            Stage::Render => "render",
        })
    }
}

/// Called by the conversion pipeline as it runs.
///
/// Implementations must be `Send + Sync`: the HTTP service runs many
/// conversions concurrently and they may share one callback. All methods
/// have default no-op implementations so callers only override what they
/// care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_conversion_start(&self, mode: ConversionMode) {
        let _ = mode;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once after the output has been produced.
    ///
    /// # Arguments
    /// * `output_bytes`: size of the produced HTML or PDF
    fn on_conversion_complete(&self, output_bytes: usize) {
        let _ = output_bytes;
    }

    /// Called once when the conversion fails.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
