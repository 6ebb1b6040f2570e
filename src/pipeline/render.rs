//! The render-engine seam: complete HTML document → PDF bytes.
//!
//! The pipeline never talks to a browser directly. It builds a [`RenderJob`]
//! and hands it to a [`RenderEngine`]; [`crate::pipeline::chromium`] is the
//! production implementation and tests substitute their own.
//!
//! ## Instance lifetime
//!
//! An engine launches its browser per job and must release it before
//! `render_pdf` returns, on success, on error, and when the future is
//! dropped by [`render_with_timeout`]. [`InstanceGauge`] counts live
//! instances so that guarantee can be asserted.

use crate::config::{ConversionConfig, PageMargins};
use crate::error::Md2PdfError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Print settings handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    /// Paper width in inches, orientation already applied.
    pub paper_width: f64,
    /// Paper height in inches, orientation already applied.
    pub paper_height: f64,
    pub landscape: bool,
    pub print_background: bool,
    pub margins: PageMargins,
}

impl PdfOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        let (width, height) = config.page_format.dimensions_in();
        let (paper_width, paper_height) = if config.landscape {
            (height, width)
        } else {
            (width, height)
        };
        Self {
            paper_width,
            paper_height,
            landscape: config.landscape,
            print_background: config.print_background,
            margins: config.margins,
        }
    }
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

/// One document to print.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Complete HTML document, loaded as the page content.
    pub html: String,
    /// Script evaluated after network idle and before capture. Already
    /// cleared by the script gate.
    pub script: Option<String>,
    pub pdf: PdfOptions,
    /// Quiet window with zero in-flight requests that counts as idle.
    pub network_idle: Duration,
    /// Upper bound on waiting for network idle.
    pub load_timeout: Duration,
}

impl RenderJob {
    pub fn new(html: String, script: Option<String>, config: &ConversionConfig) -> Self {
        Self {
            html,
            script,
            pdf: PdfOptions::from_config(config),
            network_idle: Duration::from_millis(config.network_idle_ms),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
        }
    }
}

/// Prints an HTML document to PDF.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Load `job.html`, wait for network idle, run the script if any, and
    /// print to PDF.
    async fn render_pdf(&self, job: RenderJob) -> Result<Vec<u8>, Md2PdfError>;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Live-instance counter shared by every render on this engine, if the
    /// engine keeps one.
    fn instances(&self) -> Option<InstanceGauge> {
        None
    }
}

/// Run a render under an overall deadline.
///
/// On expiry the render future is dropped, which releases the engine's
/// browser through its guards, and [`Md2PdfError::RenderTimeout`] is returned.
pub async fn render_with_timeout(
    engine: &dyn RenderEngine,
    job: RenderJob,
    timeout: Duration,
) -> Result<Vec<u8>, Md2PdfError> {
    match tokio::time::timeout(timeout, engine.render_pdf(job)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(engine = engine.name(), "Render exceeded {}s", timeout.as_secs());
            Err(Md2PdfError::RenderTimeout {
                secs: timeout.as_secs(),
            })
        }
    }
}

// ── Instance accounting ──────────────────────────────────────────────────

/// Counts live render instances. Cloning shares the count.
#[derive(Debug, Clone, Default)]
pub struct InstanceGauge(Arc<AtomicUsize>);

impl InstanceGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new instance; it stays counted until the guard is dropped.
    pub fn acquire(&self) -> InstanceGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InstanceGuard(Arc::clone(&self.0))
    }

    /// Instances currently alive.
    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements its [`InstanceGauge`] on drop.
#[derive(Debug)]
pub struct InstanceGuard(Arc<AtomicUsize>);

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
