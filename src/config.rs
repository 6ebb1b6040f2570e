//! Configuration types for Markdown/HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The HTTP service and the CLI both
//! construct one at startup and hand it to every conversion, so nothing the
//! pipeline reads lives in process-wide mutable state.

use crate::error::Md2PdfError;
use crate::pipeline::render::RenderEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Title used when neither the request nor the document front matter has one.
pub const DEFAULT_TITLE: &str = "Document";

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2pdf::{ConversionConfig, PageFormat};
///
/// let config = ConversionConfig::builder()
///     .page_format(PageFormat::Letter)
///     .landscape(true)
///     .include_toc(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Stylesheet placed before any request CSS. `None` selects the built-in
    /// default stylesheet ([`crate::pipeline::assemble::DEFAULT_CSS`]).
    pub base_css: Option<String>,

    /// Paper size for PDF output. Default: [`PageFormat::A4`] on every path.
    pub page_format: PageFormat,

    /// Print in landscape orientation. Default: false.
    pub landscape: bool,

    /// Print CSS backgrounds (code block shading, table stripes). Default: true.
    pub print_background: bool,

    /// Page margins in inches. Default: 0.4 on every side.
    pub margins: PageMargins,

    /// Markdown extensions enabled in the parser.
    pub markdown: MarkdownOptions,

    /// Prepend a `<nav class="toc">` table of contents built from headings. Default: false.
    pub include_toc: bool,

    /// Allow caller-supplied JavaScript to run inside the page before capture. Default: false.
    ///
    /// The script runs with full page privileges and is neither sandboxed nor
    /// validated. Only enable this when every caller is trusted.
    pub allow_scripts: bool,

    /// Quiet window (ms) with zero in-flight requests that counts as network idle. Default: 500.
    pub network_idle_ms: u64,

    /// Upper bound (s) on waiting for network idle after the content is set. Default: 30.
    pub load_timeout_secs: u64,

    /// Upper bound (s) on one whole render: launch, load, script, capture. Default: 90.
    pub render_timeout_secs: u64,

    /// Explicit Chrome/Chromium executable. `None` lets the engine auto-detect.
    pub chrome_executable: Option<PathBuf>,

    /// Run the browser with its sandbox enabled. Default: false (`--no-sandbox`),
    /// which is what containerised deployments without user namespaces need.
    pub sandbox: bool,

    /// Title used when a request and its front matter have none. Default: [`DEFAULT_TITLE`].
    pub default_title: String,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Pre-constructed render engine. Takes precedence over the Chromium
    /// settings above.
    pub engine: Option<Arc<dyn RenderEngine>>,

    /// Receives stage events as the pipeline runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            base_css: None,
            page_format: PageFormat::default(),
            landscape: false,
            print_background: true,
            margins: PageMargins::default(),
            markdown: MarkdownOptions::default(),
            include_toc: false,
            allow_scripts: false,
            network_idle_ms: 500,
            load_timeout_secs: 30,
            render_timeout_secs: 90,
            chrome_executable: None,
            sandbox: false,
            default_title: DEFAULT_TITLE.to_string(),
            download_timeout_secs: 60,
            engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("base_css", &self.base_css.as_ref().map(|c| c.len()))
            .field("page_format", &self.page_format)
            .field("landscape", &self.landscape)
            .field("print_background", &self.print_background)
            .field("margins", &self.margins)
            .field("markdown", &self.markdown)
            .field("include_toc", &self.include_toc)
            .field("allow_scripts", &self.allow_scripts)
            .field("network_idle_ms", &self.network_idle_ms)
            .field("load_timeout_secs", &self.load_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field("sandbox", &self.sandbox)
            .field("default_title", &self.default_title)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

/// Upper bound for every timeout setter: one day.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

impl ConversionConfigBuilder {
    pub fn base_css(mut self, css: impl Into<String>) -> Self {
        self.config.base_css = Some(css.into());
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.config.page_format = format;
        self
    }

    pub fn landscape(mut self, v: bool) -> Self {
        self.config.landscape = v;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print_background = v;
        self
    }

    pub fn margins(mut self, margins: PageMargins) -> Self {
        self.config.margins = margins;
        self
    }

    pub fn markdown(mut self, options: MarkdownOptions) -> Self {
        self.config.markdown = options;
        self
    }

    pub fn include_toc(mut self, v: bool) -> Self {
        self.config.include_toc = v;
        self
    }

    pub fn allow_scripts(mut self, v: bool) -> Self {
        self.config.allow_scripts = v;
        self
    }

    pub fn network_idle_ms(mut self, ms: u64) -> Self {
        self.config.network_idle_ms = ms.clamp(50, 10_000);
        self
    }

    pub fn load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.load_timeout_secs = secs.min(MAX_TIMEOUT_SECS);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.min(MAX_TIMEOUT_SECS);
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn sandbox(mut self, v: bool) -> Self {
        self.config.sandbox = v;
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.min(MAX_TIMEOUT_SECS);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if c.load_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Load timeout must be ≥ 1 second".into(),
            ));
        }
        if c.render_timeout_secs < c.load_timeout_secs {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Render timeout ({}s) must not be shorter than the load timeout ({}s)",
                c.render_timeout_secs, c.load_timeout_secs
            )));
        }
        if !c.margins.is_valid() {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Margins must be between 0 and 3 inches, got {:?}",
                c.margins
            )));
        }
        if c.default_title.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "Default title must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Paper size for PDF output.
///
/// A4 is the default for the CLI and the HTTP service alike, so the same
/// document renders identically through both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    A3,
    /// 210 × 297 mm (default)
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PageFormat {
    /// Portrait paper size in inches as `(width, height)`.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            PageFormat::A3 => (11.69, 16.54),
            PageFormat::A4 => (8.27, 11.69),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
        }
    }
}

impl FromStr for PageFormat {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a3" => Ok(PageFormat::A3),
            "a4" => Ok(PageFormat::A4),
            "a5" => Ok(PageFormat::A5),
            "letter" => Ok(PageFormat::Letter),
            "legal" => Ok(PageFormat::Legal),
            "tabloid" => Ok(PageFormat::Tabloid),
            other => Err(Md2PdfError::InvalidConfig(format!(
                "Unknown page format '{other}' (expected a3, a4, a5, letter, legal or tabloid)"
            ))),
        }
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::uniform(0.4)
    }
}

impl PageMargins {
    /// Same margin on all four sides.
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }

    fn is_valid(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|m| m.is_finite() && (0.0..=3.0).contains(m))
    }
}

/// Markdown extensions enabled in the parser.
///
/// Everything is on by default except heading attributes (`# Title {#id}`),
/// which change how some plain headings are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub smart_punctuation: bool,
    pub heading_attributes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            smart_punctuation: true,
            heading_attributes: false,
        }
    }
}
