//! Conversion entry points.
//!
//! [`convert`] runs one [`ConversionRequest`] through the pipeline for a
//! given [`ConversionMode`]; [`markdown_to_html`], [`markdown_to_pdf`] and
//! [`html_to_pdf`] are the three modes spelled out. [`convert_file`] is the
//! CLI path: resolve a path or URL, convert, write the result atomically.
//!
//! Nothing here keeps state between calls. Each call owns its request and
//! its render-engine instance, so concurrent conversions never observe each
//! other.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::{ConversionOutput, ConversionStats, OutputFormat};
use crate::pipeline::chromium::ChromiumEngine;
use crate::pipeline::input::{self, InputKind};
use crate::pipeline::render::{self, RenderEngine, RenderJob};
use crate::pipeline::{assemble, markdown, normalize};
use crate::progress::Stage;
use crate::request::{ConversionMode, ConversionRequest};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Markdown → complete, styled HTML document.
pub async fn markdown_to_html(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    convert(request, ConversionMode::MarkdownToHtml, config).await
}

/// Markdown → HTML document → PDF.
pub async fn markdown_to_pdf(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    convert(request, ConversionMode::MarkdownToPdf, config).await
}

/// Caller-supplied HTML → PDF, rendered verbatim.
pub async fn html_to_pdf(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    convert(request, ConversionMode::HtmlToPdf, config).await
}

/// Run one request through the pipeline.
///
/// # Errors
/// - [`Md2PdfError::MissingContent`] for empty content
/// - [`Md2PdfError::ScriptsDisabled`] when a PDF request carries a script
///   and [`ConversionConfig::allow_scripts`] is off
/// - [`Md2PdfError::Parse`] if the parser fails
/// - any render-family error from the engine, including
///   [`Md2PdfError::RenderTimeout`]
pub async fn convert(
    request: ConversionRequest,
    mode: ConversionMode,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(mode);
    }

    let result = run(request, mode, config).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(output) => cb.on_conversion_complete(output.bytes.len()),
            Err(e) => cb.on_conversion_error(&e.to_string()),
        }
    }
    result
}

async fn run(
    request: ConversionRequest,
    mode: ConversionMode,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    request.validate()?;

    // Only the PDF modes have a page to run a script in.
    let script = match mode.output_format() {
        OutputFormat::Pdf => request.effective_script().map(str::to_string),
        OutputFormat::Html => {
            if request.effective_script().is_some() {
                debug!("Ignoring script for HTML output");
            }
            None
        }
    };
    if script.is_some() && !config.allow_scripts {
        return Err(Md2PdfError::ScriptsDisabled);
    }

    info!(%mode, content_bytes = request.content.len(), "Starting conversion");
    let mut stats = ConversionStats::default();

    let html = if mode.parses_markdown() {
        let (html, parse_ms) = markdown_document(&request, config).await?;
        stats.parse_duration_ms = parse_ms;
        html
    } else {
        request.content
    };
    stats.html_bytes = html.len();

    let bytes = match mode.output_format() {
        OutputFormat::Html => html.into_bytes(),
        OutputFormat::Pdf => {
            stage_start(config, Stage::Render);
            let render_start = Instant::now();
            let engine = resolve_engine(config);
            let job = RenderJob::new(html, script, config);
            let pdf = render::render_with_timeout(
                engine.as_ref(),
                job,
                Duration::from_secs(config.render_timeout_secs),
            )
            .await?;
            stats.render_duration_ms = elapsed_ms(render_start);
            stage_complete(config, Stage::Render, stats.render_duration_ms);
            debug!(engine = engine.name(), elapsed_ms = stats.render_duration_ms, "Rendered");
            pdf
        }
    };

    stats.output_bytes = bytes.len();
    stats.total_duration_ms = elapsed_ms(total_start);
    info!(
        %mode,
        bytes = stats.output_bytes,
        elapsed_ms = stats.total_duration_ms,
        "Conversion complete"
    );

    Ok(ConversionOutput {
        format: mode.output_format(),
        bytes,
        stats,
    })
}

/// Normalise, parse and assemble. Returns the document and the parse time.
async fn markdown_document(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<(String, u64), Md2PdfError> {
    let normalized = normalize::normalize_markdown(&request.content);

    stage_start(config, Stage::Parse);
    let parse_start = Instant::now();
    let parsed = markdown::parse(normalized.body, config.markdown, config.include_toc).await?;
    let parse_ms = elapsed_ms(parse_start);
    stage_complete(config, Stage::Parse, parse_ms);
    debug!(elapsed_ms = parse_ms, fragment_bytes = parsed.html.len(), "Parsed Markdown");

    stage_start(config, Stage::Assemble);
    let assemble_start = Instant::now();
    let title = request
        .effective_title()
        .map(str::to_string)
        .or(normalized.front_matter_title)
        .unwrap_or_else(|| config.default_title.clone());

    let body = if config.include_toc {
        let mut body = markdown::render_toc(&parsed.toc);
        body.push_str(&parsed.html);
        body
    } else {
        parsed.html
    };

    let html = assemble::assemble(
        &title,
        &body,
        config.base_css.as_deref(),
        request.css.as_deref(),
    );
    stage_complete(config, Stage::Assemble, elapsed_ms(assemble_start));

    Ok((html, parse_ms))
}

/// The configured engine, or a Chromium engine built from the config.
fn resolve_engine(config: &ConversionConfig) -> Arc<dyn RenderEngine> {
    match &config.engine {
        Some(engine) => Arc::clone(engine),
        None => Arc::new(ChromiumEngine::from_config(config)),
    }
}

fn stage_start(config: &ConversionConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &ConversionConfig, stage: Stage, elapsed_ms: u64) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ── File conversion ──────────────────────────────────────────────────────

/// Per-file overrides for [`convert_file`].
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    pub title: Option<String>,
    pub css: Option<String>,
    pub script: Option<String>,
    /// Produce HTML instead of PDF (Markdown input only).
    pub html_output: bool,
}

/// Where [`convert_file`] wrote its output, and how.
#[derive(Debug, Clone)]
pub struct FileConversion {
    pub output_path: PathBuf,
    pub mode: ConversionMode,
    pub stats: ConversionStats,
}

/// Convert a local file or HTTP/HTTPS URL and write the result to disk.
///
/// `.html`/`.htm` inputs (or URLs served as `text/html`) are printed as-is;
/// everything else is treated as Markdown. Without `output` the result goes
/// next to the input, named after its stem (current directory for URLs).
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_file(
    input_str: &str,
    output: Option<&Path>,
    options: &FileOptions,
    config: &ConversionConfig,
) -> Result<FileConversion, Md2PdfError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    let mode = match (resolved.kind, options.html_output) {
        (InputKind::Html, true) => {
            return Err(Md2PdfError::InvalidConfig(format!(
                "'{}' is already HTML; drop --html to print it to PDF",
                resolved.source
            )));
        }
        (InputKind::Html, false) => ConversionMode::HtmlToPdf,
        (InputKind::Markdown, true) => ConversionMode::MarkdownToHtml,
        (InputKind::Markdown, false) => ConversionMode::MarkdownToPdf,
    };

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output_path(
            resolved.local_path.as_deref(),
            &resolved.stem,
            mode.output_format(),
        ),
    };

    let request = ConversionRequest {
        content: resolved.text,
        title: options.title.clone(),
        css: options.css.clone(),
        script: options.script.clone(),
    };
    let converted = convert(request, mode, config).await?;

    write_atomic(&output_path, &converted.bytes).await?;
    info!("Wrote {}", output_path.display());

    Ok(FileConversion {
        output_path,
        mode,
        stats: converted.stats,
    })
}

/// `<dir>/<stem>.<ext>`, where `<dir>` is the input's directory or the
/// current directory when there is none.
pub fn default_output_path(local_input: Option<&Path>, stem: &str, format: OutputFormat) -> PathBuf {
    let file_name = format!("{stem}.{}", format.extension());
    match local_input.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Md2PdfError> {
    let write_err = |source: std::io::Error| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await.map_err(write_err)?;

    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    // The temp file lives next to the target so the rename never crosses a
    // filesystem; it is deleted on drop if anything fails before `persist`.
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Md2PdfError::Internal(format!("write task failed: {e}")))?
    .map_err(write_err)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: ConversionRequest,
    mode: ConversionMode,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, mode, config))
}
