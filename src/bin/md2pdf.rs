//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{
    convert_file, ConversionConfig, ConversionMode, ConversionProgressCallback, FileOptions,
    PageFormat, PageMargins, ProgressCallback, Stage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that names the stage currently running and prints one
/// line per finished stage. Rendering is where the wait is (browser launch
/// plus network idle), so that stage gets the most explicit message.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, mode: ConversionMode) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(mode.to_string());
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(match stage {
            Stage::Parse => "Parsing Markdown…",
            Stage::Assemble => "Assembling document…",
            Stage::Render => "Rendering in headless Chromium…",
        });
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<9} {}",
            green("✓"),
            stage,
            dim(&format!("{elapsed_ms}ms")),
        ));
    }

    fn on_conversion_complete(&self, output_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} produced",
            green("✔"),
            bold(&format!("{output_bytes} bytes"))
        );
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        // Keep long messages to the first line; anyhow prints the rest.
        let first = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to PDF next to the input (notes.pdf)
  md2pdf notes.md

  # Choose the output path and title
  md2pdf notes.md -o build/handbook.pdf -t "Team Handbook"

  # Styled HTML instead of PDF
  md2pdf notes.md --html

  # Letter paper, landscape, with a table of contents
  md2pdf --format letter --landscape --toc report.md

  # Extra stylesheet and a script run before capture
  md2pdf slides.md --css theme.css --js highlight.js

  # Print an existing HTML page
  md2pdf page.html -o page.pdf

  # Convert from URL
  md2pdf https://example.com/README.md -o readme.pdf

TITLE:
  -t/--title wins, then a `title:` line in leading YAML front matter, then
  "Document".

ENVIRONMENT VARIABLES:
  MD2PDF_CHROME           Path to the Chrome/Chromium executable
  RUST_LOG                Log filter (overrides -v/-q)

SETUP:
  A local Chrome or Chromium install is required for PDF output. It is
  auto-detected; point --chrome / MD2PDF_CHROME at it otherwise.
"#;

/// Convert Markdown and HTML files to PDF or styled HTML.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown and HTML files to PDF or styled HTML",
    long_about = "Convert Markdown documents (local files or URLs) to a styled HTML document \
or a PDF printed by headless Chromium. HTML inputs (.html/.htm) are printed as-is.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local Markdown/HTML file path or HTTP/HTTPS URL.
    input: String,

    /// Output file. Default: the input name with .pdf (or .html).
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Document title.
    #[arg(short, long, env = "MD2PDF_TITLE")]
    title: Option<String>,

    /// Write styled HTML instead of PDF (Markdown input only).
    #[arg(long, env = "MD2PDF_HTML")]
    html: bool,

    /// Stylesheet appended after the base stylesheet.
    #[arg(long, env = "MD2PDF_CSS")]
    css: Option<PathBuf>,

    /// Stylesheet replacing the built-in default.
    #[arg(long, env = "MD2PDF_BASE_CSS")]
    base_css: Option<PathBuf>,

    /// JavaScript file run in the page after load and before capture.
    #[arg(long, env = "MD2PDF_JS")]
    js: Option<PathBuf>,

    /// Paper size.
    #[arg(long, env = "MD2PDF_FORMAT", value_enum, default_value = "a4")]
    format: FormatArg,

    /// Landscape orientation.
    #[arg(long, env = "MD2PDF_LANDSCAPE")]
    landscape: bool,

    /// Page margin on every side, in inches (0–3).
    #[arg(long, env = "MD2PDF_MARGIN", default_value_t = 0.4)]
    margin: f64,

    /// Prepend a table of contents built from the headings.
    #[arg(long, env = "MD2PDF_TOC")]
    toc: bool,

    /// Chrome/Chromium executable. Auto-detected when unset.
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Keep the browser sandbox enabled.
    #[arg(long, env = "MD2PDF_SANDBOX")]
    sandbox: bool,

    /// Seconds to wait for the page to reach network idle.
    #[arg(long, env = "MD2PDF_LOAD_TIMEOUT", default_value_t = 30)]
    load_timeout: u64,

    /// Seconds allowed for one whole render.
    #[arg(long, env = "MD2PDF_RENDER_TIMEOUT", default_value_t = 90)]
    render_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MD2PDF_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Print conversion stats as JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<FormatArg> for PageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::A3 => PageFormat::A3,
            FormatArg::A4 => PageFormat::A4,
            FormatArg::A5 => PageFormat::A5,
            FormatArg::Letter => PageFormat::Letter,
            FormatArg::Legal => PageFormat::Legal,
            FormatArg::Tabloid => PageFormat::Tabloid,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; it
    // carries the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let options = FileOptions {
        title: cli.title.clone(),
        css: read_optional(cli.css.as_deref(), "stylesheet").await?,
        script: read_optional(cli.js.as_deref(), "script").await?,
        html_output: cli.html,
    };

    // ── Run conversion ───────────────────────────────────────────────────
    let done = convert_file(&cli.input, cli.output.as_deref(), &options, &config)
        .await
        .with_context(|| format!("Failed to convert '{}'", cli.input))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&done.stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}ms  →  {}",
            green("✔"),
            done.mode,
            done.stats.total_duration_ms,
            bold(&done.output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page_format(cli.format.into())
        .landscape(cli.landscape)
        .margins(PageMargins::uniform(cli.margin))
        .include_toc(cli.toc)
        // Passing --js is the operator's opt-in.
        .allow_scripts(cli.js.is_some())
        .sandbox(cli.sandbox)
        .load_timeout_secs(cli.load_timeout)
        .render_timeout_secs(cli.render_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(css) = read_optional(cli.base_css.as_deref(), "base stylesheet").await? {
        builder = builder.base_css(css);
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_optional(path: Option<&Path>, what: &str) -> Result<Option<String>> {
    match path {
        Some(p) => tokio::fs::read_to_string(p)
            .await
            .map(Some)
            .with_context(|| format!("Failed to read {what} from {}", p.display())),
        None => Ok(None),
    }
}
