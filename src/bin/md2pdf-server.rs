//! HTTP service binary for md2pdf.
//!
//! Maps flags (each with an environment override) to a `ServerConfig` and
//! serves until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use md2pdf::server::{self, ServerConfig, DEFAULT_BODY_LIMIT, DEFAULT_PORT};
use md2pdf::{ConversionConfig, PageFormat};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve Markdown/HTML → PDF/HTML conversion over HTTP.
#[derive(Parser, Debug)]
#[command(name = "md2pdf-server", version, about = "Serve Markdown/HTML → PDF/HTML conversion over HTTP")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "MD2PDF_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "MD2PDF_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    body_limit: usize,

    /// Run the `js` field of requests inside the page. Only for trusted callers.
    #[arg(long, env = "MD2PDF_ALLOW_SCRIPTS")]
    allow_scripts: bool,

    /// Paper size: a3, a4, a5, letter, legal, tabloid.
    #[arg(long, env = "MD2PDF_FORMAT", default_value = "a4")]
    format: PageFormat,

    /// Stylesheet replacing the built-in default.
    #[arg(long, env = "MD2PDF_BASE_CSS")]
    base_css: Option<PathBuf>,

    /// Chrome/Chromium executable. Auto-detected when unset.
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Keep the browser sandbox enabled.
    #[arg(long, env = "MD2PDF_SANDBOX")]
    sandbox: bool,

    /// Seconds to wait for a page to reach network idle.
    #[arg(long, env = "MD2PDF_LOAD_TIMEOUT", default_value_t = 30)]
    load_timeout: u64,

    /// Seconds allowed for one whole render.
    #[arg(long, env = "MD2PDF_RENDER_TIMEOUT", default_value_t = 90)]
    render_timeout: u64,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, env = "MD2PDF_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "MD2PDF_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let config = ServerConfig {
        addr: SocketAddr::new(cli.host, cli.port),
        body_limit_bytes: cli.body_limit,
        conversion: build_config(&cli).await?,
    };
    info!(
        addr = %config.addr,
        allow_scripts = config.conversion.allow_scripts,
        page_format = ?config.conversion.page_format,
        "Starting md2pdf-server"
    );

    server::serve(config).await.context("Server failed")
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page_format(cli.format)
        .allow_scripts(cli.allow_scripts)
        .sandbox(cli.sandbox)
        .load_timeout_secs(cli.load_timeout)
        .render_timeout_secs(cli.render_timeout);

    if let Some(ref path) = cli.base_css {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read base stylesheet from {}", path.display()))?;
        builder = builder.base_css(css);
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }

    builder.build().context("Invalid configuration")
}
