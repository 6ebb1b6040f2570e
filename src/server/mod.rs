//! HTTP surface: one stateless POST handler per conversion mode.
//!
//! | Route          | Body                              | Output            |
//! |----------------|-----------------------------------|-------------------|
//! | `/convert`     | `markdown`, `title?`, `css?`      | `application/pdf` |
//! | `/md-to-pdf`   | `markdown`, `title?`, `css?`, `js?` | `application/pdf` |
//! | `/md-to-html`  | `markdown`, `title?`, `css?`      | `text/html`       |
//! | `/html-to-pdf` | `html`, `js?`                     | `application/pdf` |
//! | `GET /health`  | none                              | `{"status":"ok"}` |
//!
//! Everything a handler reads comes from [`AppState`], built once from a
//! [`ServerConfig`] at startup. That includes the render engine, so the
//! live-instance count is service-wide.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use handlers::{HtmlBody, JsonBody, MarkdownBody};
pub use middleware::log_responses;

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::pipeline::chromium::ChromiumEngine;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::info;

/// Port used when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 8080;

/// Largest accepted JSON body. Default: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Startup configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Requests with larger bodies are answered with 413.
    pub body_limit_bytes: usize,
    /// Applied to every conversion.
    pub conversion: ConversionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            conversion: ConversionConfig::default(),
        }
    }
}

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub conversion: Arc<ConversionConfig>,
}

impl AppState {
    /// Wrap the conversion config. Without a configured engine, one
    /// [`ChromiumEngine`] is built here and shared by every request, so its
    /// instance gauge covers the whole service.
    pub fn new(mut conversion: ConversionConfig) -> Self {
        if conversion.engine.is_none() {
            conversion.engine = Some(Arc::new(ChromiumEngine::from_config(&conversion)));
        }
        Self {
            conversion: Arc::new(conversion),
        }
    }

    /// Render instances currently alive, when the engine counts them.
    pub fn live_instances(&self) -> Option<usize> {
        self.conversion
            .engine
            .as_ref()
            .and_then(|engine| engine.instances())
            .map(|gauge| gauge.live())
    }
}

/// Build the router with body limit and response logging applied.
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/convert", post(handlers::convert))
        .route("/md-to-pdf", post(handlers::md_to_pdf))
        .route("/md-to-html", post(handlers::md_to_html))
        .route("/html-to-pdf", post(handlers::html_to_pdf))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(axum::middleware::from_fn(log_responses))
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<(), Md2PdfError> {
    let router = build_router(AppState::new(config.conversion), config.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| Md2PdfError::InvalidConfig(format!("cannot bind {}: {e}", config.addr)))?;
    let local = listener
        .local_addr()
        .map_err(|e| Md2PdfError::Internal(e.to_string()))?;
    info!("Listening on http://{local}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Md2PdfError::Internal(format!("server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
