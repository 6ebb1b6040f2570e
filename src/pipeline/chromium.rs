//! Headless Chromium render engine over the DevTools protocol.
//!
//! One browser per job. The sequence is:
//!
//! 1. launch the browser and spawn a task driving its CDP handler
//! 2. open `about:blank`, subscribe to network events, set the document
//! 3. wait until no request has been in flight for the quiet window
//! 4. evaluate the job's script, awaiting it if it returns a promise
//! 5. print to PDF
//!
//! The browser is closed after step 5 whatever the outcome. If the render
//! future is dropped mid-way (overall timeout, client gone) the
//! [`BrowserSession`] drop guard kills the process instead.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::pipeline::render::{InstanceGauge, InstanceGuard, RenderEngine, RenderJob};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Render engine backed by a locally installed Chrome or Chromium.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
    sandbox: bool,
    launch_timeout: Duration,
    gauge: InstanceGauge,
}

impl ChromiumEngine {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            sandbox: config.sandbox,
            launch_timeout: Duration::from_secs(config.load_timeout_secs),
            gauge: InstanceGauge::new(),
        }
    }

    /// Live browser processes started by this engine.
    pub fn gauge(&self) -> &InstanceGauge {
        &self.gauge
    }

    fn browser_config(&self) -> Result<BrowserConfig, Md2PdfError> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(self.launch_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|detail| Md2PdfError::BrowserLaunch { detail })
    }

    async fn launch(&self) -> Result<BrowserSession, Md2PdfError> {
        let config = self.browser_config()?;
        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| Md2PdfError::BrowserLaunch {
                    detail: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {}", e);
                }
            }
        });

        info!("Browser launched");
        Ok(BrowserSession {
            browser: Some(browser),
            handler_task,
            _guard: self.gauge.acquire(),
        })
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn render_pdf(&self, job: RenderJob) -> Result<Vec<u8>, Md2PdfError> {
        let mut session = self.launch().await?;
        let result = match session.browser() {
            Some(browser) => render_page(browser, &job).await,
            None => Err(Md2PdfError::Internal("browser session already closed".into())),
        };
        session.close().await;
        result
    }

    fn name(&self) -> &str {
        "chromium"
    }

    fn instances(&self) -> Option<InstanceGauge> {
        Some(self.gauge.clone())
    }
}

async fn render_page(browser: &Browser, job: &RenderJob) -> Result<Vec<u8>, Md2PdfError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| Md2PdfError::PageLoad {
            detail: e.to_string(),
        })?;

    // Subscribe before the content goes in so no early request is missed.
    let signals = network_signals(&page).await?;

    page.set_content(job.html.as_str())
        .await
        .map_err(|e| Md2PdfError::PageLoad {
            detail: e.to_string(),
        })?;

    wait_for_network_idle(signals, job.network_idle, job.load_timeout).await?;
    debug!("Network idle");

    if let Some(script) = job.script.as_deref() {
        run_script(&page, script).await?;
    }

    // Dimensions are already oriented, so `landscape` stays unset.
    let params = PrintToPdfParams {
        paper_width: Some(job.pdf.paper_width),
        paper_height: Some(job.pdf.paper_height),
        print_background: Some(job.pdf.print_background),
        margin_top: Some(job.pdf.margins.top),
        margin_right: Some(job.pdf.margins.right),
        margin_bottom: Some(job.pdf.margins.bottom),
        margin_left: Some(job.pdf.margins.left),
        ..Default::default()
    };
    let pdf = page.pdf(params).await.map_err(|e| Md2PdfError::PdfCapture {
        detail: e.to_string(),
    })?;

    if let Err(e) = page.close().await {
        debug!("Page close: {}", e);
    }
    info!("Captured PDF ({} bytes)", pdf.len());
    Ok(pdf)
}

async fn run_script(page: &Page, script: &str) -> Result<(), Md2PdfError> {
    let params = EvaluateParams::builder()
        .expression(script)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|detail| Md2PdfError::Script { detail })?;

    page.evaluate_expression(params)
        .await
        .map_err(|e| Md2PdfError::Script {
            detail: e.to_string(),
        })?;
    debug!("Script evaluated ({} chars)", script.len());
    Ok(())
}

// ── Browser lifetime ─────────────────────────────────────────────────────

/// A launched browser plus the task driving its protocol handler.
///
/// [`BrowserSession::close`] shuts the browser down gracefully. Dropping an
/// unclosed session kills the process on the current runtime.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    _guard: InstanceGuard,
}

impl BrowserSession {
    fn browser(&self) -> Option<&Browser> {
        self.browser.as_ref()
    }

    /// Close the browser and reap the process.
    async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed, killing: {}", e);
                let _ = browser.kill().await;
            }
            if let Err(e) = browser.wait().await {
                warn!("Waiting for browser exit: {}", e);
            }
            debug!("Browser closed");
        }
        self.handler_task.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = browser.kill().await;
                    let _ = browser.wait().await;
                });
            }
            Err(_) => warn!("Browser dropped outside a runtime; process may outlive the request"),
        }
    }
}

// ── Network idle ─────────────────────────────────────────────────────────

/// A request starting or settling, keyed by protocol request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSignal {
    Started(String),
    Settled(String),
}

/// Requests currently in flight.
#[derive(Debug, Default)]
pub struct InflightTracker {
    inflight: HashSet<String>,
}

impl InflightTracker {
    pub fn apply(&mut self, signal: NetworkSignal) {
        match signal {
            // Redirects reuse the id; the set keeps them counted once.
            NetworkSignal::Started(id) => {
                self.inflight.insert(id);
            }
            NetworkSignal::Settled(id) => {
                self.inflight.remove(&id);
            }
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inflight.is_empty()
    }
}

async fn network_signals(page: &Page) -> Result<BoxStream<'static, NetworkSignal>, Md2PdfError> {
    let listen_err = |e: chromiumoxide::error::CdpError| Md2PdfError::PageLoad {
        detail: format!("network events unavailable: {e}"),
    };

    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(listen_err)?
        .map(|ev| NetworkSignal::Started(ev.request_id.inner().clone()));
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(listen_err)?
        .map(|ev| NetworkSignal::Settled(ev.request_id.inner().clone()));
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(listen_err)?
        .map(|ev| NetworkSignal::Settled(ev.request_id.inner().clone()));

    Ok(stream::select(started, stream::select(finished, failed)).boxed())
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Resolve once no request has been in flight for `quiet`.
///
/// Fails with [`Md2PdfError::NetworkIdleTimeout`] if that never happens
/// within `timeout`.
pub async fn wait_for_network_idle<S>(
    mut signals: S,
    quiet: Duration,
    timeout: Duration,
) -> Result<(), Md2PdfError>
where
    S: Stream<Item = NetworkSignal> + Unpin,
{
    // Instant arithmetic panics on overflow; an absurd timeout means "never".
    let deadline = Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let mut tracker = InflightTracker::default();

    loop {
        tokio::select! {
            biased;
            _ = tokio::time::sleep_until(deadline) => {
                return Err(Md2PdfError::NetworkIdleTimeout {
                    secs: timeout.as_secs(),
                    inflight: tracker.inflight(),
                });
            }
            signal = signals.next() => match signal {
                Some(signal) => tracker.apply(signal),
                None if tracker.is_idle() => return Ok(()),
                None => {
                    return Err(Md2PdfError::PageLoad {
                        detail: "page closed while requests were in flight".into(),
                    });
                }
            },
            _ = tokio::time::sleep(quiet), if tracker.is_idle() => return Ok(()),
        }
    }
}
