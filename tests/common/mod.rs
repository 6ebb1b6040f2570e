//! Shared test doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use md2pdf::{InstanceGauge, Md2PdfError, RenderEngine, RenderJob};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What [`MockEngine::render_pdf`] does after acquiring its instance.
pub enum Behaviour {
    /// Return a small fake PDF.
    Succeed,
    /// Fail with a capture error.
    Fail,
    /// Wait for a permit on the gate, then succeed.
    Gated(Arc<Semaphore>),
}

/// Render engine that records jobs and counts live instances.
pub struct MockEngine {
    pub gauge: InstanceGauge,
    pub jobs: Mutex<Vec<RenderJob>>,
    behaviour: Behaviour,
}

impl MockEngine {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            gauge: InstanceGauge::new(),
            jobs: Mutex::new(Vec::new()),
            behaviour,
        })
    }

    pub fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn render_pdf(&self, job: RenderJob) -> Result<Vec<u8>, Md2PdfError> {
        let _instance = self.gauge.acquire();
        self.jobs.lock().unwrap().push(job.clone());

        match &self.behaviour {
            Behaviour::Succeed => {}
            Behaviour::Fail => {
                return Err(Md2PdfError::PdfCapture {
                    detail: "mock capture failure".into(),
                })
            }
            Behaviour::Gated(gate) => {
                let _permit = gate.acquire().await.unwrap();
            }
        }

        let mut pdf = b"%PDF-1.7\n% mock\n".to_vec();
        pdf.extend_from_slice(format!("% html bytes: {}\n%%EOF\n", job.html.len()).as_bytes());
        Ok(pdf)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn instances(&self) -> Option<InstanceGauge> {
        Some(self.gauge.clone())
    }
}
