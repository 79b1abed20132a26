//! Bounded HTTP probe execution.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;

use super::{
    render_headers, ConnectionGuard, ProbeError, ProbeOutcome, ProbeRequest, ProbeResponse, ProbeSpec,
    ProcNetDev, ReqwestTransport, TrafficCounter, Transport,
};
use crate::config::ProbeSettings;

/// Drives one HTTP exchange per call and accounts for time and traffic.
///
/// The executor holds no per-call state; every connection it opens is
/// released before [`ProbeExecutor::execute`] returns.
#[derive(Clone)]
pub struct ProbeExecutor {
    transport: Arc<dyn Transport>,
    traffic: Arc<dyn TrafficCounter>,
    max_body_bytes: usize,
    read_buffer_bytes: usize,
}

impl ProbeExecutor {
    pub fn new(
        settings: &ProbeSettings,
        transport: Arc<dyn Transport>,
        traffic: Arc<dyn TrafficCounter>,
    ) -> Self {
        Self {
            transport,
            traffic,
            max_body_bytes: settings.max_body_bytes.max(1),
            read_buffer_bytes: settings.read_buffer_bytes.max(1),
        }
    }

    /// Executor using `reqwest` and `/proc/net/dev`.
    pub fn from_settings(settings: &ProbeSettings) -> Result<Self, ProbeError> {
        let transport = ReqwestTransport::new(settings)?;
        Ok(Self::new(
            settings,
            Arc::new(transport),
            Arc::new(ProcNetDev::default()),
        ))
    }

    /// Run the probe described by `spec`.
    ///
    /// A non-2xx status is a normal outcome. Errors are only returned for a
    /// bad URL, a malformed header line, or an I/O failure; no partial
    /// outcome is ever produced.
    pub async fn execute(&self, spec: &ProbeSpec) -> Result<ProbeOutcome, ProbeError> {
        let before = self.traffic.rx_tx_bytes();
        let mut outcome = self.exchange(spec).await?;
        outcome.data_consumed = self.traffic.rx_tx_bytes().saturating_sub(before);
        Ok(outcome)
    }

    async fn exchange(&self, spec: &ProbeSpec) -> Result<ProbeOutcome, ProbeError> {
        let url = Url::parse(spec.url()).map_err(|e| ProbeError::Network(e.to_string()))?;
        let headers = spec.request_headers()?;

        let request = ProbeRequest {
            url: url.to_string(),
            method: spec.method().to_ascii_uppercase(),
            headers,
        };
        tracing::debug!(
            "Probing {} {} with {} request headers",
            request.method,
            request.url,
            request.headers.len()
        );

        let start = Instant::now();

        let mut guard = ConnectionGuard::new(self.transport.send(request).await?);
        let response = guard.response();

        let status_code = response.status();
        let content_length = response.content_length();
        let headers = render_headers(&response.headers());
        let body = self.read_body(response).await?;

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        guard.release();

        Ok(ProbeOutcome {
            status_code,
            content_length,
            headers,
            body,
            elapsed_ms,
            data_consumed: 0,
        })
    }

    /// Read the body until end of stream or until the cap is reached.
    async fn read_body(&self, response: &mut dyn ProbeResponse) -> Result<Vec<u8>, ProbeError> {
        let mut body = Vec::with_capacity(self.max_body_bytes.min(64 * 1024));
        let mut chunk = vec![0u8; self.read_buffer_bytes];

        while body.len() < self.max_body_bytes {
            let n = response.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            let take = n.min(self.max_body_bytes - body.len());
            body.extend_from_slice(&chunk[..take]);
        }

        Ok(body)
    }
}
