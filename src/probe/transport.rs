//! Transport seam between the executor and the HTTP client.

use async_trait::async_trait;

use super::ProbeError;

/// A fully prepared request: parsed URL, wire method and validated headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
}

/// Something that can perform one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return once the status line and headers are in.
    async fn send(&self, request: ProbeRequest) -> Result<Box<dyn ProbeResponse>, ProbeError>;
}

/// A live response whose body has not been consumed yet.
#[async_trait]
pub trait ProbeResponse: Send {
    /// Status code; 0 if the status line was never obtained.
    fn status(&self) -> u16;

    /// Advertised `Content-Length`, or -1 when absent or unparsable.
    fn content_length(&self) -> i64;

    /// Header names with all their values, in the order the map yields them.
    fn headers(&self) -> Vec<(String, Vec<String>)>;

    /// Read the next body bytes into `buf`. `Ok(0)` means end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProbeError>;

    /// Release the body stream.
    fn close(&mut self) -> Result<(), ProbeError>;

    /// Tear down the underlying connection.
    fn disconnect(&mut self);
}

/// Owns a live response and releases it exactly once when dropped.
///
/// The stream is closed first; a close failure is logged and the connection
/// is still torn down.
pub struct ConnectionGuard {
    response: Box<dyn ProbeResponse>,
}

impl ConnectionGuard {
    pub fn new(response: Box<dyn ProbeResponse>) -> Self {
        Self { response }
    }

    pub fn response(&mut self) -> &mut (dyn ProbeResponse + 'static) {
        self.response.as_mut()
    }

    /// Release now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.response.close() {
            tracing::warn!("Failed to close the response stream: {}", e);
        }
        self.response.disconnect();
    }
}
