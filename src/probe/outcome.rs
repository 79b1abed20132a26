//! Evidence produced by a completed probe.

use base64::Engine;
use serde_json::{Map, Value};

/// Status code reported when no status line was received.
pub const UNKNOWN_STATUS: u16 = 0;

/// Everything a completed probe observed.
///
/// Any status code counts as completed; only transport-level problems fail
/// a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status_code: u16,
    /// Advertised `Content-Length`, -1 when unknown.
    pub content_length: i64,
    /// Rendered `name:values\n` block.
    pub headers: String,
    /// Captured body, never longer than the configured cap.
    pub body: Vec<u8>,
    /// Exchange duration, request start through end of body.
    pub elapsed_ms: u64,
    /// Interface bytes attributed to this probe.
    pub data_consumed: u64,
}

impl ProbeOutcome {
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Result values keyed the way downstream analysis expects them.
    ///
    /// `body` is present only when something was captured.
    pub fn to_values(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("status_code".into(), Value::from(self.status_code));
        values.insert("content_length".into(), Value::from(self.content_length));
        values.insert("time_ms".into(), Value::from(self.elapsed_ms));
        values.insert("headers_len".into(), Value::from(self.headers.len()));
        values.insert("body_len".into(), Value::from(self.body_len()));
        values.insert("headers".into(), Value::from(self.headers.clone()));
        if !self.body.is_empty() {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&self.body);
            values.insert("body".into(), Value::from(encoded));
        }
        values
    }
}

/// Render headers as one `name:value1, value2\n` line per name, in map order.
pub fn render_headers(headers: &[(String, Vec<String>)]) -> String {
    headers
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name.trim(), values.join(", ").trim()))
        .collect()
}
