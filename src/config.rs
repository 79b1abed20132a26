//! Configuration module for httprobe.
//!
//! Loads probe settings from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Largest response body a probe stores (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Chunk size used when draining a response body.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 1024;

/// Settings handed to the executor and to newly created tasks.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Cap on stored response body bytes (default: 1 MiB)
    pub max_body_bytes: usize,
    /// Size of each body read (default: 1024)
    pub read_buffer_bytes: usize,
    /// Advisory duration given to new tasks, in milliseconds (default: 0)
    pub default_duration_ms: u64,
    /// Overall request timeout; `None` leaves the client default in place
    pub request_timeout: Option<Duration>,
    /// Device identifier stamped on every result (default: "unknown")
    pub device_id: String,
    /// User-Agent sent with each probe
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            default_duration_ms: 0,
            request_timeout: None,
            device_id: "unknown".to_string(),
            user_agent: concat!("httprobe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ProbeSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `HTTPROBE_MAX_BODY_BYTES`: body capture cap (default: 1048576)
    /// - `HTTPROBE_READ_BUFFER_BYTES`: read chunk size (default: 1024)
    /// - `HTTPROBE_DEFAULT_DURATION_MS`: advisory task duration (default: 0)
    /// - `HTTPROBE_TIMEOUT_SECS`: request timeout in seconds (default: unset)
    /// - `HTTPROBE_DEVICE_ID`: device identifier (default: "unknown")
    /// - `HTTPROBE_USER_AGENT`: User-Agent header (default: "httprobe/<version>")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Some(max_body) = parse_var("HTTPROBE_MAX_BODY_BYTES") {
            cfg.max_body_bytes = max_body;
        }

        if let Some(read_buffer) = parse_var("HTTPROBE_READ_BUFFER_BYTES") {
            cfg.read_buffer_bytes = read_buffer;
        }

        if let Some(duration) = parse_var("HTTPROBE_DEFAULT_DURATION_MS") {
            cfg.default_duration_ms = duration;
        }

        if let Some(secs) = parse_var::<f64>("HTTPROBE_TIMEOUT_SECS") {
            cfg.request_timeout = timeout_from_secs(secs);
        }

        if let Ok(device_id) = env::var("HTTPROBE_DEVICE_ID") {
            cfg.device_id = device_id;
        }

        if let Ok(user_agent) = env::var("HTTPROBE_USER_AGENT") {
            cfg.user_agent = user_agent;
        }

        cfg.normalized()
    }

    /// Clamp buffer sizes so a zero value can never stall the read loop.
    pub fn normalized(mut self) -> Self {
        self.max_body_bytes = self.max_body_bytes.max(1);
        self.read_buffer_bytes = self.read_buffer_bytes.max(1);
        self
    }
}

/// Only a positive, finite number of seconds enables a timeout.
fn timeout_from_secs(secs: f64) -> Option<Duration> {
    (secs > 0.0 && secs.is_finite()).then(|| Duration::from_secs_f64(secs))
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}
