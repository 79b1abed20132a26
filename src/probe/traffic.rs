//! Device traffic counters used to attribute bytes to a probe.

use std::path::PathBuf;

/// Source of the device's cumulative received + transmitted byte count.
///
/// Called synchronously from the async execute path, so implementations must
/// be cheap and non-blocking in practice (a procfs read qualifies).
pub trait TrafficCounter: Send + Sync {
    fn rx_tx_bytes(&self) -> u64;
}

/// Reads interface counters from `/proc/net/dev`.
///
/// Loopback is excluded, every other interface is summed.
#[derive(Debug, Clone)]
pub struct ProcNetDev {
    path: PathBuf,
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/net/dev"),
        }
    }
}

impl ProcNetDev {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TrafficCounter for ProcNetDev {
    fn rx_tx_bytes(&self) -> u64 {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => sum_non_loopback(&raw),
            Err(e) => {
                tracing::warn!("Cannot read traffic counters from {}: {}", self.path.display(), e);
                0
            }
        }
    }
}

/// Sum receive (field 0) and transmit (field 8) bytes of non-loopback interfaces.
fn sum_non_loopback(raw: &str) -> u64 {
    let mut total: u64 = 0;

    // Two header lines precede the per-interface rows.
    for line in raw.lines().skip(2) {
        let Some((iface, stats)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }
        let fields: Vec<u64> = stats
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if fields.len() < 16 {
            continue;
        }
        total = total.saturating_add(fields[0]).saturating_add(fields[8]);
    }

    total
}
