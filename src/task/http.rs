//! HTTP probe task.

use std::fmt;

use chrono::Utc;

use super::{MeasurementError, MeasurementResult, TaskContext, TaskDesc, TaskKind, TaskProgress};
use crate::config::ProbeSettings;
use crate::probe::ProbeSpec;

/// A scheduled HTTP probe.
///
/// `duration_ms` is an advisory scheduling hint and is never overwritten by
/// the measured exchange time, which lives in each result's `time_ms`.
#[derive(Debug)]
pub struct ProbeTask {
    desc: TaskDesc,
    spec: ProbeSpec,
    duration_ms: u64,
    data_consumed: u64,
}

impl ProbeTask {
    /// Create a task, validating its parameters.
    pub fn new(desc: TaskDesc, settings: &ProbeSettings) -> Result<Self, MeasurementError> {
        let spec = ProbeSpec::from_params(&desc.parameters)
            .map_err(|e| MeasurementError::InvalidParameter(e.message().to_string()))?;

        Ok(Self {
            desc: TaskDesc {
                kind: TaskKind::HttpProbe,
                ..desc
            },
            spec,
            duration_ms: settings.default_duration_ms,
            data_consumed: 0,
        })
    }

    /// Reassemble a task from decoded fields.
    pub(crate) fn from_parts(desc: TaskDesc, spec: ProbeSpec, duration_ms: u64, data_consumed: u64) -> Self {
        Self {
            desc,
            spec,
            duration_ms,
            data_consumed,
        }
    }

    pub fn desc(&self) -> &TaskDesc {
        &self.desc
    }

    pub fn spec(&self) -> &ProbeSpec {
        &self.spec
    }

    pub fn duration(&self) -> u64 {
        self.duration_ms
    }

    /// Set the advisory duration; negative values become 0.
    pub fn set_duration(&mut self, duration: i64) {
        self.duration_ms = u64::try_from(duration).unwrap_or(0);
    }

    /// Bytes attributed to this task across all of its successful runs.
    pub fn data_consumed(&self) -> u64 {
        self.data_consumed
    }

    /// Probes cannot be interrupted once started; always returns `false`.
    pub fn stop(&mut self) -> bool {
        false
    }

    /// Run the probe once and wrap the outcome as a completed result.
    ///
    /// Failures are folded into a single [`MeasurementError::Measurement`]
    /// and leave `data_consumed` untouched.
    pub async fn execute(&mut self, ctx: &TaskContext) -> Result<Vec<MeasurementResult>, MeasurementError> {
        let outcome = match ctx.executor.execute(&self.spec).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Probe failed for {}: {}", self.spec.url(), e);
                return Err(MeasurementError::Measurement(format!("{}\n", e)));
            }
        };

        self.data_consumed = self.data_consumed.saturating_add(outcome.data_consumed);

        let result = MeasurementResult {
            device_id: ctx.device_id.clone(),
            task_key: self.desc.key.clone(),
            task_type: TaskKind::HttpProbe.tag().to_string(),
            timestamp: Utc::now(),
            // Any status code is evidence, so the run is always completed.
            progress: TaskProgress::Completed,
            parameters: self.desc.parameters.clone(),
            values: outcome.to_values(),
        };

        match result.to_json() {
            Ok(json) => tracing::info!("{}", json),
            Err(e) => tracing::warn!("Failed to encode result for {}: {}", self.desc.key, e),
        }

        Ok(vec![result])
    }
}

/// Copies identity, scheduling fields and spec; the traffic counter restarts at 0.
impl Clone for ProbeTask {
    fn clone(&self) -> Self {
        Self {
            desc: self.desc.clone(),
            spec: self.spec.clone(),
            duration_ms: self.duration_ms,
            data_consumed: 0,
        }
    }
}

impl fmt::Display for ProbeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Task [HTTP {}]\n  Target: {}\n  Headers: {}\n  Interval (sec): {}\n  Next run: {}",
            TaskKind::HttpProbe.descriptor(),
            self.spec.method(),
            self.spec.url(),
            self.spec.headers().unwrap_or("none"),
            self.desc.interval_sec,
            self.desc.start_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, ProbeExecutor, ProbeRequest, ProbeResponse, TrafficCounter, Transport};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Serves a fixed body behind a 503 status.
    struct FixedTransport {
        body: &'static [u8],
    }

    struct FixedResponse {
        body: &'static [u8],
        sent: bool,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _request: ProbeRequest) -> Result<Box<dyn ProbeResponse>, ProbeError> {
            Ok(Box::new(FixedResponse {
                body: self.body,
                sent: false,
            }))
        }
    }

    #[async_trait]
    impl ProbeResponse for FixedResponse {
        fn status(&self) -> u16 {
            503
        }

        fn content_length(&self) -> i64 {
            -1
        }

        fn headers(&self) -> Vec<(String, Vec<String>)> {
            Vec::new()
        }

        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProbeError> {
            if self.sent {
                return Ok(0);
            }
            self.sent = true;
            let n = buf.len().min(self.body.len());
            buf[..n].copy_from_slice(&self.body[..n]);
            Ok(n)
        }

        fn close(&mut self) -> Result<(), ProbeError> {
            Ok(())
        }

        fn disconnect(&mut self) {}
    }

    struct Ticker(AtomicU64);

    impl TrafficCounter for Ticker {
        fn rx_tx_bytes(&self) -> u64 {
            self.0.fetch_add(100, Ordering::SeqCst)
        }
    }

    fn context() -> TaskContext {
        let executor = ProbeExecutor::new(
            &ProbeSettings::default(),
            Arc::new(FixedTransport { body: b"down" }),
            Arc::new(Ticker(AtomicU64::new(0))),
        );
        TaskContext::new(executor, "device-7")
    }

    fn task(pairs: &[(&str, &str)]) -> ProbeTask {
        let params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = ProbeSettings {
            default_duration_ms: 30_000,
            ..Default::default()
        };
        ProbeTask::new(TaskDesc::new(TaskKind::HttpProbe, "key-1", params), &settings).unwrap()
    }

    #[tokio::test]
    async fn test_execute_wraps_outcome() {
        let mut task = task(&[("url", "example.com")]);
        let results = task.execute(&context()).await.unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.device_id, "device-7");
        assert_eq!(result.task_key, "key-1");
        assert_eq!(result.task_type, "httpCensorship");
        assert_eq!(result.progress, TaskProgress::Completed);
        assert_eq!(result.values["status_code"], 503);
        assert_eq!(result.values["content_length"], -1);
        assert_eq!(result.values["body_len"], 4);
        assert_eq!(task.data_consumed(), 100);
    }

    #[tokio::test]
    async fn test_data_consumed_accumulates() {
        let ctx = context();
        let mut task = task(&[("url", "example.com")]);

        let mut last = 0;
        for _ in 0..3 {
            task.execute(&ctx).await.unwrap();
            assert!(task.data_consumed() >= last);
            last = task.data_consumed();
        }
        assert_eq!(last, 300);
    }

    #[tokio::test]
    async fn test_failure_is_aggregated_and_not_counted() {
        let mut task = task(&[("url", "example.com"), ("headers", "badheaderline")]);
        let err = task.execute(&context()).await.unwrap_err();

        assert!(matches!(err, MeasurementError::Measurement(_)));
        assert!(err.to_string().contains("Invalid header line: badheaderline"));
        assert_eq!(task.data_consumed(), 0);
    }

    #[tokio::test]
    async fn test_clone_copies_fields_and_resets_counter() {
        let mut task = task(&[("url", "example.com"), ("method", "post"), ("headers", "A:b")]);
        task.execute(&context()).await.unwrap();
        assert!(task.data_consumed() > 0);

        let copy = task.clone();
        assert_eq!(copy.spec(), task.spec());
        assert_eq!(copy.desc(), task.desc());
        assert_eq!(copy.duration(), task.duration());
        assert_eq!(copy.data_consumed(), 0);
    }

    #[test]
    fn test_duration_defaults_and_clamps() {
        let mut task = task(&[("url", "example.com")]);
        assert_eq!(task.duration(), 30_000);

        task.set_duration(-1);
        assert_eq!(task.duration(), 0);
        task.set_duration(1500);
        assert_eq!(task.duration(), 1500);
    }

    #[test]
    fn test_stop_is_refused() {
        let mut task = task(&[("url", "example.com")]);
        assert!(!task.stop());
    }

    #[test]
    fn test_display() {
        let task = task(&[("url", "example.com")]);
        let text = task.to_string();
        assert!(text.starts_with("HTTPCensorship Task [HTTP get]"));
        assert!(text.contains("Target: http://example.com"));
        assert!(text.contains("Headers: none"));
    }
}
