//! Measurement results handed back to the scheduler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Final state of a task run as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskProgress {
    Completed,
    Failed,
    Paused,
    Removed,
}

/// One result record: task identity plus the measured values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub device_id: String,
    pub task_key: String,
    pub task_type: String,
    pub timestamp: DateTime<Utc>,
    pub progress: TaskProgress,
    pub parameters: BTreeMap<String, String>,
    pub values: Map<String, Value>,
}

impl MeasurementResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
