//! Scheduling description shared by every task kind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskKind;

/// Identity and scheduling fields of a task, plus the raw parameters its
/// kind-specific spec is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDesc {
    pub kind: TaskKind,
    pub key: String,
    pub start_time: DateTime<Utc>,
    /// `None` means the task never expires.
    pub end_time: Option<DateTime<Utc>>,
    pub interval_sec: f64,
    pub count: u64,
    pub priority: u64,
    pub context_interval_sec: u32,
    pub parameters: BTreeMap<String, String>,
}

impl TaskDesc {
    /// A one-shot description starting now.
    pub fn new(kind: TaskKind, key: impl Into<String>, parameters: BTreeMap<String, String>) -> Self {
        Self {
            kind,
            key: key.into(),
            start_time: Utc::now(),
            end_time: None,
            interval_sec: 0.0,
            count: 1,
            priority: 0,
            context_interval_sec: 0,
            parameters,
        }
    }
}
