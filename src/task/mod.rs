//! Task layer: what the external scheduler creates, copies, ships and runs.
//!
//! Every task kind is a variant of [`Task`]; dispatch is an explicit match on
//! the variant, and decoding dispatches on the stored [`TaskKind`] tag.

mod codec;
mod desc;
mod http;
mod result;

pub use codec::*;
pub use desc::*;
pub use http::*;
pub use result::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProbeSettings;
use crate::probe::{ProbeError, ProbeExecutor};

/// Task error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementError {
    /// The task could not be created from its parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A run failed; the message aggregates the underlying causes.
    #[error("Cannot get result from HTTP measurement because {0}")]
    Measurement(String),
    /// Encoded bytes could not be turned back into a task.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Type tag of a task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "httpCensorship")]
    HttpProbe,
}

impl TaskKind {
    /// Tag used on the wire and in results.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::HttpProbe => "httpCensorship",
        }
    }

    /// Human readable name.
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::HttpProbe => "HTTPCensorship",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "httpCensorship" => Some(Self::HttpProbe),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What a task needs to run: the executor and the device identity.
#[derive(Clone)]
pub struct TaskContext {
    pub executor: ProbeExecutor,
    pub device_id: String,
}

impl TaskContext {
    pub fn new(executor: ProbeExecutor, device_id: impl Into<String>) -> Self {
        Self {
            executor,
            device_id: device_id.into(),
        }
    }

    /// Context with the production executor.
    pub fn from_settings(settings: &ProbeSettings) -> Result<Self, ProbeError> {
        Ok(Self::new(
            ProbeExecutor::from_settings(settings)?,
            settings.device_id.clone(),
        ))
    }
}

/// Any task the scheduler can hold.
#[derive(Debug, Clone)]
pub enum Task {
    HttpProbe(ProbeTask),
}

impl Task {
    /// Build the task variant named by `desc.kind`.
    pub fn from_desc(desc: TaskDesc, settings: &ProbeSettings) -> Result<Self, MeasurementError> {
        match desc.kind {
            TaskKind::HttpProbe => Ok(Self::HttpProbe(ProbeTask::new(desc, settings)?)),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::HttpProbe(_) => TaskKind::HttpProbe,
        }
    }

    pub fn descriptor(&self) -> &'static str {
        self.kind().descriptor()
    }

    pub fn desc(&self) -> &TaskDesc {
        match self {
            Self::HttpProbe(t) => t.desc(),
        }
    }

    pub fn key(&self) -> &str {
        &self.desc().key
    }

    pub fn duration(&self) -> u64 {
        match self {
            Self::HttpProbe(t) => t.duration(),
        }
    }

    pub fn set_duration(&mut self, duration: i64) {
        match self {
            Self::HttpProbe(t) => t.set_duration(duration),
        }
    }

    pub fn data_consumed(&self) -> u64 {
        match self {
            Self::HttpProbe(t) => t.data_consumed(),
        }
    }

    pub fn stop(&mut self) -> bool {
        match self {
            Self::HttpProbe(t) => t.stop(),
        }
    }

    pub async fn execute(&mut self, ctx: &TaskContext) -> Result<Vec<MeasurementResult>, MeasurementError> {
        match self {
            Self::HttpProbe(t) => t.execute(ctx).await,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_task(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self, MeasurementError> {
        decode_task(data)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpProbe(t) => fmt::Display::fmt(t, f),
        }
    }
}
