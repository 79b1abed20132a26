//! httprobe - bounded HTTP probe for network measurement.
//!
//! A task wraps one [`probe::ProbeSpec`]. Executing it performs a single HTTP
//! exchange, stores at most a capped amount of the body, and reports status,
//! headers, body, timing and the bytes the device moved while doing so.
//!
//! ```rust,ignore
//! use httprobe::{ProbeSettings, Task, TaskContext, TaskDesc, TaskKind};
//!
//! let settings = ProbeSettings::load();
//! let ctx = TaskContext::from_settings(&settings)?;
//! let desc = TaskDesc::new(TaskKind::HttpProbe, "probe-1", params);
//! let mut task = Task::from_desc(desc, &settings)?;
//! let results = task.execute(&ctx).await?;
//! ```

pub mod config;
pub mod probe;
pub mod task;

pub use config::ProbeSettings;
pub use probe::{ProbeError, ProbeExecutor, ProbeOutcome, ProbeSpec};
pub use task::{MeasurementError, MeasurementResult, Task, TaskContext, TaskDesc, TaskKind};
