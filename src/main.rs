//! httprobe - run a single HTTP probe task.
//!
//! Usage: `httprobe url=<target> [method=<m>] [headers=<lines>] [key=<task key>]`

use std::collections::BTreeMap;
use std::process::ExitCode;

use httprobe::{ProbeSettings, Task, TaskContext, TaskDesc, TaskKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("httprobe=info".parse()?))
        .init();

    // Load configuration
    let settings = ProbeSettings::load();
    tracing::debug!("Using settings {:?}", settings);

    let mut params = parse_params(std::env::args().skip(1))?;
    let key = params.remove("key").unwrap_or_else(|| "httprobe".to_string());

    let ctx = TaskContext::from_settings(&settings)?;
    let mut task = Task::from_desc(TaskDesc::new(TaskKind::HttpProbe, key, params), &settings)?;
    tracing::info!("Running {}", task);

    match task.execute(&ctx).await {
        Ok(results) => {
            for result in results {
                println!("{}", result.to_json()?);
            }
            tracing::info!("Task {} consumed {} bytes", task.key(), task.data_consumed());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Turn `name=value` arguments into the task parameter map.
fn parse_params(
    args: impl Iterator<Item = String>,
) -> Result<BTreeMap<String, String>, Box<dyn std::error::Error + Send + Sync>> {
    let mut params = BTreeMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got {:?}", arg))?;
        // Allow literal "\n" in a shell argument to separate header lines.
        let value = if name == "headers" {
            value.replace("\\n", "\n")
        } else {
            value.to_string()
        };
        params.insert(name.to_string(), value);
    }
    Ok(params)
}
