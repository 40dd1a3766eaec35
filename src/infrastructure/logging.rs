//! Logging setup: console output with env-filter control, optional file
//! output via a non-blocking appender.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Keeps the non-blocking writer alive for the process lifetime.
static LOG_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Initialize tracing. `RUST_LOG` overrides the default `info` level. When
/// `log_dir` is given, events are also appended to `job-harvester.log` there.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, "job-harvester.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            *LOG_GUARD.lock().expect("log guard poisoned") = Some(guard);

            let file = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()?;
        }
    }

    Ok(())
}
