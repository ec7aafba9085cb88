use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::appconfig::LogSettings;

/// Logs to stderr and to a dated file under `settings.dir`. `log` records from
/// dependencies are forwarded as well.
///
/// Keep the returned guard alive for the life of the process, dropping it
/// flushes the file writer.
pub fn init_logs(settings: &LogSettings) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .context("Invalid log filter")?;

    std::fs::create_dir_all(&settings.dir)
        .with_context(|| format!("Failed to create log dir {}", settings.dir))?;
    let file_name = format!("roi_trainer_{}.log", chrono::Local::now().format("%Y-%m-%d"));
    let appender = tracing_appender::rolling::never(&settings.dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    debug!("logging to {}", settings.dir);

    Ok(guard)
}
