// Logging setup: console output plus an optional on-disk live log

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::ClientError;

pub const LIVE_LOG_PREFIX: &str = "matchwatch-live.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` or `info` depending on `verbose`.
/// When `log_dir` is given, a daily-rolling live log is written there as well and
/// the returned guard must be held for as long as logging should keep flushing.
pub fn init_logging(
  log_dir: Option<&Path>,
  verbose: bool,
) -> Result<Option<WorkerGuard>, ClientError> {
  let default_level = if verbose { "debug" } else { "info" };
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  let console = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false);

  let (file_layer, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)?;
      let appender = tracing_appender::rolling::daily(dir, LIVE_LOG_PREFIX);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .boxed();
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(env_filter)
    .with(console)
    .with(file_layer)
    .try_init()
    .map_err(|e| ClientError::Initialization(format!("logging: {}", e)))?;

  tracing::info!(
    debug = verbose,
    log_dir = ?log_dir.map(|d| d.display().to_string()),
    "[Logging] Initialized"
  );

  Ok(guard)
}
