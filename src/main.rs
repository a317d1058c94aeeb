use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use matchwatch_lib::logging::init_logging;
use matchwatch_lib::{event_channel, MatchWatcher, WatcherConfig};

#[derive(Debug, Parser)]
#[command(name = "matchwatch", about = "Track menus/pregame/ingame state of the local game client")]
struct Args {
  /// Path to config.json (defaults to the user config directory)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Verbose logging
  #[arg(long)]
  debug: bool,
}

/// `target <id>` sets the auto-action target, `target none` clears it.
fn parse_control_line(line: &str) -> Option<Option<String>> {
  let mut parts = line.split_whitespace();
  if parts.next()? != "target" {
    return None;
  }
  match parts.next() {
    None | Some("none") | Some("clear") => Some(None),
    Some(id) => Some(Some(id.to_string())),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let config_path = args.config.unwrap_or_else(WatcherConfig::default_path);
  let mut config = WatcherConfig::load(&config_path)
    .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
  config.debug |= args.debug;

  let _log_guard = init_logging(config.log_dir.as_deref(), config.debug)
    .context("Failed to initialize logging")?;

  let (events_tx, mut events_rx) = event_channel();
  let watcher = MatchWatcher::new(config, events_tx).context("Failed to create watcher")?;
  let _handles = watcher.start();

  // Outbound events go to stdout, one JSON object per line.
  let printer = tokio::spawn(async move {
    while let Some(event) = events_rx.recv().await {
      match serde_json::to_string(&event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "[Main] Failed to serialize event"),
      }
    }
  });

  let mut stdin = BufReader::new(tokio::io::stdin()).lines();
  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      line = stdin.next_line() => match line {
        Ok(Some(line)) => match parse_control_line(&line) {
          Some(target) => watcher.set_auto_action_target(target),
          None if line.trim().is_empty() => {}
          None => tracing::warn!(line = %line, "[Main] Unknown command"),
        },
        // stdin closed; keep running until Ctrl-C
        Ok(None) => {
          tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C")?;
          break;
        }
        Err(e) => {
          tracing::warn!(error = %e, "[Main] Failed to read stdin");
          tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C")?;
          break;
        }
      },
    }
  }

  watcher.stop().await;
  drop(watcher);
  let _ = printer.await;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::parse_control_line;

  #[test]
  fn control_lines() {
    assert_eq!(parse_control_line("target jett"), Some(Some("jett".to_string())));
    assert_eq!(parse_control_line("target none"), Some(None));
    assert_eq!(parse_control_line("target"), Some(None));
    assert_eq!(parse_control_line("hello"), None);
    assert_eq!(parse_control_line(""), None);
  }
}
