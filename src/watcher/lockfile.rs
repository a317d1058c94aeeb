// Lockfile polling - reports client connect/disconnect from the credential file

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::ConnectionCredentials;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockfileEvent {
  Connected(ConnectionCredentials),
  Disconnected,
}

/// One check of the lockfile.
///
/// `None` means "no news": the file exists but could not be read or parsed yet
/// (the client may be mid-write), so the caller retries on the next tick.
pub async fn check_lockfile(path: &Path) -> Option<LockfileEvent> {
  match tokio::fs::read_to_string(path).await {
    Ok(content) => match ConnectionCredentials::parse(&content) {
      Some(creds) => Some(LockfileEvent::Connected(creds)),
      None => {
        tracing::debug!(path = %path.display(), "[Lockfile] Unparseable lockfile, retrying");
        None
      }
    },
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(LockfileEvent::Disconnected),
    Err(e) => {
      tracing::debug!(path = %path.display(), error = %e, "[Lockfile] Read failed, retrying");
      None
    }
  }
}

/// Polls the lockfile at a fixed interval (plus one immediate check) and forwards
/// every observation. No deduplication happens here.
pub struct LockfileWatcher {
  path: PathBuf,
  interval: Duration,
}

impl LockfileWatcher {
  pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
    Self {
      path: path.into(),
      interval,
    }
  }

  pub fn start(
    self,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<LockfileEvent>,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      tracing::info!(path = %self.path.display(), "[Lockfile] Watching");
      let mut ticker = tokio::time::interval(self.interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

      loop {
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => {}
        }

        if let Some(event) = check_lockfile(&self.path).await {
          if events.send(event).is_err() {
            break;
          }
        }
      }
      tracing::debug!("[Lockfile] Watcher stopped");
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[tokio::test]
  async fn present_file_connects_and_missing_file_disconnects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lockfile");

    assert_eq!(check_lockfile(&path).await, Some(LockfileEvent::Disconnected));

    std::fs::write(&path, "Riot Client:4242:51000:pw:https").unwrap();
    match check_lockfile(&path).await {
      Some(LockfileEvent::Connected(creds)) => {
        assert_eq!(creds.port, "51000");
        assert_eq!(creds.pid, Some(4242));
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn partial_file_is_swallowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lockfile");
    std::fs::write(&path, "Riot Client:4242:").unwrap();
    assert_eq!(check_lockfile(&path).await, None);
  }

  #[tokio::test]
  async fn watcher_reports_immediately_and_stops_on_cancel() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lockfile");
    std::fs::write(&path, "Riot Client:1:51000:pw:https").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let handle = LockfileWatcher::new(&path, Duration::from_millis(20)).start(cancel.clone(), tx);

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, LockfileEvent::Connected(_)));

    std::fs::remove_file(&path).unwrap();
    loop {
      if rx.recv().await.unwrap() == LockfileEvent::Disconnected {
        break;
      }
    }

    cancel.cancel();
    handle.await.unwrap();
  }
}
