// Match watcher service - owns the lockfile, state-poll and liveness schedules

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::MatchStateEngine;
use super::game_log::GameLogReader;
use super::liveness::{is_process_alive, LivenessTracker};
use super::lockfile::{LockfileEvent, LockfileWatcher};
use super::types::{emit, EventSender, TargetSlot, WatcherEvent};
use crate::client::http::build_remote_http;
use crate::client::{LocalClient, RemoteMatchClient};
use crate::config::WatcherConfig;
use crate::error::ClientError;
use crate::types::ConnectionCredentials;

/// State for one detected client run, from connect to disconnect.
struct Session {
  id: u64,
  credentials: ConnectionCredentials,
  cancel: CancellationToken,
}

pub struct MatchWatcher {
  config: WatcherConfig,
  local: Arc<LocalClient>,
  game_log: GameLogReader,
  engine: Arc<Mutex<MatchStateEngine>>,
  target: TargetSlot,
  events: EventSender,
  session: StdMutex<Option<Session>>,
  next_session_id: AtomicU64,
  liveness: StdMutex<LivenessTracker>,
  shutdown: CancellationToken,
}

impl MatchWatcher {
  pub fn new(config: WatcherConfig, events: EventSender) -> Result<Arc<Self>, ClientError> {
    let local = Arc::new(LocalClient::new(config.request_timeout())?);
    let game_log = GameLogReader::new(config.resolved_game_log_path());
    let engine = MatchStateEngine::new(
      local.clone(),
      events.clone(),
      config.auto_action_target.clone(),
    );
    let target = engine.target_slot();

    Ok(Arc::new(Self {
      config,
      local,
      game_log,
      engine: Arc::new(Mutex::new(engine)),
      target,
      events,
      session: StdMutex::new(None),
      next_session_id: AtomicU64::new(1),
      liveness: StdMutex::new(LivenessTracker::default()),
      shutdown: CancellationToken::new(),
    }))
  }

  /// Start the lockfile and liveness schedules. The state poll starts on connect.
  pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<LockfileEvent>();
    let lockfile = LockfileWatcher::new(
      self.config.resolved_lockfile_path(),
      self.config.lockfile_poll_interval(),
    )
    .start(self.shutdown.child_token(), tx);

    let this = self.clone();
    let dispatcher = tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        match event {
          LockfileEvent::Connected(creds) => this.handle_connect(creds).await,
          LockfileEvent::Disconnected => this.handle_disconnect().await,
        }
      }
    });

    let liveness = self.clone().spawn_liveness_check();
    vec![lockfile, dispatcher, liveness]
  }

  /// Cancel every schedule and tear the current session down.
  pub async fn stop(&self) {
    tracing::info!("[Watcher] Stopping");
    self.shutdown.cancel();
    self.handle_disconnect().await;
  }

  /// Applies at once, even while a poll tick is waiting on the network.
  pub fn set_auto_action_target(&self, target: Option<String>) {
    tracing::info!(choice = ?target, "[Watcher] Auto-action target updated");
    self.target.set(target);
  }

  pub fn is_connected(&self) -> bool {
    self
      .session
      .lock()
      .map(|s| s.is_some())
      .unwrap_or(false)
  }

  pub fn engine(&self) -> Arc<Mutex<MatchStateEngine>> {
    self.engine.clone()
  }

  pub async fn handle_connect(self: &Arc<Self>, credentials: ConnectionCredentials) {
    if self.shutdown.is_cancelled() {
      return;
    }

    let (session_id, cancel, replaced) = {
      let Ok(mut guard) = self.session.lock() else {
        return;
      };
      if let Some(current) = guard.as_ref() {
        if current.credentials == credentials {
          return;
        }
      }
      let replaced = guard.take();
      if let Some(old) = &replaced {
        old.cancel.cancel();
      }
      let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
      let cancel = self.shutdown.child_token();
      *guard = Some(Session {
        id,
        credentials: credentials.clone(),
        cancel: cancel.clone(),
      });
      (id, cancel, replaced.is_some())
    };

    if replaced {
      tracing::info!("[Watcher] Lockfile credentials changed, reconnecting");
      self.engine.lock().await.reset();
    }

    tracing::info!(
      session = session_id,
      port = %credentials.port,
      pid = ?credentials.pid,
      "[Watcher] Game client detected"
    );
    self.local.set_credentials(credentials.clone());
    if let Ok(mut tracker) = self.liveness.lock() {
      tracker.watch(credentials.pid);
    }
    if !replaced {
      emit(&self.events, WatcherEvent::ConnectionChanged { connected: true });
    }

    self.clone().spawn_state_poll(cancel.clone());
    self.clone().spawn_remote_bootstrap(session_id, cancel);
  }

  /// Idempotent: a disconnect while already disconnected does nothing.
  pub async fn handle_disconnect(&self) {
    let session = match self.session.lock() {
      Ok(mut guard) => guard.take(),
      Err(_) => None,
    };
    let Some(session) = session else {
      return;
    };

    tracing::info!(session = session.id, "[Watcher] Game client gone, resetting");
    session.cancel.cancel();
    self.local.clear_credentials();
    if let Ok(mut tracker) = self.liveness.lock() {
      tracker.clear();
    }
    self.engine.lock().await.reset();
    emit(&self.events, WatcherEvent::ConnectionChanged { connected: false });
  }

  fn current_session_id(&self) -> Option<u64> {
    self.session.lock().ok().and_then(|s| s.as_ref().map(|s| s.id))
  }

  fn spawn_state_poll(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(self.config.state_poll_interval());
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

      loop {
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => {}
        }

        let mut engine = self.engine.lock().await;
        if cancel.is_cancelled() {
          break;
        }
        if let Err(e) = engine.tick().await {
          tracing::debug!(error = %e, "[Watcher] Poll tick failed, retrying next tick");
        }
      }
      tracing::debug!("[Watcher] State poll stopped");
    })
  }

  fn spawn_remote_bootstrap(
    self: Arc<Self>,
    session_id: u64,
    cancel: CancellationToken,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(self.config.remote_init_delay()) => {}
      }

      let result = match build_remote_http(self.config.request_timeout()) {
        Ok(http) => {
          let mut remote = RemoteMatchClient::new(http);
          match remote.initialize(&self.local, &self.game_log).await {
            Ok(()) => Ok(remote),
            Err(e) => Err(e),
          }
        }
        Err(e) => Err(e),
      };

      let mut engine = self.engine.lock().await;
      if cancel.is_cancelled() || self.current_session_id() != Some(session_id) {
        tracing::debug!(session = session_id, "[Watcher] Discarding stale remote bootstrap");
        return;
      }

      match result {
        Ok(remote) => engine.set_remote(Arc::new(remote)),
        Err(e) => {
          tracing::warn!(error = %e, "[Watcher] Remote API bootstrap failed");
          engine.mark_remote_unavailable();
        }
      }
    })
  }

  fn spawn_liveness_check(self: Arc<Self>) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(self.config.liveness_interval());
      ticker.tick().await;

      loop {
        tokio::select! {
          _ = self.shutdown.cancelled() => break,
          _ = ticker.tick() => {}
        }

        let pid = self.liveness.lock().ok().and_then(|t| t.pid());
        let Some(pid) = pid else {
          continue;
        };
        let alive = tokio::task::spawn_blocking(move || is_process_alive(pid))
          .await
          .unwrap_or(true);

        let exited = self
          .liveness
          .lock()
          .map(|mut t| t.pid() == Some(pid) && t.observe(alive))
          .unwrap_or(false);
        if exited {
          tracing::info!(pid, "[Watcher] Game client process exited");
          emit(&self.events, WatcherEvent::ClientProcessExited);
        }
      }
    })
  }
}
