// Match state engine - turns presence + remote lookups into state events

use std::sync::Arc;

use super::presence::{decode_private_presence, find_own_presence, DecodedPresence};
use super::types::{
  emit, AutoActionTarget, EventSender, GameState, StateSnapshot, TargetSlot, WatcherEvent,
};
use crate::client::{LocalApi, RemoteApi};
use crate::error::ClientError;
use crate::types::{MatchSnapshot, RosterEntry};

/// Availability of the remote API for the current connection.
#[derive(Clone)]
pub enum RemoteSlot {
  /// Bootstrap still running (or not started yet).
  Pending,
  Ready(Arc<dyn RemoteApi>),
  /// Bootstrap failed; stays this way until the next connect.
  Unavailable,
}

impl RemoteSlot {
  fn ready(&self) -> Option<Arc<dyn RemoteApi>> {
    match self {
      Self::Ready(api) => Some(api.clone()),
      _ => None,
    }
  }
}

/// Roster for one match, replaced wholesale when the match changes.
#[derive(Debug, Clone)]
struct RosterCache {
  state: GameState,
  match_id: String,
  map_id: Option<String>,
  queue_id: Option<String>,
  roster: Vec<RosterEntry>,
  own_rank: Option<u32>,
}

pub struct MatchStateEngine {
  local: Arc<dyn LocalApi>,
  remote: RemoteSlot,
  events: EventSender,
  state: GameState,
  match_id: Option<String>,
  presence: Option<DecodedPresence>,
  roster: Option<RosterCache>,
  auto_action: AutoActionTarget,
}

impl MatchStateEngine {
  pub fn new(local: Arc<dyn LocalApi>, events: EventSender, target: Option<String>) -> Self {
    Self {
      local,
      remote: RemoteSlot::Pending,
      events,
      state: GameState::Unknown,
      match_id: None,
      presence: None,
      roster: None,
      auto_action: AutoActionTarget::new(target),
    }
  }

  pub fn state(&self) -> GameState {
    self.state
  }

  pub fn match_id(&self) -> Option<&str> {
    self.match_id.as_deref()
  }

  pub fn auto_action(&self) -> &AutoActionTarget {
    &self.auto_action
  }

  pub fn remote_slot(&self) -> &RemoteSlot {
    &self.remote
  }

  pub fn set_remote(&mut self, remote: Arc<dyn RemoteApi>) {
    tracing::info!("[Engine] Remote API ready");
    self.remote = RemoteSlot::Ready(remote);
  }

  pub fn mark_remote_unavailable(&mut self) {
    tracing::warn!("[Engine] Remote API unavailable, continuing with local data only");
    self.remote = RemoteSlot::Unavailable;
  }

  /// Control command: set or clear the auto-action target.
  pub fn set_auto_action_target(&mut self, target: Option<String>) {
    self.auto_action.slot().set(target);
  }

  /// Handle for writing the target while a tick holds the engine.
  pub fn target_slot(&self) -> TargetSlot {
    self.auto_action.slot().clone()
  }

  /// Back to UNKNOWN; the remote API must be bootstrapped again after the next connect.
  pub fn reset(&mut self) {
    let was_known = self.state != GameState::Unknown;
    self.state = GameState::Unknown;
    self.match_id = None;
    self.presence = None;
    self.roster = None;
    self.remote = RemoteSlot::Pending;
    self.auto_action.attempted = false;
    if was_known {
      emit(&self.events, WatcherEvent::StateChanged(StateSnapshot::bare(GameState::Unknown)));
    }
  }

  /// One poll tick. Errors are transient local API failures; the caller logs and retries.
  pub async fn tick(&mut self) -> Result<(), ClientError> {
    let Some(subject_id) = self.local.own_subject_id().await? else {
      tracing::debug!("[Engine] No chat session yet");
      return Ok(());
    };

    let presences = self.local.presences().await?;
    let Some(own) = find_own_presence(&presences, &subject_id) else {
      // Game closed while the launcher keeps the lockfile alive.
      if self.state.is_match() {
        tracing::info!(state = ?self.state, "[Engine] Own game presence gone, back to menus");
        self.presence = None;
        self.enter_menus();
      } else {
        tracing::debug!("[Engine] Own game presence not found");
      }
      return Ok(());
    };

    let presence = match own.private.as_deref().filter(|p| !p.is_empty()) {
      Some(encoded) => decode_private_presence(encoded)?,
      None => return Ok(()),
    };

    let next = presence.loop_state;
    self.presence = Some(presence);

    match next {
      GameState::Pregame | GameState::Ingame => {
        self.track_match(next, &subject_id).await;
        if next == GameState::Pregame {
          self.try_auto_action().await;
        }
      }
      _ => self.enter_menus(),
    }
    Ok(())
  }

  fn enter_menus(&mut self) {
    if self.state == GameState::Menus {
      return;
    }
    self.state = GameState::Menus;
    self.set_match_id(None);
    self.roster = None;
    emit(&self.events, WatcherEvent::StateChanged(StateSnapshot::bare(GameState::Menus)));
  }

  fn set_match_id(&mut self, match_id: Option<String>) {
    if self.match_id != match_id {
      self.match_id = match_id;
      self.auto_action.attempted = false;
    }
  }

  async fn track_match(&mut self, next: GameState, subject_id: &str) {
    let entered = self.state != next;
    let remote = self.remote.ready();
    let in_pregame = next == GameState::Pregame;

    let mut resolved = None;
    if let Some(remote) = &remote {
      match remote.player_match_id(in_pregame, subject_id).await {
        Ok(id) => resolved = id.filter(|id| !id.is_empty()),
        Err(e) => tracing::warn!(error = %e, state = ?next, "[Engine] Match id lookup failed"),
      }
    }

    let previous = self.match_id.clone();
    // Keep the known id across a failed lookup unless the state itself changed.
    if entered || resolved.is_some() {
      self.set_match_id(resolved);
    }
    let id_changed = self.match_id != previous;

    let mut roster_updated = false;
    if let (Some(remote), Some(match_id)) = (&remote, self.match_id.clone()) {
      let cached = self
        .roster
        .as_ref()
        .map_or(false, |c| c.state == next && c.match_id == match_id);
      if !cached {
        roster_updated = self.refresh_roster(remote.as_ref(), next, &match_id, subject_id).await;
      }
    }

    self.state = next;
    if entered || id_changed || roster_updated {
      let snapshot = self.snapshot();
      emit(&self.events, WatcherEvent::StateChanged(snapshot));
    }
  }

  /// Fetch the full roster for `match_id`. On failure the cache stays empty so the
  /// next tick retries.
  async fn refresh_roster(
    &mut self,
    remote: &dyn RemoteApi,
    state: GameState,
    match_id: &str,
    subject_id: &str,
  ) -> bool {
    let result = if state == GameState::Pregame {
      remote.pregame_match(match_id).await
    } else {
      remote.core_match(match_id).await
    };

    let snapshot: MatchSnapshot = match result {
      Ok(Some(snapshot)) => snapshot,
      Ok(None) => {
        tracing::debug!(match_id, "[Engine] Match not found yet");
        self.roster = None;
        return false;
      }
      Err(e) => {
        tracing::warn!(match_id, error = %e, "[Engine] Roster fetch failed");
        self.roster = None;
        return false;
      }
    };

    let own_tier = snapshot
      .roster
      .iter()
      .find(|p| p.subject_id == subject_id)
      .map(|p| p.competitive_tier)
      .unwrap_or(0);
    let own_rank = if own_tier == 0 {
      Some(remote.own_rank(subject_id).await).filter(|r| *r > 0)
    } else {
      None
    };

    tracing::info!(
      match_id,
      players = snapshot.roster.len(),
      state = ?state,
      "[Engine] Roster updated"
    );

    self.roster = Some(RosterCache {
      state,
      match_id: match_id.to_string(),
      map_id: snapshot.map_id,
      queue_id: snapshot.queue_id,
      roster: snapshot.roster,
      own_rank,
    });
    true
  }

  fn snapshot(&self) -> StateSnapshot {
    let presence = self.presence.as_ref();
    let cache = self
      .roster
      .as_ref()
      .filter(|c| c.state == self.state && Some(&c.match_id) == self.match_id.as_ref());

    StateSnapshot {
      state: self.state,
      match_id: self.match_id.clone(),
      map_id: cache
        .and_then(|c| c.map_id.clone())
        .or_else(|| presence.and_then(|p| p.map_id.clone())),
      queue_id: cache
        .and_then(|c| c.queue_id.clone())
        .or_else(|| presence.and_then(|p| p.queue_id.clone())),
      roster: cache.map(|c| c.roster.clone()).unwrap_or_default(),
      own_rank: cache.and_then(|c| c.own_rank),
    }
  }

  async fn try_auto_action(&mut self) {
    let Some(target) = self.auto_action.pending() else {
      return;
    };

    let remote = match &self.remote {
      RemoteSlot::Ready(remote) => remote.clone(),
      RemoteSlot::Pending => return,
      RemoteSlot::Unavailable => {
        tracing::warn!(choice = %target, "[Engine] Auto-action skipped, remote API never became ready");
        self.auto_action.attempted = true;
        return;
      }
    };

    let Some(match_id) = self.match_id.clone() else {
      return;
    };

    let result = match remote.select_choice(&match_id, &target).await {
      Ok(()) => remote.lock_choice(&match_id, &target).await,
      Err(e) => Err(e),
    };

    match result {
      Ok(()) => {
        tracing::info!(match_id, choice = %target, "[Engine] Auto-action locked in");
        self.auto_action.attempted = true;
        emit(&self.events, WatcherEvent::AutoActionSucceeded { target });
      }
      Err(e) => {
        tracing::warn!(match_id, choice = %target, error = %e, "[Engine] Auto-action failed, retrying next tick");
      }
    }
  }
}
