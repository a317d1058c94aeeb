// Types shared across the watcher: game state, auto-action target, outbound events

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::types::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
  Unknown,
  Menus,
  Pregame,
  Ingame,
}

impl GameState {
  /// Map a presence `sessionLoopState`; anything unrecognized counts as menus.
  pub fn from_loop_state(value: Option<&str>) -> Self {
    match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
      Some("PREGAME") => Self::Pregame,
      Some("INGAME") => Self::Ingame,
      _ => Self::Menus,
    }
  }

  pub fn is_match(&self) -> bool {
    matches!(self, Self::Pregame | Self::Ingame)
  }
}

/// Shared slot for the auto-action target. The control command writes it without
/// waiting for a poll tick to finish.
#[derive(Debug, Clone, Default)]
pub struct TargetSlot(Arc<RwLock<Option<String>>>);

impl TargetSlot {
  pub fn new(target: Option<String>) -> Self {
    let slot = Self::default();
    slot.set(target);
    slot
  }

  /// An empty id clears the target.
  pub fn set(&self, target: Option<String>) {
    if let Ok(mut guard) = self.0.write() {
      *guard = target.filter(|t| !t.is_empty());
    }
  }

  pub fn get(&self) -> Option<String> {
    self.0.read().ok().and_then(|guard| guard.clone())
  }
}

/// User-chosen selection to submit automatically during pregame.
#[derive(Debug, Clone, Default)]
pub struct AutoActionTarget {
  slot: TargetSlot,
  /// Set once an attempt has succeeded (or can never succeed) for the active match.
  pub attempted: bool,
}

impl AutoActionTarget {
  pub fn new(target: Option<String>) -> Self {
    Self {
      slot: TargetSlot::new(target),
      attempted: false,
    }
  }

  pub fn target(&self) -> Option<String> {
    self.slot.get()
  }

  pub fn slot(&self) -> &TargetSlot {
    &self.slot
  }

  pub fn pending(&self) -> Option<String> {
    if self.attempted {
      return None;
    }
    self.slot.get()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
  pub state: GameState,
  pub match_id: Option<String>,
  pub map_id: Option<String>,
  pub queue_id: Option<String>,
  pub roster: Vec<RosterEntry>,
  /// Own rank from the player-data service; a separate scale from roster badge tiers.
  pub own_rank: Option<u32>,
}

impl StateSnapshot {
  pub fn bare(state: GameState) -> Self {
    Self {
      state,
      match_id: None,
      map_id: None,
      queue_id: None,
      roster: Vec::new(),
      own_rank: None,
    }
  }
}

/// Events pushed to the presentation boundary. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum WatcherEvent {
  ConnectionChanged { connected: bool },
  StateChanged(StateSnapshot),
  AutoActionSucceeded { target: String },
  ClientProcessExited,
}

pub type EventSender = mpsc::UnboundedSender<WatcherEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<WatcherEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
  mpsc::unbounded_channel()
}

/// A closed receiver only means nobody is listening any more.
pub(crate) fn emit(events: &EventSender, event: WatcherEvent) {
  tracing::debug!(?event, "[Watcher] Emitting event");
  let _ = events.send(event);
}
