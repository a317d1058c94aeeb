// Watcher module - detects the game client and tracks menus/pregame/ingame state

pub mod engine;
pub mod game_log;
pub mod liveness;
pub mod lockfile;
pub mod presence;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public types and functions
pub use engine::{MatchStateEngine, RemoteSlot};
pub use game_log::GameLogReader;
pub use lockfile::{check_lockfile, LockfileEvent, LockfileWatcher};
pub use service::MatchWatcher;
pub use types::{
  event_channel, AutoActionTarget, EventReceiver, EventSender, GameState, StateSnapshot,
  TargetSlot, WatcherEvent,
};
