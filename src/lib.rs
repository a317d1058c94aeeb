// Live match-state tracking for a locally running game client

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::ClientError;
pub use watcher::{event_channel, GameState, MatchWatcher, WatcherEvent};
