// Client module - transports for the local game client API and the remote match servers

pub mod http;
pub mod local;
pub mod remote;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{MatchSnapshot, PresenceEntry};

pub use local::LocalClient;
pub use remote::RemoteMatchClient;

/// What the state engine needs from the local API on every poll tick.
#[async_trait]
pub trait LocalApi: Send + Sync {
  /// Own subject id (puuid) from the chat session, `None` while the session is absent.
  async fn own_subject_id(&self) -> Result<Option<String>, ClientError>;

  async fn presences(&self) -> Result<Vec<PresenceEntry>, ClientError>;
}

/// What the state engine needs from the remote match servers.
#[async_trait]
pub trait RemoteApi: Send + Sync {
  /// Current pregame or core-game match id for `subject_id`, `None` when not in that state.
  async fn player_match_id(
    &self,
    in_pregame: bool,
    subject_id: &str,
  ) -> Result<Option<String>, ClientError>;

  async fn core_match(&self, match_id: &str) -> Result<Option<MatchSnapshot>, ClientError>;

  async fn pregame_match(&self, match_id: &str) -> Result<Option<MatchSnapshot>, ClientError>;

  /// Hover a choice; must be followed by `lock_choice` to commit it.
  async fn select_choice(&self, match_id: &str, choice_id: &str) -> Result<(), ClientError>;

  async fn lock_choice(&self, match_id: &str, choice_id: &str) -> Result<(), ClientError>;

  /// Best effort; 0 means no rank.
  async fn own_rank(&self, subject_id: &str) -> u32;
}
