use serde::{Deserialize, Serialize};

// Data structures shared by the clients and the watcher

/// Connection details for the game client's local API, parsed from the lockfile.
///
/// Format is `name:pid:port:password:protocol`; only the last three are needed to
/// connect, `pid` is kept for the liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCredentials {
  pub name: String,
  pub pid: Option<u32>,
  pub port: String,
  pub password: String,
  pub protocol: String,
}

impl ConnectionCredentials {
  pub fn parse(content: &str) -> Option<Self> {
    let parts: Vec<&str> = content.trim().split(':').collect();
    if parts.len() < 5 {
      return None;
    }

    Some(Self {
      name: parts[0].to_string(),
      pid: parts[1].trim().parse::<u32>().ok(),
      port: parts[2].to_string(),
      password: parts[3].to_string(),
      protocol: parts[4].to_string(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLocation {
  pub region: String,
  pub shard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entitlements {
  #[serde(rename = "accessToken")]
  pub access_token: String,
  #[serde(rename = "token")]
  pub entitlements_token: String,
  #[serde(rename = "subject")]
  pub subject_id: String,
}

/// One entry of the local chat presence list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresenceEntry {
  #[serde(default)]
  pub puuid: String,
  #[serde(default)]
  pub product: String,
  /// Base64-encoded JSON payload carrying the game's session state.
  #[serde(default)]
  pub private: Option<String>,
}

/// One player in a pregame or in-game roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
  pub subject_id: String,
  pub team_id: Option<String>,
  pub character_id: Option<String>,
  pub account_level: u32,
  /// Seasonal badge tier as reported in the match payload.
  pub competitive_tier: u32,
  pub selection_state: Option<String>,
}

/// Roster plus match metadata returned by a pregame or core-game lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchSnapshot {
  pub match_id: String,
  pub map_id: Option<String>,
  pub queue_id: Option<String>,
  pub roster: Vec<RosterEntry>,
}
