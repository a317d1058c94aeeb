// Remote match servers (GLZ for match operations, PD for player data)

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

use super::http::execute;
use super::local::LocalClient;
use super::RemoteApi;
use crate::error::ClientError;
use crate::types::{Entitlements, MatchSnapshot, RosterEntry, ServerLocation};
use crate::watcher::game_log::GameLogReader;

const ENTITLEMENTS_HEADER: &str = "x-riot-entitlements-jwt";
const PLATFORM_HEADER: &str = "x-riot-clientplatform";
const VERSION_HEADER: &str = "x-riot-clientversion";

static CLIENT_PLATFORM: Lazy<String> = Lazy::new(|| {
  let platform = serde_json::json!({
    "platformType": "PC",
    "platformOS": "Windows",
    "platformOSVersion": "10.0.19042.1.256.64bit",
    "platformChipset": "Unknown"
  });
  general_purpose::STANDARD.encode(platform.to_string())
});

pub struct RemoteMatchClient {
  http: reqwest::Client,
  location: Option<ServerLocation>,
  version: Option<String>,
  entitlements: Option<Entitlements>,
}

impl RemoteMatchClient {
  pub fn new(http: reqwest::Client) -> Self {
    Self {
      http,
      location: None,
      version: None,
      entitlements: None,
    }
  }

  /// One-time bootstrap: server location from the log, version from the log or the
  /// local product session, entitlements from the local API.
  pub async fn initialize(
    &mut self,
    local: &LocalClient,
    game_log: &GameLogReader,
  ) -> Result<(), ClientError> {
    let location = game_log.extract_server_location().await.ok_or_else(|| {
      ClientError::Initialization(format!(
        "no server location in {}",
        game_log.path().display()
      ))
    })?;

    let mut version = game_log.extract_client_version().await;
    if version.is_none() {
      match local.external_session_version().await {
        Ok(v) => version = v,
        Err(e) => tracing::debug!(error = %e, "[Remote] External session version lookup failed"),
      }
    }

    let entitlements = local
      .entitlements()
      .await?
      .ok_or_else(|| ClientError::Initialization("no entitlements token".to_string()))?;

    tracing::info!(
      region = %location.region,
      shard = %location.shard,
      version = version.as_deref().unwrap_or("unknown"),
      "[Remote] Initialized"
    );

    self.location = Some(location);
    self.version = version;
    self.entitlements = Some(entitlements);
    Ok(())
  }

  pub fn is_ready(&self) -> bool {
    self.location.is_some() && self.entitlements.is_some()
  }

  fn ready_parts(&self) -> Result<(&ServerLocation, &Entitlements), ClientError> {
    match (&self.location, &self.entitlements) {
      (Some(loc), Some(ent)) => Ok((loc, ent)),
      _ => Err(ClientError::NotReady("remote API not initialized")),
    }
  }

  fn glz_url(&self, path: &str) -> Result<String, ClientError> {
    let (loc, _) = self.ready_parts()?;
    Ok(format!(
      "https://glz-{}-1.{}.a.pvp.net{}",
      loc.region, loc.shard, path
    ))
  }

  fn pd_url(&self, path: &str) -> Result<String, ClientError> {
    let (loc, _) = self.ready_parts()?;
    Ok(format!("https://pd.{}.a.pvp.net{}", loc.shard, path))
  }

  fn headers(&self) -> Result<HeaderMap, ClientError> {
    let (_, ent) = self.ready_parts()?;
    let mut headers = HeaderMap::new();
    headers.insert(
      AUTHORIZATION,
      header_value(&format!("Bearer {}", ent.access_token))?,
    );
    headers.insert(
      HeaderName::from_static(ENTITLEMENTS_HEADER),
      header_value(&ent.entitlements_token)?,
    );
    headers.insert(
      HeaderName::from_static(PLATFORM_HEADER),
      header_value(&CLIENT_PLATFORM)?,
    );
    if let Some(version) = &self.version {
      headers.insert(HeaderName::from_static(VERSION_HEADER), header_value(version)?);
    }
    Ok(headers)
  }

  async fn glz(&self, method: Method, path: &str) -> Result<Option<Value>, ClientError> {
    let url = self.glz_url(path)?;
    let headers = self.headers()?;
    execute(&self.http, method, &url, headers, None).await
  }
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
  HeaderValue::from_str(value).map_err(|e| ClientError::Decode(format!("header value: {}", e)))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
  value
    .get(key)
    .and_then(|v| v.as_str())
    .filter(|s| !s.is_empty())
    .map(|s| s.to_string())
}

fn u32_field(value: &Value, key: &str) -> u32 {
  value
    .get(key)
    .and_then(|v| v.as_u64())
    .and_then(|v| u32::try_from(v).ok())
    .unwrap_or(0)
}

fn roster_entry(player: &Value, team_id: Option<String>) -> Option<RosterEntry> {
  let subject_id = str_field(player, "Subject")?;
  let identity = player.get("PlayerIdentity").cloned().unwrap_or(Value::Null);
  let badge_tier = player
    .get("SeasonalBadgeInfo")
    .map(|b| u32_field(b, "Rank"))
    .unwrap_or(0);
  let competitive_tier = match u32_field(player, "CompetitiveTier") {
    0 => badge_tier,
    tier => tier,
  };

  Some(RosterEntry {
    subject_id,
    team_id: team_id.or_else(|| str_field(player, "TeamID")),
    character_id: str_field(player, "CharacterID"),
    account_level: u32_field(&identity, "AccountLevel"),
    competitive_tier,
    selection_state: str_field(player, "CharacterSelectionState"),
  })
}

/// Pregame payload: only the own team is visible, under `AllyTeam`.
pub fn parse_pregame_match(match_id: &str, json: &Value) -> MatchSnapshot {
  let ally = json.get("AllyTeam").cloned().unwrap_or(Value::Null);
  let team_id = str_field(&ally, "TeamID");
  let roster = ally
    .get("Players")
    .and_then(|p| p.as_array())
    .map(|players| {
      players
        .iter()
        .filter_map(|p| roster_entry(p, team_id.clone()))
        .collect()
    })
    .unwrap_or_default();

  MatchSnapshot {
    match_id: str_field(json, "ID").unwrap_or_else(|| match_id.to_string()),
    map_id: str_field(json, "MapID"),
    queue_id: str_field(json, "QueueID"),
    roster,
  }
}

pub fn parse_core_match(match_id: &str, json: &Value) -> MatchSnapshot {
  let roster = json
    .get("Players")
    .and_then(|p| p.as_array())
    .map(|players| players.iter().filter_map(|p| roster_entry(p, None)).collect())
    .unwrap_or_default();

  MatchSnapshot {
    match_id: str_field(json, "MatchID").unwrap_or_else(|| match_id.to_string()),
    map_id: str_field(json, "MapID"),
    queue_id: json
      .get("MatchmakingData")
      .and_then(|m| str_field(m, "QueueID")),
    roster,
  }
}

#[async_trait]
impl RemoteApi for RemoteMatchClient {
  async fn player_match_id(
    &self,
    in_pregame: bool,
    subject_id: &str,
  ) -> Result<Option<String>, ClientError> {
    let path = if in_pregame {
      format!("/pregame/v1/players/{}", subject_id)
    } else {
      format!("/core-game/v1/players/{}", subject_id)
    };
    let json = self.glz(Method::GET, &path).await?;
    Ok(json.and_then(|j| str_field(&j, "MatchID")))
  }

  async fn core_match(&self, match_id: &str) -> Result<Option<MatchSnapshot>, ClientError> {
    let path = format!("/core-game/v1/matches/{}", match_id);
    let json = self.glz(Method::GET, &path).await?;
    Ok(json.map(|j| parse_core_match(match_id, &j)))
  }

  async fn pregame_match(&self, match_id: &str) -> Result<Option<MatchSnapshot>, ClientError> {
    let path = format!("/pregame/v1/matches/{}", match_id);
    let json = self.glz(Method::GET, &path).await?;
    Ok(json.map(|j| parse_pregame_match(match_id, &j)))
  }

  async fn select_choice(&self, match_id: &str, choice_id: &str) -> Result<(), ClientError> {
    let path = format!("/pregame/v1/matches/{}/select/{}", match_id, choice_id);
    tracing::info!(match_id, choice_id, "[Remote] Selecting");
    self
      .glz(Method::POST, &path)
      .await?
      .ok_or_else(|| ClientError::Status {
        status: 404,
        url: path.clone(),
      })?;
    Ok(())
  }

  async fn lock_choice(&self, match_id: &str, choice_id: &str) -> Result<(), ClientError> {
    let path = format!("/pregame/v1/matches/{}/lock/{}", match_id, choice_id);
    tracing::info!(match_id, choice_id, "[Remote] Locking");
    self
      .glz(Method::POST, &path)
      .await?
      .ok_or_else(|| ClientError::Status {
        status: 404,
        url: path.clone(),
      })?;
    Ok(())
  }

  async fn own_rank(&self, subject_id: &str) -> u32 {
    let url = match self.pd_url(&format!("/mmr/v1/players/{}", subject_id)) {
      Ok(url) => url,
      Err(_) => return 0,
    };
    let headers = match self.headers() {
      Ok(h) => h,
      Err(_) => return 0,
    };

    match execute(&self.http, Method::GET, &url, headers, None).await {
      Ok(Some(json)) => json
        .get("LatestCompetitiveUpdate")
        .map(|u| u32_field(u, "TierAfterUpdate"))
        .unwrap_or(0),
      Ok(None) => 0,
      Err(e) => {
        tracing::debug!(error = %e, "[Remote] Own rank lookup failed");
        0
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::time::Duration;

  fn ready_client() -> RemoteMatchClient {
    let mut client = RemoteMatchClient::new(reqwest::Client::new());
    client.location = Some(ServerLocation {
      region: "eu".to_string(),
      shard: "eu".to_string(),
    });
    client.entitlements = Some(Entitlements {
      access_token: "access".to_string(),
      entitlements_token: "jwt".to_string(),
      subject_id: "me".to_string(),
    });
    client
  }

  #[tokio::test]
  async fn uninitialized_client_is_not_ready() {
    let client = RemoteMatchClient::new(reqwest::Client::new());
    assert!(!client.is_ready());

    let err = client.player_match_id(true, "me").await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(client.own_rank("me").await, 0);
  }

  #[tokio::test]
  async fn initialize_fails_without_server_location() {
    let local = LocalClient::new(Duration::from_secs(1)).unwrap();
    let log = GameLogReader::new("/definitely/not/here/ShooterGame.log");
    let mut client = RemoteMatchClient::new(reqwest::Client::new());

    let err = client.initialize(&local, &log).await.unwrap_err();
    assert!(matches!(err, ClientError::Initialization(_)));
    assert!(!client.is_ready());
  }

  #[test]
  fn urls_and_headers_follow_location() {
    let mut client = ready_client();
    assert_eq!(
      client.glz_url("/pregame/v1/players/me").unwrap(),
      "https://glz-eu-1.eu.a.pvp.net/pregame/v1/players/me"
    );
    assert_eq!(
      client.pd_url("/mmr/v1/players/me").unwrap(),
      "https://pd.eu.a.pvp.net/mmr/v1/players/me"
    );

    let headers = client.headers().unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer access");
    assert_eq!(headers.get(ENTITLEMENTS_HEADER).unwrap(), "jwt");
    assert!(headers.get(PLATFORM_HEADER).is_some());
    assert!(headers.get(VERSION_HEADER).is_none());

    client.version = Some("release-09.11-shipping-12-2885612".to_string());
    let headers = client.headers().unwrap();
    assert_eq!(
      headers.get(VERSION_HEADER).unwrap(),
      "release-09.11-shipping-12-2885612"
    );
  }

  #[test]
  fn pregame_payload_maps_ally_team() {
    let payload = json!({
      "ID": "match-1",
      "MapID": "/Game/Maps/Ascent/Ascent",
      "QueueID": "competitive",
      "AllyTeam": {
        "TeamID": "Blue",
        "Players": [
          {
            "Subject": "me",
            "CharacterID": "add6443a-41bd-e414-f6ad-e58d267f4e95",
            "CharacterSelectionState": "selected",
            "CompetitiveTier": 12,
            "PlayerIdentity": { "AccountLevel": 120 },
            "SeasonalBadgeInfo": { "Rank": 9 }
          },
          {
            "Subject": "mate",
            "CharacterID": "",
            "CharacterSelectionState": "",
            "PlayerIdentity": { "AccountLevel": 33 },
            "SeasonalBadgeInfo": { "Rank": 7 }
          }
        ]
      }
    });

    let snapshot = parse_pregame_match("fallback", &payload);
    assert_eq!(snapshot.match_id, "match-1");
    assert_eq!(snapshot.queue_id.as_deref(), Some("competitive"));
    assert_eq!(snapshot.roster.len(), 2);

    let me = &snapshot.roster[0];
    assert_eq!(me.team_id.as_deref(), Some("Blue"));
    assert_eq!(me.selection_state.as_deref(), Some("selected"));
    assert_eq!(me.competitive_tier, 12);
    assert_eq!(me.account_level, 120);

    let mate = &snapshot.roster[1];
    assert_eq!(mate.character_id, None);
    assert_eq!(mate.selection_state, None);
    assert_eq!(mate.competitive_tier, 7);
  }

  #[test]
  fn core_payload_maps_all_players() {
    let payload = json!({
      "MatchID": "core-1",
      "MapID": "/Game/Maps/Bonsai/Bonsai",
      "MatchmakingData": { "QueueID": "unrated" },
      "Players": [
        { "Subject": "a", "TeamID": "Red", "CharacterID": "c1", "PlayerIdentity": { "AccountLevel": 5 }, "SeasonalBadgeInfo": { "Rank": 0 } },
        { "Subject": "b", "TeamID": "Blue", "CharacterID": "c2", "PlayerIdentity": { "AccountLevel": 6 }, "SeasonalBadgeInfo": { "Rank": 15 } },
        { "TeamID": "Blue" }
      ]
    });

    let snapshot = parse_core_match("core-1", &payload);
    assert_eq!(snapshot.queue_id.as_deref(), Some("unrated"));
    assert_eq!(snapshot.roster.len(), 2);
    assert_eq!(snapshot.roster[0].team_id.as_deref(), Some("Red"));
    assert_eq!(snapshot.roster[1].competitive_tier, 15);
  }

  #[test]
  fn oversized_numbers_read_as_zero() {
    let player = json!({
      "Subject": "me",
      "CompetitiveTier": 4_294_967_297u64,
      "PlayerIdentity": { "AccountLevel": 5_000_000_000u64 },
      "SeasonalBadgeInfo": { "Rank": 3 }
    });

    assert_eq!(u32_field(&player, "CompetitiveTier"), 0);
    let entry = roster_entry(&player, None).unwrap();
    assert_eq!(entry.account_level, 0);
    assert_eq!(entry.competitive_tier, 3);
  }
}
