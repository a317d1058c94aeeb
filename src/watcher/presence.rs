// Decoding of the game's private presence payload (base64 -> JSON)

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use super::types::GameState;
use crate::error::ClientError;
use crate::types::PresenceEntry;

pub const GAME_PRODUCT: &str = "valorant";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchPresenceData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  session_loop_state: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  match_map: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  queue_id: Option<String>,
}

// Newer clients nest the match fields; older ones put them at the top level.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrivatePresence {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  match_presence_data: Option<MatchPresenceData>,
  #[serde(flatten)]
  legacy: MatchPresenceData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPresence {
  pub loop_state: GameState,
  pub map_id: Option<String>,
  pub queue_id: Option<String>,
}

pub fn decode_private_presence(encoded: &str) -> Result<DecodedPresence, ClientError> {
  let raw = general_purpose::STANDARD.decode(encoded.trim())?;
  let presence: PrivatePresence = serde_json::from_slice(&raw)?;

  let nested = presence.match_presence_data.unwrap_or_default();
  let legacy = presence.legacy;
  let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

  let loop_state = non_empty(nested.session_loop_state).or(non_empty(legacy.session_loop_state));
  Ok(DecodedPresence {
    loop_state: GameState::from_loop_state(loop_state.as_deref()),
    map_id: non_empty(nested.match_map).or(non_empty(legacy.match_map)),
    queue_id: non_empty(nested.queue_id).or(non_empty(legacy.queue_id)),
  })
}

/// Inverse of `decode_private_presence`, in the legacy flat layout.
pub fn encode_private_presence(loop_state: &str, map_id: Option<&str>, queue_id: Option<&str>) -> String {
  let presence = PrivatePresence {
    match_presence_data: None,
    legacy: MatchPresenceData {
      session_loop_state: Some(loop_state.to_string()),
      match_map: map_id.map(|m| m.to_string()),
      queue_id: queue_id.map(|q| q.to_string()),
    },
  };
  let json = serde_json::to_vec(&presence).unwrap_or_default();
  general_purpose::STANDARD.encode(json)
}

/// The presence entry for `subject_id` in this game, if any.
pub fn find_own_presence<'a>(
  presences: &'a [PresenceEntry],
  subject_id: &str,
) -> Option<&'a PresenceEntry> {
  presences
    .iter()
    .find(|p| p.puuid == subject_id && p.product == GAME_PRODUCT)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn b64(value: serde_json::Value) -> String {
    general_purpose::STANDARD.encode(value.to_string())
  }

  #[test]
  fn round_trip_recovers_loop_state_and_map() {
    let encoded = encode_private_presence("INGAME", Some("/Game/Maps/Ascent/Ascent"), None);
    let decoded = decode_private_presence(&encoded).unwrap();
    assert_eq!(decoded.loop_state, GameState::Ingame);
    assert_eq!(decoded.map_id.as_deref(), Some("/Game/Maps/Ascent/Ascent"));
    assert_eq!(decoded.queue_id, None);
  }

  #[test]
  fn nested_fields_win_over_legacy() {
    let encoded = b64(json!({
      "sessionLoopState": "MENUS",
      "matchPresenceData": {
        "sessionLoopState": "PREGAME",
        "matchMap": "/Game/Maps/Bonsai/Bonsai",
        "queueId": "competitive"
      },
      "partyPresenceData": { "partySize": 2 }
    }));
    let decoded = decode_private_presence(&encoded).unwrap();
    assert_eq!(decoded.loop_state, GameState::Pregame);
    assert_eq!(decoded.queue_id.as_deref(), Some("competitive"));
  }

  #[test]
  fn missing_loop_state_defaults_to_menus() {
    let decoded = decode_private_presence(&b64(json!({ "isValid": true }))).unwrap();
    assert_eq!(decoded.loop_state, GameState::Menus);
    assert_eq!(decoded.map_id, None);
  }

  #[test]
  fn garbage_is_decode_error() {
    assert!(matches!(
      decode_private_presence("!!not base64!!"),
      Err(ClientError::Decode(_))
    ));
    let not_json = general_purpose::STANDARD.encode("plain text");
    assert!(decode_private_presence(&not_json).is_err());
  }

  #[test]
  fn own_presence_requires_matching_product() {
    let presences = vec![
      PresenceEntry {
        puuid: "me".to_string(),
        product: "league_of_legends".to_string(),
        private: None,
      },
      PresenceEntry {
        puuid: "me".to_string(),
        product: "valorant".to_string(),
        private: Some("e30=".to_string()),
      },
    ];
    let own = find_own_presence(&presences, "me").unwrap();
    assert_eq!(own.product, "valorant");
    assert!(find_own_presence(&presences, "someone-else").is_none());
  }
}
