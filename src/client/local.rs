// Local game client API (https://127.0.0.1:<port>) authenticated with lockfile credentials

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;

use super::http::{build_local_http, execute};
use super::LocalApi;
use crate::error::ClientError;
use crate::types::{ConnectionCredentials, Entitlements, PresenceEntry};

const LOCAL_USERNAME: &str = "riot";
const GAME_PRODUCT: &str = "valorant";

pub struct LocalClient {
  http: reqwest::Client,
  credentials: RwLock<Option<ConnectionCredentials>>,
}

impl LocalClient {
  pub fn new(timeout: Duration) -> Result<Self, ClientError> {
    Ok(Self::with_http(build_local_http(timeout)?))
  }

  fn with_http(http: reqwest::Client) -> Self {
    Self {
      http,
      credentials: RwLock::new(None),
    }
  }

  pub fn set_credentials(&self, credentials: ConnectionCredentials) {
    if let Ok(mut guard) = self.credentials.write() {
      *guard = Some(credentials);
    }
  }

  pub fn clear_credentials(&self) {
    if let Ok(mut guard) = self.credentials.write() {
      *guard = None;
    }
  }

  pub fn credentials(&self) -> Option<ConnectionCredentials> {
    self.credentials.read().ok().and_then(|guard| guard.clone())
  }

  fn endpoint(&self, path: &str) -> Result<(String, HeaderMap), ClientError> {
    let creds = self
      .credentials()
      .ok_or(ClientError::NotReady("local API credentials not set"))?;

    let protocol = if creds.protocol.is_empty() {
      "https"
    } else {
      creds.protocol.as_str()
    };
    let url = format!("{}://127.0.0.1:{}{}", protocol, creds.port, path);

    let auth = general_purpose::STANDARD.encode(format!("{}:{}", LOCAL_USERNAME, creds.password));
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Basic {}", auth))
      .map_err(|e| ClientError::Decode(format!("auth header: {}", e)))?;
    headers.insert(AUTHORIZATION, value);

    Ok((url, headers))
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
    let (url, headers) = self.endpoint(path)?;
    let json = execute(&self.http, Method::GET, &url, headers, None).await?;
    json.map(serde_json::from_value::<T>).transpose().map_err(Into::into)
  }

  pub async fn post<T: DeserializeOwned>(
    &self,
    path: &str,
    body: &Value,
  ) -> Result<Option<T>, ClientError> {
    let (url, headers) = self.endpoint(path)?;
    let json = execute(&self.http, Method::POST, &url, headers, Some(body)).await?;
    json.map(serde_json::from_value::<T>).transpose().map_err(Into::into)
  }

  pub async fn entitlements(&self) -> Result<Option<Entitlements>, ClientError> {
    self.get::<Entitlements>("/entitlements/v1/token").await
  }

  /// Client version as reported by the running product session.
  pub async fn external_session_version(&self) -> Result<Option<String>, ClientError> {
    let sessions = self
      .get::<Value>("/product-session/v1/external-sessions")
      .await?;
    Ok(sessions.as_ref().and_then(version_from_external_sessions))
  }
}

pub(crate) fn version_from_external_sessions(sessions: &Value) -> Option<String> {
  sessions.as_object()?.values().find_map(|session| {
    if session.get("productId").and_then(|v| v.as_str()) != Some(GAME_PRODUCT) {
      return None;
    }
    session
      .get("version")
      .and_then(|v| v.as_str())
      .filter(|v| !v.is_empty())
      .map(|v| v.to_string())
  })
}

#[async_trait]
impl LocalApi for LocalClient {
  async fn own_subject_id(&self) -> Result<Option<String>, ClientError> {
    let session = self.get::<Value>("/chat/v1/session").await?;
    Ok(session.and_then(|s| {
      s.get("puuid")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
    }))
  }

  async fn presences(&self) -> Result<Vec<PresenceEntry>, ClientError> {
    let json = self.get::<Value>("/chat/v4/presences").await?;
    let Some(list) = json.and_then(|mut v| v.get_mut("presences").map(Value::take)) else {
      return Ok(Vec::new());
    };
    Ok(serde_json::from_value::<Vec<PresenceEntry>>(list)?)
  }
}
