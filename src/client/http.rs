// Shared request execution for the local and remote clients

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::ClientError;

/// Client for the game client's embedded API. It presents a self-signed certificate,
/// so verification is disabled here and only here.
pub fn build_local_http(timeout: Duration) -> Result<reqwest::Client, ClientError> {
  let client = reqwest::Client::builder()
    .danger_accept_invalid_certs(true)
    .timeout(timeout)
    .connect_timeout(Duration::from_secs(2))
    .pool_max_idle_per_host(2)
    .build()?;
  Ok(client)
}

/// Client for the remote GLZ/PD servers, with normal certificate validation.
pub fn build_remote_http(timeout: Duration) -> Result<reqwest::Client, ClientError> {
  let client = reqwest::Client::builder().timeout(timeout).build()?;
  Ok(client)
}

/// Send one JSON request and apply the response contract shared by both servers.
pub async fn execute(
  http: &reqwest::Client,
  method: Method,
  url: &str,
  headers: HeaderMap,
  body: Option<&Value>,
) -> Result<Option<Value>, ClientError> {
  let mut request = http.request(method.clone(), url).headers(headers);
  if let Some(body) = body {
    request = request.json(body);
  }

  let response = request.send().await?;
  let status = response.status();
  let bytes = response.bytes().await?;

  tracing::trace!(%method, url, status = status.as_u16(), len = bytes.len(), "[HTTP] Response");
  interpret_response(status, &bytes, url)
}

/// 2xx with an empty body is `{}`, 404 is `None`, anything else non-2xx is an error.
pub fn interpret_response(
  status: StatusCode,
  body: &[u8],
  url: &str,
) -> Result<Option<Value>, ClientError> {
  if status == StatusCode::NOT_FOUND {
    return Ok(None);
  }

  if !status.is_success() {
    return Err(ClientError::Status {
      status: status.as_u16(),
      url: url.to_string(),
    });
  }

  if body.iter().all(|b| b.is_ascii_whitespace()) {
    return Ok(Some(Value::Object(Default::default())));
  }

  let json = serde_json::from_slice::<Value>(body)?;
  Ok(Some(json))
}
