use std::path::PathBuf;

// Error handling for client and watcher operations

/// Errors surfaced by the local/remote clients and the watcher.
///
/// Expected absence (missing file, HTTP 404, not in a match) is never an error;
/// those paths return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  /// A client was used before its credentials or entitlements were installed.
  #[error("Client not ready: {0}")]
  NotReady(&'static str),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Unexpected status {status} from {url}")]
  Status { status: u16, url: String },

  #[error("Decode error: {0}")]
  Decode(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Configuration error: {path}: {details}")]
  Config { path: PathBuf, details: String },

  #[error("Initialization failed: {0}")]
  Initialization(String),
}

impl From<serde_json::Error> for ClientError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

impl From<base64::DecodeError> for ClientError {
  fn from(err: base64::DecodeError) -> Self {
    Self::Decode(format!("base64: {}", err))
  }
}

impl ClientError {
  /// Precondition failures are programming-contract violations, not transient I/O.
  pub fn is_precondition(&self) -> bool {
    matches!(self, Self::NotReady(_))
  }
}
