// Reads the game's own log file to recover the remote server location and client version

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::types::ServerLocation;

/// Recent connections are at the end of the log, which can grow very large.
pub const LOCATION_WINDOW_BYTES: u64 = 1024 * 1024;
/// Version banners are written when the process starts.
pub const VERSION_WINDOW_BYTES: u64 = 50 * 1024;

static GLZ_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"https://glz-([A-Za-z0-9]+)-1\.([A-Za-z0-9]+)\.a\.pvp\.net").expect("valid regex")
});
static CI_BUILD: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"CI server version:\s*(\S+)").expect("valid regex"));
static BRANCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"Branch:\s*(\S+)").expect("valid regex"));

enum Window {
  Head(u64),
  Tail(u64),
}

#[derive(Debug, Clone)]
pub struct GameLogReader {
  path: PathBuf,
}

impl GameLogReader {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Region/shard of the most recent GLZ connection in the log tail.
  pub async fn extract_server_location(&self) -> Option<ServerLocation> {
    let text = self.read_window(Window::Tail(LOCATION_WINDOW_BYTES)).await?;
    let location = parse_server_location(&text);
    if location.is_none() {
      tracing::debug!(path = %self.path.display(), "[GameLog] No server location in log tail");
    }
    location
  }

  pub async fn extract_client_version(&self) -> Option<String> {
    let text = self.read_window(Window::Head(VERSION_WINDOW_BYTES)).await?;
    parse_client_version(&text)
  }

  async fn read_window(&self, window: Window) -> Option<String> {
    let mut file = match tokio::fs::File::open(&self.path).await {
      Ok(f) => f,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "[GameLog] Failed to open log");
        return None;
      }
    };

    let len = file.metadata().await.ok()?.len();
    let (start, size) = match window {
      Window::Head(n) => (0, n.min(len)),
      Window::Tail(n) => (len.saturating_sub(n), n.min(len)),
    };

    if start > 0 {
      file.seek(SeekFrom::Start(start)).await.ok()?;
    }

    let mut buf = Vec::with_capacity(size as usize);
    if let Err(e) = file.take(size).read_to_end(&mut buf).await {
      tracing::warn!(path = %self.path.display(), error = %e, "[GameLog] Failed to read log");
      return None;
    }

    Some(String::from_utf8_lossy(&buf).into_owned())
  }
}

/// Last GLZ URL wins; earlier ones may be stale connections still in the buffer.
pub fn parse_server_location(text: &str) -> Option<ServerLocation> {
  GLZ_URL.captures_iter(text).last().map(|caps| ServerLocation {
    region: caps[1].to_string(),
    shard: caps[2].to_string(),
  })
}

pub fn parse_client_version(text: &str) -> Option<String> {
  CI_BUILD
    .captures(text)
    .or_else(|| BRANCH.captures(text))
    .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  #[test]
  fn last_glz_url_wins() {
    let log = "\
[2024.01.01-10.00.00:000][  0]LogPlatform: https://glz-eu-1.eu.a.pvp.net/session/v1/sessions
[2024.01.01-11.00.00:000][  0]LogPlatform: https://glz-na-1.na.a.pvp.net/session/v1/sessions
";
    let loc = parse_server_location(log).unwrap();
    assert_eq!(loc.region, "na");
    assert_eq!(loc.shard, "na");
  }

  #[test]
  fn shard_order_decides_not_region() {
    let log = "https://glz-latam-1.eu.a.pvp.net/x\nhttps://glz-latam-1.na.a.pvp.net/y";
    assert_eq!(
      parse_server_location(log),
      Some(ServerLocation {
        region: "latam".to_string(),
        shard: "na".to_string()
      })
    );
  }

  #[test]
  fn no_url_means_no_location() {
    assert_eq!(parse_server_location("nothing to see"), None);
  }

  #[test]
  fn version_prefers_ci_build_then_branch() {
    let both = "LogInit: Branch: release-09.11\nLogShooter: CI server version: release-09.11-shipping-12-2885612\n";
    assert_eq!(
      parse_client_version(both).as_deref(),
      Some("release-09.11-shipping-12-2885612")
    );

    let branch_only = "LogInit: Branch: release-09.11\n";
    assert_eq!(parse_client_version(branch_only).as_deref(), Some("release-09.11"));

    assert_eq!(parse_client_version("LogInit: nothing"), None);
  }

  #[tokio::test]
  async fn missing_log_is_not_an_error() {
    let reader = GameLogReader::new("/definitely/not/here/ShooterGame.log");
    assert_eq!(reader.extract_server_location().await, None);
    assert_eq!(reader.extract_client_version().await, None);
  }

  #[tokio::test]
  async fn location_outside_tail_window_is_ignored() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "https://glz-ap-1.ap.a.pvp.net/old").unwrap();
    let filler = vec![b'x'; LOCATION_WINDOW_BYTES as usize];
    file.write_all(&filler).unwrap();
    file.flush().unwrap();

    let reader = GameLogReader::new(file.path());
    assert_eq!(reader.extract_server_location().await, None);

    writeln!(file, "\nhttps://glz-eu-1.eu.a.pvp.net/new").unwrap();
    file.flush().unwrap();
    let loc = reader.extract_server_location().await.unwrap();
    assert_eq!(loc.shard, "eu");
  }

  #[tokio::test]
  async fn version_is_read_from_head() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "LogShooter: CI server version: release-08.07-shipping-9-2444158").unwrap();
    file.flush().unwrap();

    let reader = GameLogReader::new(file.path());
    assert_eq!(
      reader.extract_client_version().await.as_deref(),
      Some("release-08.07-shipping-9-2444158")
    );
  }
}
