//! Self-update checker.
//!
//! Polls a GitHub-style "latest release" endpoint, pulls a semantic version
//! out of the release title and compares it with the running build. Has no
//! connection to the store or ticker.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::storage::UpdatesConfig;

const DOWNLOAD_BASENAME: &str = "downbad_latest";
const PART_SUFFIX: &str = ".part";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("version pattern compiles"));

/// Outcome of a check. Failures are folded in as [`UpdateStatus::Error`] so
/// callers can display the result directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    UpToDate,
    Available { version: String, url: String },
    Error { message: String },
}

/// The parts of a release the checker cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    /// First `x.y.z` in `name`, or `"0.0.0"`.
    pub version: String,
    /// Download URL of the first asset.
    pub asset_url: Option<String>,
}

impl Release {
    pub fn from_json(json: &serde_json::Value) -> Result<Self, UpdateError> {
        let name = json["name"]
            .as_str()
            .ok_or_else(|| UpdateError::Malformed("release has no name".into()))?
            .to_string();
        let asset_url = json["assets"]
            .as_array()
            .and_then(|assets| assets.first())
            .and_then(|asset| asset["browser_download_url"].as_str())
            .map(str::to_string);
        Ok(Self {
            version: extract_version(&name),
            name,
            asset_url,
        })
    }

    pub fn status_against(&self, current_version: &str) -> UpdateStatus {
        let Some(url) = &self.asset_url else {
            return UpdateStatus::Error {
                message: "No release artifact found".into(),
            };
        };
        if is_newer(&self.version, current_version) {
            UpdateStatus::Available {
                version: self.version.clone(),
                url: url.clone(),
            }
        } else {
            UpdateStatus::UpToDate
        }
    }
}

/// First `major.minor.patch` in `text`, or `"0.0.0"` if there is none.
pub fn extract_version(text: &str) -> String {
    VERSION_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0.0.0".to_string())
}

/// Whether `remote` is strictly newer than `local`.
///
/// Components compare numerically, so `1.0.10` beats `1.0.9`. Missing or
/// non-numeric components count as 0. `"0.0.0"` is never newer.
pub fn is_newer(remote: &str, local: &str) -> bool {
    if remote == "0.0.0" || remote == local {
        return false;
    }

    let parse = |v: &str| -> Vec<u64> { v.split('.').map(|p| p.parse().unwrap_or(0)).collect() };
    let remote_parts = parse(remote);
    let local_parts = parse(local);

    let len = remote_parts.len().max(local_parts.len());
    for i in 0..len {
        let r = remote_parts.get(i).copied().unwrap_or(0);
        let l = local_parts.get(i).copied().unwrap_or(0);
        if r != l {
            return r > l;
        }
    }
    false
}

pub struct UpdateChecker {
    client: Client,
    release_url: String,
    current_version: String,
    user_agent: String,
}

impl UpdateChecker {
    pub fn new(release_url: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            release_url: release_url.into(),
            current_version: current_version.into(),
            user_agent: "downbad".into(),
        }
    }

    pub fn from_config(config: &UpdatesConfig, current_version: impl Into<String>) -> Self {
        Self::new(config.release_url.clone(), current_version).with_user_agent(&config.user_agent)
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Fetch the latest release and compare it with the running version.
    pub async fn check_for_updates(&self) -> UpdateStatus {
        match self.fetch_latest().await {
            Ok(release) => {
                debug!(remote = %release.version, local = %self.current_version, "release fetched");
                release.status_against(&self.current_version)
            }
            Err(e) => {
                warn!(error = %e, url = %self.release_url, "update check failed");
                UpdateStatus::Error {
                    message: format!("Check failed: {e}"),
                }
            }
        }
    }

    pub async fn fetch_latest(&self) -> Result<Release, UpdateError> {
        let resp = self
            .client
            .get(&self.release_url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(UpdateError::Status(resp.status().as_u16()));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| UpdateError::Malformed(e.to_string()))?;
        Release::from_json(&json)
    }

    /// Download `url` into `dest_dir` as `downbad_latest.<ext>`.
    ///
    /// The body is streamed to `<name>.part` and renamed over the final name
    /// only once complete, so a failed download leaves any earlier artifact
    /// untouched. Returns the written path.
    pub async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, UpdateError> {
        let file_name = download_file_name(url);
        let dest = dest_dir.join(&file_name);
        let part = dest_dir.join(format!("{file_name}{PART_SUFFIX}"));

        let resp = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(UpdateError::Status(resp.status().as_u16()));
        }

        fs::create_dir_all(dest_dir).await?;
        match write_body(resp, &part).await {
            Ok(written) => {
                fs::rename(&part, &dest).await?;
                debug!(path = %dest.display(), bytes = written, "release artifact downloaded");
                Ok(dest)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part).await {
                    warn!(path = %part.display(), error = %cleanup, "could not remove partial download");
                }
                Err(e)
            }
        }
    }
}

async fn write_body(mut resp: Response, path: &Path) -> Result<usize, UpdateError> {
    let mut file = fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}

/// `downbad_latest.<ext>`, taking the extension from the URL's last path
/// segment, `bin` if there is none.
fn download_file_name(url: &str) -> String {
    let ext = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|last| {
            Path::new(&last)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string());
    format!("{DOWNLOAD_BASENAME}.{ext}")
}
