use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::downloader::YTDLP_BIN;

const APP_RELEASES_URL: &str =
    "https://api.github.com/repos/Catishere/karaoke-master/releases/latest";
const YTDLP_RELEASES_URL: &str = "https://api.github.com/repos/yt-dlp/yt-dlp/releases/latest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReleaseAsset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YtdlUpdate {
    Updated,
    UpToDate,
    Failed,
}

/// Latest published app release: tag plus changelog body. The caller
/// compares the tag against its own version.
pub async fn fetch_release_info(client: &reqwest::Client) -> Result<ReleaseInfo> {
    fetch_release(client, APP_RELEASES_URL).await
}

/// Refreshes the bundled download tool next to the app. Compares the local
/// `--version` output against the latest release tag and downloads the
/// matching binary asset when they differ.
pub async fn update_ytdl(client: &reqwest::Client, install_dir: &Path) -> YtdlUpdate {
    match try_update_ytdl(client, install_dir).await {
        Ok(updated) => {
            if updated {
                YtdlUpdate::Updated
            } else {
                YtdlUpdate::UpToDate
            }
        }
        Err(e) => {
            eprintln!("download tool update failed: {e}");
            YtdlUpdate::Failed
        }
    }
}

async fn try_update_ytdl(client: &reqwest::Client, install_dir: &Path) -> Result<bool> {
    let release = fetch_release(client, YTDLP_RELEASES_URL).await?;

    if let Some(local) = local_ytdl_version(install_dir) {
        if local == release.tag_name {
            return Ok(false);
        }
    }

    let asset = release
        .assets
        .iter()
        .find(|a| a.name == YTDLP_BIN)
        .ok_or_else(|| anyhow!("release {} has no {} asset", release.tag_name, YTDLP_BIN))?;

    let bytes = client
        .get(&asset.browser_download_url)
        .send()
        .await
        .context("asset download request")?
        .error_for_status()
        .context("asset download status")?
        .bytes()
        .await
        .context("asset download body")?;

    let dest = install_dir.join(YTDLP_BIN);
    std::fs::write(&dest, &bytes).with_context(|| format!("write {}", dest.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o755));
    }

    Ok(true)
}

fn local_ytdl_version(install_dir: &Path) -> Option<String> {
    let output = Command::new(install_dir.join(YTDLP_BIN))
        .arg("--version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn fetch_release(client: &reqwest::Client, url: &str) -> Result<ReleaseInfo> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .context("release info request")?
        .error_for_status()
        .context("release info status")?;

    resp.json::<ReleaseInfo>()
        .await
        .context("release info json parsing")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_info_parses_the_github_payload() {
        let payload = r#"{
            "tag_name": "1.4.0",
            "body": "Fixed the trigger polling on slow machines",
            "assets": [
                {"name": "yt-dlp", "browser_download_url": "https://example.test/yt-dlp"},
                {"name": "yt-dlp.exe", "browser_download_url": "https://example.test/yt-dlp.exe"}
            ]
        }"#;

        let info: ReleaseInfo = serde_json::from_str(payload).unwrap();
        assert_eq!(info.tag_name, "1.4.0");
        assert!(info.body.contains("trigger polling"));
        assert_eq!(info.assets.len(), 2);
        assert!(info.assets.iter().any(|a| a.name == YTDLP_BIN));
    }

    #[test]
    fn release_info_tolerates_missing_optional_fields() {
        let info: ReleaseInfo = serde_json::from_str(r#"{"tag_name": "0.9"}"#).unwrap();
        assert_eq!(info.tag_name, "0.9");
        assert!(info.body.is_empty());
        assert!(info.assets.is_empty());
    }

    #[test]
    fn missing_local_binary_reports_no_version() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(local_ytdl_version(dir.path()).is_none());
    }
}
