//! Chrome for Testing engine.
//!
//! Resolves release channels through the published last-known-good manifest
//! and installs versioned builds from the Chrome for Testing bucket. Chromium
//! itself is not published there, so chromium installs come from the raw
//! snapshot bucket addressed by revision.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    BrowserEngine, InstallRequest, InstalledBrowser, Platform, ProgressFn, download_and_extract,
    fetch_text, http_client, set_executable,
};
use crate::{error::BrowserError, options::BrowserKind};

const LAST_KNOWN_GOOD_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/last-known-good-versions.json";
const CFT_DOWNLOAD_BASE: &str = "https://storage.googleapis.com/chrome-for-testing-public";
const SNAPSHOT_BASE: &str = "https://storage.googleapis.com/chromium-browser-snapshots";

#[derive(Debug, Deserialize)]
struct LastKnownGood {
    channels: HashMap<String, ChannelVersion>,
}

#[derive(Debug, Deserialize)]
struct ChannelVersion {
    version: String,
}

pub struct CftEngine;

impl CftEngine {
    fn channel_key(tag: &str) -> Option<&'static str> {
        match tag.to_lowercase().as_str() {
            "stable" => Some("Stable"),
            "beta" => Some("Beta"),
            "dev" => Some("Dev"),
            // The bucket has no moving "latest" pointer; canary is the
            // newest published build.
            "canary" | "latest" => Some("Canary"),
            _ => None,
        }
    }
}

fn archive_name(browser: BrowserKind, platform: Platform) -> String {
    match browser {
        BrowserKind::Chrome => format!("chrome-{platform}"),
        BrowserKind::ChromeHeadlessShell => format!("chrome-headless-shell-{platform}"),
        BrowserKind::Chromium => match platform {
            Platform::Linux64 => "chrome-linux".to_string(),
            Platform::MacArm64 | Platform::MacX64 => "chrome-mac".to_string(),
            Platform::Win64 => "chrome-win".to_string(),
        },
    }
}

fn download_url(browser: BrowserKind, platform: Platform, build_id: &str) -> String {
    let archive = archive_name(browser, platform);
    match browser {
        BrowserKind::Chromium => format!(
            "{SNAPSHOT_BASE}/{}/{build_id}/{archive}.zip",
            platform.snapshot_dir()
        ),
        _ => format!("{CFT_DOWNLOAD_BASE}/{build_id}/{platform}/{archive}.zip"),
    }
}

/// Executable location inside an unpacked install folder.
fn executable_relative(browser: BrowserKind, platform: Platform) -> PathBuf {
    let archive = archive_name(browser, platform);
    match (browser, platform) {
        (BrowserKind::Chrome, Platform::Linux64) => PathBuf::from(archive).join("chrome"),
        (BrowserKind::Chrome, Platform::MacArm64 | Platform::MacX64) => PathBuf::from(archive)
            .join("Google Chrome for Testing.app")
            .join("Contents")
            .join("MacOS")
            .join("Google Chrome for Testing"),
        (BrowserKind::Chrome, Platform::Win64) => PathBuf::from(archive).join("chrome.exe"),
        (BrowserKind::ChromeHeadlessShell, Platform::Win64) => {
            PathBuf::from(archive).join("chrome-headless-shell.exe")
        },
        (BrowserKind::ChromeHeadlessShell, _) => {
            PathBuf::from(archive).join("chrome-headless-shell")
        },
        (BrowserKind::Chromium, Platform::Linux64) => PathBuf::from(archive).join("chrome"),
        (BrowserKind::Chromium, Platform::MacArm64 | Platform::MacX64) => PathBuf::from(archive)
            .join("Chromium.app")
            .join("Contents")
            .join("MacOS")
            .join("Chromium"),
        (BrowserKind::Chromium, Platform::Win64) => PathBuf::from(archive).join("chrome.exe"),
    }
}

fn install_folder(cache_dir: &Path, browser: BrowserKind, platform: Platform, build_id: &str) -> PathBuf {
    cache_dir
        .join(browser.as_str())
        .join(format!("{platform}-{build_id}"))
}

#[async_trait]
impl BrowserEngine for CftEngine {
    fn name(&self) -> &'static str {
        "chrome-for-testing"
    }

    async fn resolve_build_id(
        &self,
        browser: BrowserKind,
        platform: Platform,
        tag: &str,
        proxy: Option<&str>,
    ) -> Result<String, BrowserError> {
        let client = http_client(proxy)?;

        if browser == BrowserKind::Chromium {
            // Snapshot revisions have no channels; only "latest" resolves.
            if tag.eq_ignore_ascii_case("latest") {
                let url = format!("{SNAPSHOT_BASE}/{}/LAST_CHANGE", platform.snapshot_dir());
                let revision = fetch_text(&client, &url).await.map_err(|e| {
                    BrowserError::BuildIdLookup {
                        browser: browser.to_string(),
                        tag: tag.to_string(),
                        message: e.to_string(),
                    }
                })?;
                return Ok(revision.trim().to_string());
            }
            return Err(BrowserError::BuildIdLookup {
                browser: browser.to_string(),
                tag: tag.to_string(),
                message: "chromium only supports numeric revisions or \"latest\"".to_string(),
            });
        }

        let Some(channel) = Self::channel_key(tag) else {
            // Dotted version strings double as build ids.
            if tag.contains('.') {
                return Ok(tag.to_string());
            }
            return Err(BrowserError::BuildIdLookup {
                browser: browser.to_string(),
                tag: tag.to_string(),
                message: "unknown channel".to_string(),
            });
        };

        let raw = fetch_text(&client, LAST_KNOWN_GOOD_URL)
            .await
            .map_err(|e| BrowserError::BuildIdLookup {
                browser: browser.to_string(),
                tag: tag.to_string(),
                message: e.to_string(),
            })?;
        let manifest: LastKnownGood =
            serde_json::from_str(&raw).map_err(|e| BrowserError::BuildIdLookup {
                browser: browser.to_string(),
                tag: tag.to_string(),
                message: format!("malformed version manifest: {e}"),
            })?;
        let version = manifest
            .channels
            .get(channel)
            .map(|c| c.version.clone())
            .ok_or_else(|| BrowserError::BuildIdLookup {
                browser: browser.to_string(),
                tag: tag.to_string(),
                message: format!("channel {channel} missing from version manifest"),
            })?;
        debug!(browser = %browser, tag, version, "resolved channel");
        Ok(version)
    }

    fn installed_browsers(&self, cache_dir: &Path) -> Result<Vec<InstalledBrowser>, BrowserError> {
        let mut installed = Vec::new();
        for browser in [
            BrowserKind::Chrome,
            BrowserKind::Chromium,
            BrowserKind::ChromeHeadlessShell,
        ] {
            let dir = cache_dir.join(browser.as_str());
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                // Folder names are `<platform>-<build_id>`; platforms can
                // themselves contain a dash.
                let Some((platform, build_id)) = split_folder_name(name) else {
                    continue;
                };
                installed.push(InstalledBrowser {
                    browser,
                    platform,
                    build_id: build_id.to_string(),
                    executable_path: entry.path().join(executable_relative(browser, platform)),
                });
            }
        }
        Ok(installed)
    }

    async fn install(
        &self,
        request: &InstallRequest,
        progress: ProgressFn<'_>,
    ) -> Result<InstalledBrowser, BrowserError> {
        let folder = install_folder(
            &request.cache_dir,
            request.browser,
            request.platform,
            &request.build_id,
        );
        let url = download_url(request.browser, request.platform, &request.build_id);
        let client = http_client(request.proxy.as_deref())?;
        download_and_extract(&client, &url, &folder, progress).await?;

        let executable_path = folder.join(executable_relative(request.browser, request.platform));
        set_executable(&executable_path)?;
        Ok(InstalledBrowser {
            browser: request.browser,
            platform: request.platform,
            build_id: request.build_id.clone(),
            executable_path,
        })
    }
}

fn split_folder_name(name: &str) -> Option<(Platform, &str)> {
    for platform in [
        Platform::Linux64,
        Platform::MacArm64,
        Platform::MacX64,
        Platform::Win64,
    ] {
        let prefix = platform.as_str();
        if let Some(rest) = name.strip_prefix(prefix)
            && let Some(build_id) = rest.strip_prefix('-')
        {
            return Some((platform, build_id));
        }
    }
    None
}
