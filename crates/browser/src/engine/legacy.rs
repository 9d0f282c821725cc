//! Legacy Chromium snapshot engine.
//!
//! The previous engine generation installs raw Chromium snapshots addressed
//! by numeric revision. It exposes only the revision fetcher interface; the
//! channel and build-id operations of the modern generation do not exist for
//! it and report as such.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{
    BrowserEngine, InstallRequest, InstalledBrowser, Platform, ProgressFn, RevisionFetcher,
    RevisionInfo, download_and_extract, http_client, set_executable,
};
use crate::{error::BrowserError, options::BrowserKind};

const SNAPSHOT_BASE: &str = "https://storage.googleapis.com/chromium-browser-snapshots";

pub struct LegacySnapshotEngine;

/// Platform identifier used in legacy install folder names.
fn legacy_platform_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Linux64 => "linux",
        Platform::MacArm64 | Platform::MacX64 => "mac",
        Platform::Win64 => "win64",
    }
}

fn archive_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Linux64 => "chrome-linux",
        Platform::MacArm64 | Platform::MacX64 => "chrome-mac",
        Platform::Win64 => "chrome-win",
    }
}

fn executable_relative(platform: Platform) -> PathBuf {
    match platform {
        Platform::Linux64 => PathBuf::from("chrome-linux").join("chrome"),
        Platform::MacArm64 | Platform::MacX64 => PathBuf::from("chrome-mac")
            .join("Chromium.app")
            .join("Contents")
            .join("MacOS")
            .join("Chromium"),
        Platform::Win64 => PathBuf::from("chrome-win").join("chrome.exe"),
    }
}

#[async_trait]
impl BrowserEngine for LegacySnapshotEngine {
    fn name(&self) -> &'static str {
        "chromium-snapshots"
    }

    async fn resolve_build_id(
        &self,
        browser: BrowserKind,
        _platform: Platform,
        tag: &str,
        _proxy: Option<&str>,
    ) -> Result<String, BrowserError> {
        let _ = browser;
        Err(BrowserError::NonNumericLegacyTag(tag.to_string()))
    }

    fn installed_browsers(&self, cache_dir: &Path) -> Result<Vec<InstalledBrowser>, BrowserError> {
        let _ = cache_dir;
        Ok(Vec::new())
    }

    async fn install(
        &self,
        _request: &InstallRequest,
        _progress: ProgressFn<'_>,
    ) -> Result<InstalledBrowser, BrowserError> {
        Err(BrowserError::FetcherUnavailable(self.name()))
    }

    fn revision_fetcher(&self, root: &Path) -> Option<Box<dyn RevisionFetcher>> {
        let platform = Platform::detect().ok()?;
        Some(Box::new(SnapshotFetcher {
            root: root.to_path_buf(),
            platform,
        }))
    }
}

/// Downloads revision-addressed snapshots into a fixed root folder.
pub struct SnapshotFetcher {
    root: PathBuf,
    platform: Platform,
}

impl SnapshotFetcher {
    fn folder(&self, revision: &str) -> PathBuf {
        self.root
            .join(format!("{}-{revision}", legacy_platform_name(self.platform)))
    }

    fn download_url(&self, revision: &str) -> String {
        format!(
            "{SNAPSHOT_BASE}/{}/{revision}/{}.zip",
            self.platform.snapshot_dir(),
            archive_name(self.platform)
        )
    }
}

#[async_trait]
impl RevisionFetcher for SnapshotFetcher {
    fn revision_info(&self, revision: &str) -> RevisionInfo {
        let folder = self.folder(revision);
        let executable_path = folder.join(executable_relative(self.platform));
        RevisionInfo {
            local: executable_path.exists(),
            executable_path,
            folder,
        }
    }

    async fn download(
        &self,
        revision: &str,
        proxy: Option<&str>,
        progress: ProgressFn<'_>,
    ) -> Result<RevisionInfo, BrowserError> {
        let folder = self.folder(revision);
        let url = self.download_url(revision);
        let client = http_client(proxy)?;
        download_and_extract(&client, &url, &folder, progress).await?;

        let executable_path = folder.join(executable_relative(self.platform));
        set_executable(&executable_path)?;
        Ok(RevisionInfo {
            local: true,
            executable_path,
            folder,
        })
    }
}
