//! Installation engines.
//!
//! An engine knows where a browser generation is published, how to resolve a
//! requested tag to a concrete build id, and how to download and unpack a
//! build into the cache directory.

pub mod cft;
pub mod legacy;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use futures::StreamExt;
use mdpress_common::mkdir;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{error::BrowserError, options::BrowserKind};

/// Download platforms the publish endpoints know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux64,
    MacArm64,
    MacX64,
    Win64,
}

impl Platform {
    /// Detect the platform for the running system.
    pub fn detect() -> Result<Self, BrowserError> {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("linux", "x86_64") => Ok(Self::Linux64),
            ("macos", "aarch64") => Ok(Self::MacArm64),
            ("macos", "x86_64") => Ok(Self::MacX64),
            ("windows", "x86_64") => Ok(Self::Win64),
            _ => Err(BrowserError::UnsupportedPlatform),
        }
    }

    /// Chrome for Testing platform identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux64 => "linux64",
            Self::MacArm64 => "mac-arm64",
            Self::MacX64 => "mac-x64",
            Self::Win64 => "win64",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "linux64" => Some(Self::Linux64),
            "mac-arm64" => Some(Self::MacArm64),
            "mac-x64" => Some(Self::MacX64),
            "win64" => Some(Self::Win64),
            _ => None,
        }
    }

    /// Directory name used by the Chromium snapshot bucket.
    pub fn snapshot_dir(&self) -> &'static str {
        match self {
            Self::Linux64 => "Linux_x64",
            Self::MacArm64 => "Mac_Arm",
            Self::MacX64 => "Mac",
            Self::Win64 => "Win_x64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build already present in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBrowser {
    pub browser: BrowserKind,
    pub platform: Platform,
    pub build_id: String,
    pub executable_path: PathBuf,
}

/// Everything an engine needs to install one build.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub cache_dir: PathBuf,
    pub browser: BrowserKind,
    pub build_id: String,
    pub platform: Platform,
    pub proxy: Option<String>,
}

/// Byte-level progress callback: `(downloaded, total)`.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, Option<u64>) + Send);

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Short engine name for logs and error messages.
    fn name(&self) -> &'static str;

    fn detect_platform(&self) -> Result<Platform, BrowserError> {
        Platform::detect()
    }

    /// Resolve a channel or version tag to a concrete build id.
    async fn resolve_build_id(
        &self,
        browser: BrowserKind,
        platform: Platform,
        tag: &str,
        proxy: Option<&str>,
    ) -> Result<String, BrowserError>;

    /// Scan the cache directory for builds this engine has installed.
    fn installed_browsers(&self, cache_dir: &Path) -> Result<Vec<InstalledBrowser>, BrowserError>;

    /// Download and unpack one build, reporting progress as bytes arrive.
    async fn install(
        &self,
        request: &InstallRequest,
        progress: ProgressFn<'_>,
    ) -> Result<InstalledBrowser, BrowserError>;

    /// Revision-addressed fetcher, for engines that publish raw revisions.
    /// Returns `None` when the engine (or this system) has no such interface.
    fn revision_fetcher(&self, _root: &Path) -> Option<Box<dyn RevisionFetcher>> {
        None
    }
}

/// Local state of a revision-addressed download folder.
#[derive(Debug, Clone)]
pub struct RevisionInfo {
    pub local: bool,
    pub executable_path: PathBuf,
    pub folder: PathBuf,
}

#[async_trait]
pub trait RevisionFetcher: Send + Sync {
    fn revision_info(&self, revision: &str) -> RevisionInfo;

    async fn download(
        &self,
        revision: &str,
        proxy: Option<&str>,
        progress: ProgressFn<'_>,
    ) -> Result<RevisionInfo, BrowserError>;
}

/// Build an HTTP client, routing through `proxy` when one is configured.
pub(crate) fn http_client(proxy: Option<&str>) -> Result<reqwest::Client, BrowserError> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = proxy {
        let proxy =
            reqwest::Proxy::all(proxy).map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| BrowserError::DownloadFailed(e.to_string()))
}

/// Fetch a small text resource (version manifests, revision pointers).
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, BrowserError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BrowserError::DownloadFailed(format!("{url}: {e}")))?;
    if !response.status().is_success() {
        return Err(BrowserError::DownloadFailed(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| BrowserError::DownloadFailed(format!("{url}: {e}")))
}

/// Stream a zip archive to disk and unpack it into `target_dir`.
pub(crate) async fn download_and_extract(
    client: &reqwest::Client,
    url: &str,
    target_dir: &Path,
    progress: ProgressFn<'_>,
) -> Result<(), BrowserError> {
    debug!(url, target = %target_dir.display(), "downloading archive");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BrowserError::DownloadFailed(format!("{url}: {e}")))?;
    if !response.status().is_success() {
        return Err(BrowserError::DownloadFailed(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }
    let total = response.content_length();

    let parent = target_dir
        .parent()
        .ok_or_else(|| BrowserError::CacheDir(format!("no parent for {}", target_dir.display())))?;
    mkdir(parent)?;

    let archive_name = target_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let archive_path = parent.join(format!(".{archive_name}.zip"));

    let mut file = tokio::fs::File::create(&archive_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BrowserError::DownloadFailed(format!("{url}: {e}")))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress(downloaded, total);
    }
    file.flush().await?;
    drop(file);

    let archive = archive_path.clone();
    let target = target_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip(&archive, &target))
        .await
        .map_err(|e| BrowserError::Io(e.to_string()))??;

    let _ = tokio::fs::remove_file(&archive_path).await;
    Ok(())
}

fn extract_zip(archive_path: &Path, target_dir: &Path) -> Result<(), BrowserError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;
        // Reject entries that would escape the target directory.
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            mkdir(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            mkdir(parent)?;
        }
        let mut out_file = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

/// Make sure the unpacked browser binary is runnable.
pub(crate) fn set_executable(path: &Path) -> Result<(), BrowserError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
