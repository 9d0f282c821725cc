//! Executable resolution.
//!
//! Turns normalized options into a concrete browser executable on disk,
//! installing one through the variant's engine when nothing usable is cached.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use mdpress_common::{is_exists_path, mkdir};
use tracing::{debug, info};

use crate::{
    engine::{BrowserEngine, InstallRequest, Platform},
    error::BrowserError,
    options::{BrowserKind, BrowserOptions},
    progress::{DownloadProgress, LogStatusSink, StatusSink},
    variant::VariantId,
};

/// Resolution strategy seam, mockable in tests.
#[async_trait]
pub trait ResolveExecutable: Send + Sync {
    async fn resolve(
        &self,
        engine: Arc<dyn BrowserEngine>,
        options: &BrowserOptions,
    ) -> Result<PathBuf, BrowserError>;
}

/// The production resolver.
pub struct EnvironmentResolver {
    sink: Arc<dyn StatusSink>,
}

impl EnvironmentResolver {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    async fn legacy_executable(
        &self,
        engine: Arc<dyn BrowserEngine>,
        options: &BrowserOptions,
    ) -> Result<PathBuf, BrowserError> {
        let revision = match &options.requested_tag {
            Some(tag) if is_numeric(tag) => tag.clone(),
            Some(tag) => return Err(BrowserError::NonNumericLegacyTag(tag.clone())),
            None => default_legacy_revision(options).ok_or(BrowserError::NoLegacyRevision)?,
        };

        let root = options.cache_dir.join("legacy-v2");
        mkdir(&root).map_err(|e| BrowserError::CacheDir(e.to_string()))?;

        let fetcher = engine
            .revision_fetcher(&root)
            .ok_or(BrowserError::FetcherUnavailable(engine.name()))?;

        let info = fetcher.revision_info(&revision);
        if info.local && is_exists_path(&info.executable_path) {
            debug!(revision, path = %info.executable_path.display(), "snapshot already installed");
            return Ok(info.executable_path);
        }

        info!(revision, "installing chromium snapshot");
        let mut progress =
            DownloadProgress::new(format!("chromium r{revision}"), self.sink.clone());
        let info = {
            let mut report = |downloaded, total| progress.report(downloaded, total);
            fetcher
                .download(&revision, options.proxy.as_deref(), &mut report)
                .await?
        };
        progress.complete();
        Ok(info.executable_path)
    }

    async fn modern_executable(
        &self,
        engine: Arc<dyn BrowserEngine>,
        options: &BrowserOptions,
    ) -> Result<PathBuf, BrowserError> {
        let platform = engine.detect_platform()?;
        let build_id = determine_build_id(engine.as_ref(), options, platform).await?;

        // Reuse a matching cached install when its executable survives.
        let installed = engine.installed_browsers(&options.cache_dir)?;
        if let Some(existing) = installed.iter().find(|b| {
            b.browser == options.browser && b.platform == platform && b.build_id == build_id
        }) && is_exists_path(&existing.executable_path)
        {
            debug!(
                browser = %options.browser,
                build_id,
                path = %existing.executable_path.display(),
                "build already installed"
            );
            return Ok(existing.executable_path.clone());
        }

        mkdir(&options.cache_dir).map_err(|e| BrowserError::CacheDir(e.to_string()))?;

        info!(browser = %options.browser, build_id, %platform, "installing browser build");
        let request = InstallRequest {
            cache_dir: options.cache_dir.clone(),
            browser: options.browser,
            build_id: build_id.clone(),
            platform,
            proxy: options.proxy.clone(),
        };
        let mut progress = DownloadProgress::new(
            format!("{} {build_id}", options.browser_name),
            self.sink.clone(),
        );
        let installed = {
            let mut report = |downloaded, total| progress.report(downloaded, total);
            engine.install(&request, &mut report).await?
        };
        progress.complete();
        Ok(installed.executable_path)
    }
}

impl Default for EnvironmentResolver {
    fn default() -> Self {
        Self::new(Arc::new(LogStatusSink))
    }
}

#[async_trait]
impl ResolveExecutable for EnvironmentResolver {
    async fn resolve(
        &self,
        engine: Arc<dyn BrowserEngine>,
        options: &BrowserOptions,
    ) -> Result<PathBuf, BrowserError> {
        if let Some(path) = &options.explicit_executable {
            if is_exists_path(path) {
                return Ok(path.clone());
            }
            return Err(BrowserError::MissingExecutable(path.display().to_string()));
        }

        match options.variant_id {
            VariantId::LegacyV2 => self.legacy_executable(engine, options).await,
            VariantId::Modern => self.modern_executable(engine, options).await,
        }
    }
}

fn is_numeric(tag: &str) -> bool {
    !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_digit())
}

/// Default revision for the legacy branch, tolerating partially populated
/// revision tables.
fn default_legacy_revision(options: &BrowserOptions) -> Option<String> {
    options
        .revisions
        .get("chromium")
        .or_else(|| options.revisions.get("chrome"))
        .or_else(|| options.revisions.get("chrome-headless-shell"))
        .cloned()
}

/// Pick the concrete build id for the modern branch.
///
/// A numeric tag is used verbatim; any other tag is treated as a channel or
/// version and resolved through the engine. Without a tag the variant's
/// pinned id applies, and a browser absent from the table falls back to its
/// newest published build.
async fn determine_build_id(
    engine: &dyn BrowserEngine,
    options: &BrowserOptions,
    platform: Platform,
) -> Result<String, BrowserError> {
    if let Some(tag) = &options.requested_tag {
        if is_numeric(tag) {
            return Ok(tag.clone());
        }
        return engine
            .resolve_build_id(options.browser, platform, tag, options.proxy.as_deref())
            .await;
    }

    let pinned = options
        .revisions
        .get(&options.browser_name)
        .or_else(|| options.revisions.get(options.browser.as_str()))
        .or_else(|| options.revisions.get("chrome"));
    if let Some(build_id) = pinned {
        return Ok(build_id.clone());
    }

    let fallback = match options.browser {
        BrowserKind::Chrome => "stable",
        _ => "latest",
    };
    engine
        .resolve_build_id(options.browser, platform, fallback, options.proxy.as_deref())
        .await
}
