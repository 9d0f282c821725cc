//! Environment cache and request coalescing.
//!
//! Resolved environments are cached by fingerprint, with a disk recheck on
//! every hit so a deleted executable triggers re-resolution. Concurrent
//! requests for the same fingerprint share a single in-flight resolution.

use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use mdpress_common::is_exists_path;
use mdpress_config::MdpressConfig;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    engine::BrowserEngine,
    error::BrowserError,
    options::{BrowserOptions, Fingerprint},
    resolver::{EnvironmentResolver, ResolveExecutable},
    variant::{VariantId, resolve_variant},
};

/// Per-request knobs for `ensure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureOptions {
    /// Swallow resolution failures and hand back a degraded environment
    /// without an executable. Used by background callers that must not
    /// interrupt the user.
    pub silent: bool,
}

/// A ready-to-use browser environment.
#[derive(Clone)]
pub struct ResolvedEnvironment {
    pub engine: Arc<dyn BrowserEngine>,
    /// `None` only in degraded (silent-failure) environments.
    pub executable_path: Option<PathBuf>,
    pub variant_id: VariantId,
    pub browser_name: String,
}

impl ResolvedEnvironment {
    /// Whether this environment can actually launch a browser.
    pub fn is_usable(&self) -> bool {
        self.executable_path.is_some()
    }

    /// An environment without an executable, for callers that never launch
    /// a browser and for silent resolution failures.
    pub fn degraded(config: &MdpressConfig) -> Self {
        let variant = resolve_variant(&config.browser.variant);
        let options = BrowserOptions::normalize(config, variant);
        Self {
            engine: variant.engine(),
            executable_path: None,
            variant_id: options.variant_id,
            browser_name: options.browser_name,
        }
    }
}

impl fmt::Debug for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEnvironment")
            .field("engine", &self.engine.name())
            .field("executable_path", &self.executable_path)
            .field("variant_id", &self.variant_id)
            .field("browser_name", &self.browser_name)
            .finish()
    }
}

type SharedResolution = Shared<BoxFuture<'static, Result<ResolvedEnvironment, BrowserError>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<Fingerprint, ResolvedEnvironment>,
    pending: HashMap<Fingerprint, SharedResolution>,
}

/// Caches resolved environments and coalesces concurrent resolutions.
pub struct EnvironmentCache {
    resolver: Arc<dyn ResolveExecutable>,
    state: Arc<Mutex<CacheState>>,
}

impl EnvironmentCache {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(EnvironmentResolver::default()))
    }

    pub fn with_resolver(resolver: Arc<dyn ResolveExecutable>) -> Self {
        Self {
            resolver,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Resolve (or reuse) the environment for the given configuration.
    pub async fn ensure(
        &self,
        config: &MdpressConfig,
        ensure_options: &EnsureOptions,
    ) -> Result<ResolvedEnvironment, BrowserError> {
        let variant = resolve_variant(&config.browser.variant);
        let options = BrowserOptions::normalize(config, variant);
        let engine = variant.engine();
        let key = options.fingerprint();

        let shared = {
            let mut state = self.state.lock().await;

            if let Some(env) = state.entries.get(&key) {
                if env.executable_path.as_deref().is_some_and(is_exists_path) {
                    debug!(%key, "environment cache hit");
                    return Ok(env.clone());
                }
                debug!(%key, "cached executable missing on disk; re-resolving");
                state.entries.remove(&key);
            }

            if let Some(pending) = state.pending.get(&key) {
                debug!(%key, "joining in-flight resolution");
                pending.clone()
            } else {
                let resolver = self.resolver.clone();
                let state_handle = self.state.clone();
                let resolution_key = key.clone();
                let resolution_engine = engine.clone();
                let resolution_options = options.clone();
                let future = async move {
                    let result = resolver
                        .resolve(resolution_engine.clone(), &resolution_options)
                        .await;
                    // The resolution itself settles the cache so every
                    // waiter observes the same transition.
                    let mut state = state_handle.lock().await;
                    state.pending.remove(&resolution_key);
                    match result {
                        Ok(path) => {
                            let env = ResolvedEnvironment {
                                engine: resolution_engine,
                                executable_path: Some(path),
                                variant_id: resolution_options.variant_id,
                                browser_name: resolution_options.browser_name.clone(),
                            };
                            state.entries.insert(resolution_key, env.clone());
                            Ok(env)
                        },
                        Err(e) => Err(e),
                    }
                }
                .boxed()
                .shared();
                state.pending.insert(key.clone(), future.clone());
                future
            }
        };

        match shared.await {
            Ok(env) => Ok(env),
            Err(e) if ensure_options.silent => {
                warn!(error = %e, "browser resolution failed; continuing without an executable");
                Ok(ResolvedEnvironment {
                    engine,
                    executable_path: None,
                    variant_id: options.variant_id,
                    browser_name: options.browser_name,
                })
            },
            Err(e) => Err(e),
        }
    }
}

impl Default for EnvironmentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use futures::future::join_all;

    use super::*;
    use crate::engine::{InstallRequest, InstalledBrowser, Platform, ProgressFn};

    enum Mode {
        /// Write and return `<dir>/chrome` on every call.
        Install(PathBuf),
        /// Sleep briefly, then install. Exercises coalescing windows.
        Slow(PathBuf),
        /// Sleep briefly, then fail, so concurrent calls genuinely overlap.
        Fail,
    }

    struct MockResolver {
        mode: Mode,
        calls: AtomicUsize,
    }

    impl MockResolver {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }

        fn install(dir: &Path) -> Result<PathBuf, BrowserError> {
            std::fs::create_dir_all(dir)?;
            let exe = dir.join("chrome");
            std::fs::write(&exe, b"")?;
            Ok(exe)
        }
    }

    #[async_trait]
    impl ResolveExecutable for MockResolver {
        async fn resolve(
            &self,
            _engine: Arc<dyn BrowserEngine>,
            _options: &BrowserOptions,
        ) -> Result<PathBuf, BrowserError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                Mode::Install(dir) => Self::install(dir),
                Mode::Slow(dir) => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Self::install(dir)
                },
                Mode::Fail => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(BrowserError::DownloadFailed("boom".into()))
                },
            }
        }
    }

    fn config(cache_dir: &Path) -> MdpressConfig {
        let mut cfg = MdpressConfig::default();
        cfg.browser.cache_dir = Some(cache_dir.display().to_string());
        cfg
    }

    #[tokio::test]
    async fn cache_hit_resolves_once() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Install(dir.path().join("install")));
        let cache = EnvironmentCache::with_resolver(resolver.clone());
        let cfg = config(dir.path());

        let first = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        let second = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        assert_eq!(first.executable_path, second.executable_path);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_executable_evicts_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("install");
        let resolver = MockResolver::new(Mode::Install(install_dir.clone()));
        let cache = EnvironmentCache::with_resolver(resolver.clone());
        let cfg = config(dir.path());

        let env = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        std::fs::remove_file(env.executable_path.as_ref().unwrap()).unwrap();

        let env = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        assert!(env.executable_path.as_ref().unwrap().exists());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_coalesce() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Slow(dir.path().join("install")));
        let cache = EnvironmentCache::with_resolver(resolver.clone());
        let cfg = config(dir.path());

        let opts = EnsureOptions::default();
        let results = join_all((0..5).map(|_| cache.ensure(&cfg, &opts))).await;
        for result in results {
            assert!(result.unwrap().is_usable());
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_fingerprints_resolve_separately() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Install(dir.path().join("install")));
        let cache = EnvironmentCache::with_resolver(resolver.clone());

        let cfg_a = config(dir.path());
        let mut cfg_b = config(dir.path());
        cfg_b.browser.version = Some("139.0.7258.66".into());

        cache.ensure(&cfg_a, &EnsureOptions::default()).await.unwrap();
        cache.ensure(&cfg_b, &EnsureOptions::default()).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_propagate_and_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Fail);
        let cache = EnvironmentCache::with_resolver(resolver.clone());
        let cfg = config(dir.path());

        let err = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap_err();
        assert!(matches!(err, BrowserError::DownloadFailed(_)));

        // A later attempt starts a fresh resolution.
        cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap_err();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn silent_failure_degrades_instead_of_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Fail);
        let cache = EnvironmentCache::with_resolver(resolver);
        let cfg = config(dir.path());

        let env = cache
            .ensure(&cfg, &EnsureOptions { silent: true })
            .await
            .unwrap();
        assert!(!env.is_usable());
        assert_eq!(env.browser_name, "chrome");
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new(Mode::Fail);
        let cache = EnvironmentCache::with_resolver(resolver.clone());
        let cfg = config(dir.path());

        let opts = EnsureOptions::default();
        let results = join_all((0..3).map(|_| cache.ensure(&cfg, &opts))).await;
        for result in results {
            // Every waiter sees the one shared failure.
            assert!(matches!(
                result.unwrap_err(),
                BrowserError::DownloadFailed(_)
            ));
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    struct InstallCountingEngine {
        installs: AtomicUsize,
    }

    #[async_trait]
    impl BrowserEngine for InstallCountingEngine {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn detect_platform(&self) -> Result<Platform, BrowserError> {
            Ok(Platform::Linux64)
        }

        async fn resolve_build_id(
            &self,
            _browser: crate::options::BrowserKind,
            _platform: Platform,
            tag: &str,
            _proxy: Option<&str>,
        ) -> Result<String, BrowserError> {
            match tag {
                "stable" => Ok("140.0.7339.82".to_string()),
                _ => Err(BrowserError::BuildIdLookup {
                    browser: "chrome".into(),
                    tag: tag.into(),
                    message: "unknown channel".into(),
                }),
            }
        }

        fn installed_browsers(
            &self,
            _cache_dir: &Path,
        ) -> Result<Vec<InstalledBrowser>, BrowserError> {
            Ok(Vec::new())
        }

        async fn install(
            &self,
            request: &InstallRequest,
            progress: ProgressFn<'_>,
        ) -> Result<InstalledBrowser, BrowserError> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            let folder = request
                .cache_dir
                .join(request.browser.as_str())
                .join(format!("{}-{}", request.platform, request.build_id));
            std::fs::create_dir_all(&folder)?;
            let executable_path = folder.join("chrome");
            std::fs::write(&executable_path, b"")?;
            progress(1, Some(1));
            Ok(InstalledBrowser {
                browser: request.browser,
                platform: request.platform,
                build_id: request.build_id.clone(),
                executable_path,
            })
        }
    }

    /// Delegates to the production resolver but pins the engine, so the full
    /// resolution path runs without touching the network.
    struct FixedEngineResolver {
        inner: EnvironmentResolver,
        engine: Arc<InstallCountingEngine>,
    }

    #[async_trait]
    impl ResolveExecutable for FixedEngineResolver {
        async fn resolve(
            &self,
            _engine: Arc<dyn BrowserEngine>,
            options: &BrowserOptions,
        ) -> Result<PathBuf, BrowserError> {
            self.inner.resolve(self.engine.clone(), options).await
        }
    }

    #[tokio::test]
    async fn end_to_end_modern_resolution_installs_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(InstallCountingEngine {
            installs: AtomicUsize::new(0),
        });
        let cache = EnvironmentCache::with_resolver(Arc::new(FixedEngineResolver {
            inner: EnvironmentResolver::default(),
            engine: engine.clone(),
        }));
        let cfg = config(dir.path());

        let env = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        let path = env.executable_path.unwrap();
        assert!(path.ends_with("chrome/linux64-140.0.7339.82/chrome"));
        assert!(path.exists());
        assert_eq!(engine.installs.load(Ordering::SeqCst), 1);

        let again = cache.ensure(&cfg, &EnsureOptions::default()).await.unwrap();
        assert_eq!(again.executable_path.as_deref(), Some(path.as_path()));
        assert_eq!(engine.installs.load(Ordering::SeqCst), 1);
    }
}
