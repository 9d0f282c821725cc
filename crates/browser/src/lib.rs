//! Browser runtime provisioning.
//!
//! Resolves a configured browser (variant, name, version or channel) to an
//! executable on disk, downloading and caching builds as needed. Resolutions
//! are cached per fingerprint and concurrent requests are coalesced, so the
//! export pipeline can call [`EnvironmentCache::ensure`] freely.

pub mod cache;
pub mod engine;
pub mod error;
pub mod options;
pub mod progress;
pub mod resolver;
pub mod variant;

pub use cache::{EnsureOptions, EnvironmentCache, ResolvedEnvironment};
pub use engine::{BrowserEngine, InstallRequest, InstalledBrowser, Platform};
pub use error::BrowserError;
pub use options::{BrowserKind, BrowserOptions, Fingerprint, default_cache_dir};
pub use progress::{DownloadProgress, LogStatusSink, StatusSink};
pub use resolver::{EnvironmentResolver, ResolveExecutable};
pub use variant::{Variant, VariantId, resolve_variant};
