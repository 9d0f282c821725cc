//! Browser provisioning error types.

use thiserror::Error;

/// Errors that can occur while resolving or installing a browser runtime.
///
/// Cloneable so a single settled resolution can be delivered to every
/// coalesced waiter; payloads are therefore plain strings.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error(
        "unsupported browser configured: {0}. Supported values are \"chrome\", \"chromium\", or \"chrome-headless-shell\""
    )]
    UnsupportedBrowser(String),

    #[error("configured executable_path does not exist: {0}")]
    MissingExecutable(String),

    #[error(
        "the legacy-v2 variant only supports numeric Chromium revisions (got \"{0}\"); switch to the modern variant to request versions or channels"
    )]
    NonNumericLegacyTag(String),

    #[error("unable to determine a Chromium revision for the legacy-v2 variant")]
    NoLegacyRevision,

    #[error("the {0} engine does not expose a revision fetcher")]
    FetcherUnavailable(&'static str),

    #[error("unable to detect a supported browser platform for this system")]
    UnsupportedPlatform,

    #[error("build id lookup failed for {browser} \"{tag}\": {message}")]
    BuildIdLookup {
        browser: String,
        tag: String,
        message: String,
    },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("cache directory error: {0}")]
    CacheDir(String),

    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for BrowserError {
    fn from(err: std::io::Error) -> Self {
        BrowserError::Io(err.to_string())
    }
}
