//! Normalized browser options and the resolution fingerprint.

use std::{collections::HashMap, fmt, path::PathBuf};

use tracing::error;

use crate::{
    error::BrowserError,
    variant::{Variant, VariantId},
};

/// Browsers the provisioning pipeline knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserKind {
    Chrome,
    Chromium,
    ChromeHeadlessShell,
}

/// Default browser for the modern variant.
pub const DEFAULT_MODERN_BROWSER: BrowserKind = BrowserKind::Chrome;
/// Default browser for the legacy variant.
pub const DEFAULT_LEGACY_BROWSER: BrowserKind = BrowserKind::Chromium;

impl BrowserKind {
    /// Parse a configured browser name, accepting common aliases.
    pub fn parse(name: &str) -> Result<Self, BrowserError> {
        match name.to_lowercase().as_str() {
            "chrome" | "google-chrome" => Ok(Self::Chrome),
            "chromium" => Ok(Self::Chromium),
            "chrome-headless-shell" | "chrome_headless_shell" | "headless-shell" => {
                Ok(Self::ChromeHeadlessShell)
            },
            _ => Err(BrowserError::UnsupportedBrowser(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Chromium => "chromium",
            Self::ChromeHeadlessShell => "chrome-headless-shell",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, immutable-per-resolution options derived from host
/// configuration and the selected variant.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub browser: BrowserKind,
    pub browser_name: String,
    /// Requested version or channel tag; version wins over channel.
    pub requested_tag: Option<String>,
    pub cache_dir: PathBuf,
    /// User-forced executable; bypasses resolution entirely.
    pub explicit_executable: Option<PathBuf>,
    pub variant_id: VariantId,
    /// Default build/revision ids copied from the variant.
    pub revisions: HashMap<String, String>,
    /// Proxy applied to download clients. Not part of the fingerprint.
    pub proxy: Option<String>,
}

impl BrowserOptions {
    /// Build normalized options from host configuration.
    ///
    /// An unsupported browser name is reported and degraded to the variant
    /// default rather than aborting the resolution.
    pub fn normalize(config: &mdpress_config::MdpressConfig, variant: &Variant) -> Self {
        let default_kind = match variant.id() {
            VariantId::LegacyV2 => DEFAULT_LEGACY_BROWSER,
            VariantId::Modern => DEFAULT_MODERN_BROWSER,
        };

        let name_input = non_empty(&config.browser.name).unwrap_or_else(|| default_kind.as_str().to_string());
        let (browser, browser_name) = match BrowserKind::parse(&name_input) {
            Ok(kind) => (kind, name_input),
            Err(e) => {
                error!("{e}");
                (default_kind, default_kind.as_str().to_string())
            },
        };

        // Version takes precedence over channel.
        let requested_tag = config
            .browser
            .version
            .as_deref()
            .and_then(|v| non_empty(v))
            .or_else(|| config.browser.channel.as_deref().and_then(|c| non_empty(c)));

        let cache_dir = config
            .browser
            .cache_dir
            .as_deref()
            .and_then(|d| non_empty(d))
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);

        let explicit_executable = config
            .browser
            .executable_path
            .as_deref()
            .and_then(|p| non_empty(p))
            .map(PathBuf::from);

        let proxy = config.http.proxy.as_deref().and_then(|p| non_empty(p));

        Self {
            browser,
            browser_name,
            requested_tag,
            cache_dir,
            explicit_executable,
            variant_id: variant.id(),
            revisions: variant.revisions().clone(),
            proxy,
        }
    }

    /// Deterministic cache key over exactly the fields that affect
    /// resolution: variant, browser, requested tag, cache dir, and explicit
    /// executable.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(format!(
            "variant={};browser={};tag={};cache={};exec={}",
            self.variant_id.as_str(),
            self.browser.as_str(),
            self.requested_tag.as_deref().unwrap_or(""),
            self.cache_dir.display(),
            self.explicit_executable
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ))
    }
}

/// Deterministic key identifying equivalent resolution requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default directory for downloaded binaries: the user cache area,
/// namespaced for this tool.
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "mdpress")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mdpress-cache"))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use mdpress_config::MdpressConfig;

    use super::*;
    use crate::variant::resolve_variant;

    fn config() -> MdpressConfig {
        MdpressConfig::default()
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(BrowserKind::parse("google-chrome").unwrap(), BrowserKind::Chrome);
        assert_eq!(
            BrowserKind::parse("headless-shell").unwrap(),
            BrowserKind::ChromeHeadlessShell
        );
        assert_eq!(BrowserKind::parse("Chromium").unwrap(), BrowserKind::Chromium);
        assert!(BrowserKind::parse("firefox").is_err());
    }

    #[test]
    fn unknown_name_degrades_to_variant_default() {
        let mut cfg = config();
        cfg.browser.name = "netscape".into();
        let modern = BrowserOptions::normalize(&cfg, resolve_variant("modern"));
        assert_eq!(modern.browser, BrowserKind::Chrome);
        assert_eq!(modern.browser_name, "chrome");

        let legacy = BrowserOptions::normalize(&cfg, resolve_variant("legacy-v2"));
        assert_eq!(legacy.browser, BrowserKind::Chromium);
        assert_eq!(legacy.browser_name, "chromium");
    }

    #[test]
    fn version_wins_over_channel() {
        let mut cfg = config();
        cfg.browser.version = Some("123456".into());
        cfg.browser.channel = Some("beta".into());
        let options = BrowserOptions::normalize(&cfg, resolve_variant("modern"));
        assert_eq!(options.requested_tag.as_deref(), Some("123456"));
    }

    #[test]
    fn channel_used_when_no_version() {
        let mut cfg = config();
        cfg.browser.channel = Some(" beta ".into());
        let options = BrowserOptions::normalize(&cfg, resolve_variant("modern"));
        assert_eq!(options.requested_tag.as_deref(), Some("beta"));
    }

    #[test]
    fn configured_cache_dir_overrides_default() {
        let mut cfg = config();
        cfg.browser.cache_dir = Some("/tmp/mdpress-test-cache".into());
        let options = BrowserOptions::normalize(&cfg, resolve_variant("modern"));
        assert_eq!(options.cache_dir, PathBuf::from("/tmp/mdpress-test-cache"));

        cfg.browser.cache_dir = None;
        let options = BrowserOptions::normalize(&cfg, resolve_variant("modern"));
        assert_eq!(options.cache_dir, default_cache_dir());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let cfg = config();
        let variant = resolve_variant("modern");
        let a = BrowserOptions::normalize(&cfg, variant).fingerprint();
        let b = BrowserOptions::normalize(&cfg, variant).fingerprint();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_each_input() {
        let base_cfg = config();
        let base = BrowserOptions::normalize(&base_cfg, resolve_variant("modern")).fingerprint();

        let legacy = BrowserOptions::normalize(&base_cfg, resolve_variant("legacy-v2")).fingerprint();
        assert_ne!(base, legacy);

        let mut cfg = config();
        cfg.browser.name = "chrome-headless-shell".into();
        assert_ne!(base, BrowserOptions::normalize(&cfg, resolve_variant("modern")).fingerprint());

        let mut cfg = config();
        cfg.browser.version = Some("120".into());
        assert_ne!(base, BrowserOptions::normalize(&cfg, resolve_variant("modern")).fingerprint());

        let mut cfg = config();
        cfg.browser.cache_dir = Some("/tmp/elsewhere".into());
        assert_ne!(base, BrowserOptions::normalize(&cfg, resolve_variant("modern")).fingerprint());

        let mut cfg = config();
        cfg.browser.executable_path = Some("/usr/bin/chromium".into());
        assert_ne!(base, BrowserOptions::normalize(&cfg, resolve_variant("modern")).fingerprint());
    }

    #[test]
    fn proxy_does_not_affect_fingerprint() {
        let base = BrowserOptions::normalize(&config(), resolve_variant("modern")).fingerprint();
        let mut cfg = config();
        cfg.http.proxy = Some("http://proxy:8080".into());
        let with_proxy = BrowserOptions::normalize(&cfg, resolve_variant("modern")).fingerprint();
        assert_eq!(base, with_proxy);
    }
}
