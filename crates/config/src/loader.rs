//! Config file discovery, parsing, and `${ENV_VAR}` expansion.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::schema::MdpressConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["mdpress.toml", "mdpress.yaml", "mdpress.yml", "mdpress.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MdpressConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = expand_env_refs(&raw, |name| std::env::var(name).ok());
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./mdpress.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/mdpress/mdpress.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MdpressConfig::default()` if no config file is found.
pub fn discover_and_load() -> MdpressConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return MdpressConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        MdpressConfig::default()
    })
}

/// First config file found, project directory before the user-global one.
fn find_config_file() -> Option<PathBuf> {
    let mut roots = vec![PathBuf::from(".")];
    roots.extend(config_dir());
    roots
        .iter()
        .flat_map(|root| CONFIG_FILENAMES.iter().map(move |name| root.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Returns the user-global config directory (`~/.config/mdpress/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mdpress").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MdpressConfig> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(raw)?),
        Some("json") => Ok(serde_json::from_str(raw)?),
        Some("toml") | None => Ok(toml::from_str(raw)?),
        Some(other) => anyhow::bail!("unsupported config format: .{other}"),
    }
}

/// Replace `${VAR}` references in the raw config text.
///
/// Unknown variables and unterminated references stay verbatim, so a value
/// the user meant literally survives the round trip.
fn expand_env_refs(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let Some(close) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &rest[start + 2..start + close];
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..=start + close]),
        }
        rest = &rest[start + close + 1..];
    }
    out.push_str(rest);
    out
}
