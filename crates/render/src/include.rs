//! File include preprocessing.
//!
//! Lines of the form `:[label](other.md)` are replaced with the referenced
//! file's contents before parsing. Includes nest; a depth limit guards
//! against include cycles.

use std::{path::Path, sync::OnceLock};

use regex::Regex;
use tracing::warn;

const MAX_DEPTH: usize = 10;

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Anchored to a full line so inline text is never rewritten.
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?m)^:\[([^\]]*)\]\(([^)\n]+)\)[ \t]*$").unwrap()
    })
}

/// Expand include directives in `source`, resolving paths against `base_dir`.
///
/// A missing or unreadable include is reported and replaced with a visible
/// marker instead of failing the whole render.
pub fn expand_includes(source: &str, base_dir: &Path) -> String {
    expand(source, base_dir, 0)
}

fn expand(source: &str, base_dir: &Path, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        warn!(depth, "include depth limit reached; leaving directives as-is");
        return source.to_string();
    }

    include_pattern()
        .replace_all(source, |caps: &regex::Captures<'_>| {
            let label = &caps[1];
            let target = base_dir.join(caps[2].trim());
            match std::fs::read_to_string(&target) {
                Ok(content) => {
                    let nested_base = target.parent().unwrap_or(base_dir);
                    expand(&content, nested_base, depth + 1)
                },
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "include failed");
                    format!("> include failed: {label} ({})", caps[2].trim())
                },
            }
        })
        .into_owned()
}
