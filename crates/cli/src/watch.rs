//! Watch mode: convert markdown files as they are saved.

use std::{path::Path, time::Duration};

use {
    mdpress_browser::{EnsureOptions, EnvironmentCache},
    mdpress_config::MdpressConfig,
    mdpress_export::OutputType,
    notify_debouncer_full::{
        DebounceEventResult, new_debouncer,
        notify::{EventKind, RecursiveMode},
    },
    regex::Regex,
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::convert::convert_file;

/// Watch `dir` recursively and convert changed markdown files until
/// interrupted.
pub async fn run(
    config: &MdpressConfig,
    cache: &EnvironmentCache,
    dir: &Path,
    types: &[OutputType],
) -> anyhow::Result<()> {
    // Resolve the browser up front so the first save does not stall on a
    // download; failures degrade and surface on the first real export.
    if types.iter().any(OutputType::needs_browser) {
        let environment = cache.ensure(config, &EnsureOptions { silent: true }).await?;
        if !environment.is_usable() {
            warn!("browser unavailable; non-HTML exports will fail until it is installed");
        }
    }

    let excludes = compile_excludes(&config.export.convert_on_save_exclude);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        None,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        continue;
                    }
                    for path in &event.paths {
                        if path.extension().and_then(|e| e.to_str()) == Some("md") {
                            let _ = tx.send(path.clone());
                        }
                    }
                }
            },
            Err(errors) => {
                for e in errors {
                    warn!(error = %e, "watcher error");
                }
            },
        },
    )?;
    debouncer.watch(dir, RecursiveMode::Recursive)?;
    info!(dir = %dir.display(), "watching for markdown changes");

    while let Some(path) = rx.recv().await {
        if is_excluded(&path, &excludes) {
            debug!(path = %path.display(), "excluded from convert-on-save");
            continue;
        }
        match convert_file(config, cache, &path, types).await {
            Ok(outputs) => {
                for output in outputs {
                    println!("{}", output.display());
                }
            },
            Err(e) => warn!(path = %path.display(), error = %e, "conversion failed"),
        }
    }
    Ok(())
}

/// Compile the configured exclusion patterns; invalid ones are reported and
/// skipped.
fn compile_excludes(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = p, error = %e, "ignoring invalid exclude pattern");
                None
            },
        })
        .collect()
}

fn is_excluded(path: &Path, excludes: &[Regex]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    excludes.iter().any(|regex| regex.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_patterns_are_skipped() {
        let excludes = compile_excludes(&["draft-.*\\.md".into(), "[unclosed".into()]);
        assert_eq!(excludes.len(), 1);
    }

    #[test]
    fn exclusion_matches_the_file_name() {
        let excludes = compile_excludes(&["^draft-".into(), "\\.tmp\\.md$".into()]);
        assert!(is_excluded(Path::new("/docs/draft-notes.md"), &excludes));
        assert!(is_excluded(Path::new("scratch.tmp.md"), &excludes));
        assert!(!is_excluded(Path::new("/docs/notes.md"), &excludes));
    }

    #[test]
    fn no_patterns_excludes_nothing() {
        assert!(!is_excluded(Path::new("notes.md"), &[]));
    }
}
