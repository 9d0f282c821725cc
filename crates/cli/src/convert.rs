//! Single-file conversion.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mdpress_browser::{EnsureOptions, EnvironmentCache, ResolvedEnvironment};
use mdpress_config::MdpressConfig;
use mdpress_export::{Exporter, OutputType};
use mdpress_render::{RenderRequest, render_document};
use tracing::info;

/// Resolve the output types for a run: command-line overrides first, then
/// the configured defaults. Duplicates collapse, order is preserved.
pub fn output_types(
    config: &MdpressConfig,
    overrides: &[String],
) -> anyhow::Result<Vec<OutputType>> {
    let names = if overrides.is_empty() {
        &config.export.types
    } else {
        overrides
    };
    let mut types = Vec::new();
    for name in names {
        // "all" expands to every supported type.
        let expanded = if name.eq_ignore_ascii_case("all") {
            vec![
                OutputType::Html,
                OutputType::Pdf,
                OutputType::Png,
                OutputType::Jpeg,
            ]
        } else {
            vec![OutputType::parse(name)?]
        };
        for output_type in expanded {
            if !types.contains(&output_type) {
                types.push(output_type);
            }
        }
    }
    if types.is_empty() {
        anyhow::bail!("no output types configured");
    }
    Ok(types)
}

/// Convert one markdown file to all requested output types.
pub async fn convert_file(
    config: &MdpressConfig,
    cache: &EnvironmentCache,
    path: &Path,
    types: &[OutputType],
) -> anyhow::Result<Vec<PathBuf>> {
    let markdown = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let document = render_document(&RenderRequest {
        markdown: &markdown,
        source_path: Some(path),
        export: &config.export,
    });
    info!(path = %path.display(), title = document.title, "rendered");

    // HTML-only runs never need a browser, so skip resolution entirely.
    let environment = if types.iter().any(OutputType::needs_browser) {
        cache.ensure(config, &EnsureOptions::default()).await?
    } else {
        ResolvedEnvironment::degraded(config)
    };

    let exporter = Exporter::new(config.export.clone());
    let outputs = exporter
        .export(path, &document.html, types, &environment)
        .await?;
    Ok(outputs)
}
