//! Output types and output path resolution.

use std::path::{Path, PathBuf};

use mdpress_common::mkdir;
use mdpress_config::ExportSection;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Html,
    Pdf,
    Png,
    Jpeg,
}

impl OutputType {
    pub fn parse(value: &str) -> Result<Self, ExportError> {
        match value.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            _ => Err(ExportError::UnsupportedOutputType(value.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Types that need a running browser to produce.
    pub fn needs_browser(&self) -> bool {
        !matches!(self, Self::Html)
    }
}

/// Resolve where one output file belongs.
///
/// An empty `output_directory` puts outputs next to the source file. A
/// leading `~` expands to the home directory. A relative directory resolves
/// against the source file's directory when
/// `output_directory_relative_to_file` is set, otherwise against the working
/// directory. The directory is created if missing.
pub fn resolve_output_path(
    source: &Path,
    output_type: OutputType,
    export: &ExportSection,
) -> Result<PathBuf, ExportError> {
    let source_dir = source.parent().unwrap_or(Path::new("."));

    let dir = if export.output_directory.is_empty() {
        source_dir.to_path_buf()
    } else {
        let configured = expand_home(&export.output_directory);
        if configured.is_absolute() {
            configured
        } else if export.output_directory_relative_to_file {
            source_dir.join(configured)
        } else {
            configured
        }
    };
    mkdir(&dir)?;

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    Ok(dir.join(format!("{stem}.{}", output_type.extension())))
}

/// Where the browser-loadable page for `source` is staged. Kept distinct
/// from the `.html` output path so a pdf/image run never touches an HTML
/// file the user already has next to the source.
pub fn intermediate_html_path(
    source: &Path,
    export: &ExportSection,
) -> Result<PathBuf, ExportError> {
    let html = resolve_output_path(source, OutputType::Html, export)?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    Ok(html.with_file_name(format!("{stem}_tmp.html")))
}

fn expand_home(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("~/")
        && let Some(base) = directories::BaseDirs::new()
    {
        return base.home_dir().join(rest);
    }
    PathBuf::from(dir)
}
