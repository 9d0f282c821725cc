//! Markdown rendering pipeline.
//!
//! Turns a markdown document into a standalone HTML page: front matter is
//! split off, include directives expanded, the body converted, and the
//! result wrapped in the HTML shell. Rendering is tolerant; broken includes
//! or front matter degrade with a log line instead of failing the export.

pub mod frontmatter;
pub mod include;
pub mod markdown;
pub mod slug;
pub mod template;

use std::path::Path;

use mdpress_config::ExportSection;

pub use crate::{
    frontmatter::split_front_matter,
    include::expand_includes,
    markdown::{MarkdownOptions, MarkdownOutput, markdown_to_html},
    slug::{Slugger, slugify},
    template::{ShellOptions, build_html},
};

#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub markdown: &'a str,
    /// Source file path, used for the title fallback and for resolving
    /// relative includes, images, and stylesheets.
    pub source_path: Option<&'a Path>,
    pub export: &'a ExportSection,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub title: String,
}

/// Render a markdown document to a complete HTML page.
pub fn render_document(request: &RenderRequest<'_>) -> RenderedDocument {
    let base_dir = request.source_path.and_then(Path::parent);

    let document = split_front_matter(request.markdown);
    let body = match base_dir {
        Some(dir) => expand_includes(document.body, dir),
        None => document.body.to_string(),
    };

    let output = markdown_to_html(&body, &MarkdownOptions {
        highlight: request.export.highlight,
        // Front matter can flip the breaks behavior per document.
        breaks: document.breaks().unwrap_or(request.export.breaks),
        base_dir,
    });

    let title = document
        .title()
        .or_else(|| output.first_heading.clone())
        .or_else(|| {
            request
                .source_path
                .and_then(Path::file_stem)
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Untitled".to_string());

    let html = build_html(&output.html, &ShellOptions {
        title: &title,
        styles: &request.export.styles,
        include_default_styles: request.export.include_default_styles,
        mermaid_server: &request.export.mermaid_server,
        has_mermaid: output.has_mermaid,
        base_dir,
    });

    RenderedDocument { html, title }
}
