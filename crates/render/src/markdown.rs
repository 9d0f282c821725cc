//! Markdown to HTML body conversion.
//!
//! Wraps the pulldown-cmark event stream with the adjustments the export
//! pipeline needs: stable heading ids, highlight-ready code blocks, mermaid
//! fences passed through as diagram containers, and image paths rewritten to
//! `file://` URLs so a headless browser can load them.

use std::path::Path;

use pulldown_cmark::{CodeBlockKind, Event, Options as ParserOptions, Parser, Tag, TagEnd, html};
use url::Url;

use crate::slug::Slugger;

#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions<'a> {
    /// Add `hljs` classes to fenced code blocks.
    pub highlight: bool,
    /// Render soft line breaks as hard breaks.
    pub breaks: bool,
    /// Directory for resolving relative image paths. `None` leaves them
    /// untouched.
    pub base_dir: Option<&'a Path>,
}

#[derive(Debug, Clone)]
pub struct MarkdownOutput {
    pub html: String,
    /// Plain text of the first top-level heading, as a title fallback.
    pub first_heading: Option<String>,
    pub has_mermaid: bool,
}

pub fn markdown_to_html(source: &str, options: &MarkdownOptions<'_>) -> MarkdownOutput {
    let mut parser_options = ParserOptions::empty();
    parser_options.insert(ParserOptions::ENABLE_TABLES);
    parser_options.insert(ParserOptions::ENABLE_STRIKETHROUGH);
    parser_options.insert(ParserOptions::ENABLE_TASKLISTS);
    parser_options.insert(ParserOptions::ENABLE_FOOTNOTES);

    let events: Vec<Event<'_>> = Parser::new_ext(source, parser_options).collect();
    let mut output = Vec::with_capacity(events.len());
    let mut slugger = Slugger::default();
    let mut first_heading: Option<String> = None;
    let mut has_mermaid = false;

    let mut i = 0;
    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::Heading {
                level,
                id: _,
                classes,
                attrs,
            }) => {
                let text = heading_text(&events[i + 1..]);
                if first_heading.is_none() && *level == pulldown_cmark::HeadingLevel::H1 {
                    first_heading = Some(text.clone());
                }
                let slug = slugger.slug(&text);
                output.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: Some(slug.into()),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
            },
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    },
                    CodeBlockKind::Indented => String::new(),
                };
                let mut code = String::new();
                i += 1;
                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(text),
                        _ => {},
                    }
                    i += 1;
                }
                if lang == "mermaid" {
                    has_mermaid = true;
                    output.push(Event::Html(
                        format!("<div class=\"mermaid\">{}</div>\n", escape_html(&code)).into(),
                    ));
                } else {
                    output.push(Event::Html(render_code_block(&lang, &code, options).into()));
                }
            },
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest = rewrite_image_url(dest_url, options.base_dir);
                output.push(Event::Start(Tag::Image {
                    link_type: *link_type,
                    dest_url: dest.into(),
                    title: title.clone(),
                    id: id.clone(),
                }));
            },
            Event::SoftBreak if options.breaks => output.push(Event::HardBreak),
            event => output.push(event.clone()),
        }
        i += 1;
    }

    let mut body = String::new();
    html::push_html(&mut body, output.into_iter());
    MarkdownOutput {
        html: body,
        first_heading,
        has_mermaid,
    }
}

/// Plain text of a heading, read ahead from its inner events.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {},
        }
    }
    text
}

fn render_code_block(lang: &str, code: &str, options: &MarkdownOptions<'_>) -> String {
    let escaped = escape_html(code);
    let pre_class = if options.highlight { " class=\"hljs\"" } else { "" };
    if lang.is_empty() {
        format!("<pre{pre_class}><code>{escaped}</code></pre>\n")
    } else {
        format!(
            "<pre{pre_class}><code class=\"language-{}\">{escaped}</code></pre>\n",
            escape_html(lang)
        )
    }
}

/// Rewrite a relative or bare-absolute image path to a `file://` URL.
fn rewrite_image_url(dest: &str, base_dir: Option<&Path>) -> String {
    let Some(base_dir) = base_dir else {
        return dest.to_string();
    };
    // Already a URL (http, https, file, data, ...).
    if Url::parse(dest).is_ok() {
        return dest.to_string();
    }
    let path = Path::new(dest);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    match std::path::absolute(&absolute)
        .ok()
        .and_then(|p| Url::from_file_path(p).ok())
    {
        Some(url) => url.to_string(),
        None => dest.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> MarkdownOutput {
        markdown_to_html(source, &MarkdownOptions {
            highlight: true,
            ..Default::default()
        })
    }

    #[test]
    fn headings_get_slug_ids() {
        let out = render("# Getting Started\n\n## Getting Started\n");
        assert!(out.html.contains("<h1 id=\"getting-started\">"));
        assert!(out.html.contains("<h2 id=\"getting-started-1\">"));
        assert_eq!(out.first_heading.as_deref(), Some("Getting Started"));
    }

    #[test]
    fn fenced_code_gets_highlight_classes() {
        let out = render("```rust\nfn main() {}\n```\n");
        assert!(out.html.contains("<pre class=\"hljs\"><code class=\"language-rust\">"));
        assert!(out.html.contains("fn main() {}"));

        let plain = markdown_to_html("```rust\nlet x = 1;\n```\n", &MarkdownOptions::default());
        assert!(!plain.html.contains("hljs"));
        assert!(plain.html.contains("class=\"language-rust\""));
    }

    #[test]
    fn code_is_escaped() {
        let out = render("```html\n<b>&\n```\n");
        assert!(out.html.contains("&lt;b&gt;&amp;"));
    }

    #[test]
    fn mermaid_fences_become_diagram_containers() {
        let out = render("```mermaid\ngraph TD; A-->B;\n```\n");
        assert!(out.has_mermaid);
        assert!(out.html.contains("<div class=\"mermaid\">graph TD; A--&gt;B;\n</div>"));
        assert!(!out.html.contains("language-mermaid"));
    }

    #[test]
    fn soft_breaks_follow_config() {
        let plain = markdown_to_html("one\ntwo\n", &MarkdownOptions::default());
        assert!(!plain.html.contains("<br"));
        let broken = markdown_to_html("one\ntwo\n", &MarkdownOptions {
            breaks: true,
            ..Default::default()
        });
        assert!(broken.html.contains("<br"));
    }

    #[test]
    fn relative_images_become_file_urls() {
        let out = markdown_to_html("![logo](img/logo.png)\n", &MarkdownOptions {
            base_dir: Some(Path::new("/docs")),
            ..Default::default()
        });
        assert!(out.html.contains("src=\"file:///docs/img/logo.png\""));
    }

    #[test]
    fn remote_images_are_untouched() {
        let out = markdown_to_html("![logo](https://example.com/x.png)\n", &MarkdownOptions {
            base_dir: Some(Path::new("/docs")),
            ..Default::default()
        });
        assert!(out.html.contains("src=\"https://example.com/x.png\""));
    }

    #[test]
    fn tables_and_tasklists_are_enabled() {
        let out = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("type=\"checkbox\""));
    }
}
