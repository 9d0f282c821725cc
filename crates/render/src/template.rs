//! HTML shell assembly.

use std::path::Path;

use url::Url;

const TEMPLATE: &str = include_str!("../templates/template.html");
const DEFAULT_STYLESHEET: &str = include_str!("../templates/markdown.css");

#[derive(Debug, Clone)]
pub struct ShellOptions<'a> {
    pub title: &'a str,
    /// Extra stylesheet paths or URLs, linked after the built-in styles.
    pub styles: &'a [String],
    pub include_default_styles: bool,
    pub mermaid_server: &'a str,
    pub has_mermaid: bool,
    /// Directory for resolving relative stylesheet paths.
    pub base_dir: Option<&'a Path>,
}

/// Wrap a rendered body in the full HTML document.
pub fn build_html(body: &str, options: &ShellOptions<'_>) -> String {
    let mut style = String::new();
    if options.include_default_styles {
        style.push_str("<style>\n");
        style.push_str(DEFAULT_STYLESHEET);
        style.push_str("</style>\n");
    }
    for entry in options.styles {
        style.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{}\">\n",
            style_href(entry, options.base_dir)
        ));
    }

    let mermaid = if options.has_mermaid {
        format!(
            "<script src=\"{}\"></script>\n<script>mermaid.initialize({{ startOnLoad: true }});</script>",
            options.mermaid_server
        )
    } else {
        String::new()
    };

    TEMPLATE
        .replace("{{title}}", &escape_text(options.title))
        .replace("{{style}}", style.trim_end())
        .replace("{{content}}", body.trim_end())
        .replace("{{mermaid}}", &mermaid)
}

/// Resolve a stylesheet entry to something a browser can load.
fn style_href(entry: &str, base_dir: Option<&Path>) -> String {
    if Url::parse(entry).is_ok() {
        return entry.to_string();
    }
    let path = Path::new(entry);
    let absolute = match (path.is_absolute(), base_dir) {
        (true, _) => path.to_path_buf(),
        (false, Some(base)) => base.join(path),
        (false, None) => return entry.to_string(),
    };
    match std::path::absolute(&absolute)
        .ok()
        .and_then(|p| Url::from_file_path(p).ok())
    {
        Some(url) => url.to_string(),
        None => entry.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options<'a>(styles: &'a [String]) -> ShellOptions<'a> {
        ShellOptions {
            title: "Notes",
            styles,
            include_default_styles: true,
            mermaid_server: "https://unpkg.com/mermaid/dist/mermaid.min.js",
            has_mermaid: false,
            base_dir: Some(Path::new("/docs")),
        }
    }

    #[test]
    fn embeds_title_and_body() {
        let html = build_html("<p>hi</p>", &options(&[]));
        assert!(html.contains("<title>Notes</title>"));
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn title_is_escaped() {
        let mut opts = options(&[]);
        opts.title = "a < b & c";
        let html = build_html("", &opts);
        assert!(html.contains("<title>a &lt; b &amp; c</title>"));
    }

    #[test]
    fn default_styles_can_be_disabled() {
        let mut opts = options(&[]);
        opts.include_default_styles = false;
        let html = build_html("", &opts);
        assert!(!html.contains("<style>"));
    }

    #[test]
    fn extra_styles_are_linked() {
        let styles = vec![
            "https://example.com/theme.css".to_string(),
            "custom.css".to_string(),
        ];
        let html = build_html("", &options(&styles));
        assert!(html.contains("href=\"https://example.com/theme.css\""));
        assert!(html.contains("href=\"file:///docs/custom.css\""));
    }

    #[test]
    fn mermaid_script_only_when_needed() {
        let mut opts = options(&[]);
        let html = build_html("", &opts);
        assert!(!html.contains("mermaid.initialize"));

        opts.has_mermaid = true;
        let html = build_html("", &opts);
        assert!(html.contains("mermaid.min.js"));
        assert!(html.contains("mermaid.initialize"));
    }
}
