//! YAML front matter handling.

use serde_yaml::Value;
use tracing::warn;

/// A document split into front matter and body.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub front_matter: Option<Value>,
    pub body: &'a str,
}

impl Document<'_> {
    /// The `title` field of the front matter, when present.
    pub fn title(&self) -> Option<String> {
        self.front_matter
            .as_ref()
            .and_then(|fm| fm.get("title"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
    }

    /// Per-document `breaks` override.
    pub fn breaks(&self) -> Option<bool> {
        self.front_matter
            .as_ref()
            .and_then(|fm| fm.get("breaks"))
            .and_then(|b| b.as_bool())
    }
}

/// Split a leading `---` fenced YAML block off the document.
///
/// Malformed YAML is reported and the block is left in the body untouched,
/// so a stray horizontal rule never eats the start of a document.
pub fn split_front_matter(source: &str) -> Document<'_> {
    let without_matter = Document {
        front_matter: None,
        body: source,
    };

    let rest = match source.strip_prefix("---") {
        Some(rest) if rest.starts_with('\n') || rest.starts_with("\r\n") => rest,
        _ => return without_matter,
    };

    // Closing fence: a line that is exactly `---`.
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" && offset > 0 {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            match serde_yaml::from_str::<Value>(yaml) {
                Ok(value) => {
                    return Document {
                        front_matter: Some(value),
                        body,
                    };
                },
                Err(e) => {
                    warn!(error = %e, "ignoring malformed front matter");
                    return without_matter;
                },
            }
        }
        offset += line.len();
    }
    without_matter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_title_from_body() {
        let doc = split_front_matter("---\ntitle: Release Notes\ndraft: true\n---\n# Hello\n");
        assert_eq!(doc.title().as_deref(), Some("Release Notes"));
        assert_eq!(doc.body, "# Hello\n");
        assert_eq!(doc.breaks(), None);
    }

    #[test]
    fn breaks_override_is_read() {
        let doc = split_front_matter("---\nbreaks: true\n---\ntext\n");
        assert_eq!(doc.breaks(), Some(true));
    }

    #[test]
    fn document_without_front_matter_is_untouched() {
        let doc = split_front_matter("# Hello\n---\nnot front matter\n");
        assert!(doc.front_matter.is_none());
        assert!(doc.body.starts_with("# Hello"));
    }

    #[test]
    fn malformed_yaml_is_ignored() {
        let source = "---\ntitle: [unclosed\n---\nbody\n";
        let doc = split_front_matter(source);
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.body, source);
    }

    #[test]
    fn unterminated_fence_is_body() {
        let doc = split_front_matter("---\ntitle: x\nno closing fence\n");
        assert!(doc.front_matter.is_none());
    }
}
