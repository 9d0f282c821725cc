//! Config schema types (browser provisioning, HTTP, export pipeline).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MdpressConfig {
    pub browser: BrowserSection,
    pub http: HttpSection,
    pub export: ExportSection,
}

/// Browser runtime provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// Engine variant: "modern" or "legacy-v2". Unknown values fall back to
    /// "modern".
    pub variant: String,
    /// Browser to provision: "chrome", "chromium", or "chrome-headless-shell".
    pub name: String,
    /// Exact version or numeric build id to install. Takes precedence over
    /// `channel`.
    pub version: Option<String>,
    /// Release channel ("stable", "beta", "dev", "canary", "latest").
    pub channel: Option<String>,
    /// Directory for downloaded binaries. Defaults to the user cache area.
    pub cache_dir: Option<String>,
    /// Explicit browser executable. Bypasses resolution entirely.
    pub executable_path: Option<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            variant: "modern".into(),
            name: String::new(),
            version: None,
            channel: None,
            cache_dir: None,
            executable_path: None,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Proxy URL applied to browser downloads.
    pub proxy: Option<String>,
}

/// Export pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Output types produced when none is given on the command line.
    /// Any of "html", "pdf", "png", "jpeg".
    pub types: Vec<String>,
    /// Output directory. Empty = next to the source file. A leading `~` is
    /// expanded to the home directory.
    pub output_directory: String,
    /// When true, a relative `output_directory` is resolved against the
    /// source file's directory instead of the current working directory.
    pub output_directory_relative_to_file: bool,
    /// Filename patterns (regex) excluded from watch-mode conversion.
    pub convert_on_save_exclude: Vec<String>,
    /// Enable syntax-highlighting classes on fenced code blocks.
    pub highlight: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
    /// Accepted for compatibility; emoji image rendering is handled by an
    /// external renderer plugin and is currently inert.
    pub emoji: bool,
    /// Extra stylesheet paths or URLs linked into the HTML shell.
    pub styles: Vec<String>,
    /// Embed the built-in markdown stylesheet.
    pub include_default_styles: bool,
    /// Script URL for mermaid diagram rendering.
    pub mermaid_server: String,
    /// Keep the intermediate HTML file next to the output.
    pub debug: bool,
    pub pdf: PdfOptions,
    pub image: ImageOptions,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            types: vec!["pdf".into()],
            output_directory: String::new(),
            output_directory_relative_to_file: false,
            convert_on_save_exclude: Vec::new(),
            highlight: true,
            breaks: false,
            emoji: true,
            styles: Vec::new(),
            include_default_styles: true,
            mermaid_server: "https://unpkg.com/mermaid/dist/mermaid.min.js".into(),
            debug: false,
            pdf: PdfOptions::default(),
            image: ImageOptions::default(),
        }
    }
}

/// PDF print options, passed through to the browser's print-to-PDF call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Paper format name (A4, Letter, ...). Ignored when `width` or `height`
    /// is set.
    pub format: String,
    /// Paper width with a unit suffix (px, in, cm, mm).
    pub width: String,
    /// Paper height with a unit suffix.
    pub height: String,
    /// "portrait" or "landscape".
    pub orientation: String,
    pub scale: f64,
    pub display_header_footer: bool,
    /// Header HTML. Supports %%ISO-DATETIME%%, %%ISO-DATE%%, %%ISO-TIME%%.
    pub header_template: String,
    /// Footer HTML. Same placeholders as `header_template`.
    pub footer_template: String,
    pub print_background: bool,
    pub page_ranges: String,
    pub margin: PdfMargin,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: "A4".into(),
            width: String::new(),
            height: String::new(),
            orientation: "portrait".into(),
            scale: 1.0,
            display_header_footer: true,
            header_template: "<div style=\"font-size: 9px; margin-left: 1cm;\"> <span class='title'></span></div> <div style=\"font-size: 9px; margin-left: auto; margin-right: 1cm; \"> <span class='date'></span></div>".into(),
            footer_template: "<div style=\"font-size: 9px; margin: 0 auto;\"> <span class='pageNumber'></span> / <span class='totalPages'></span></div>".into(),
            print_background: true,
            page_ranges: String::new(),
            margin: PdfMargin::default(),
        }
    }
}

/// Page margins with unit suffixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfMargin {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Default for PdfMargin {
    fn default() -> Self {
        Self {
            top: "1.5cm".into(),
            right: "1cm".into(),
            bottom: "1cm".into(),
            left: "1cm".into(),
        }
    }
}

/// PNG/JPEG screenshot options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// JPEG quality (ignored for PNG).
    pub quality: u32,
    /// Capture the full scrollable page. Ignored when a clip is set.
    pub full_page: bool,
    pub omit_background: bool,
    pub clip_x: Option<f64>,
    pub clip_y: Option<f64>,
    pub clip_width: Option<f64>,
    pub clip_height: Option<f64>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            quality: 100,
            full_page: true,
            omit_background: false,
            clip_x: None,
            clip_y: None,
            clip_width: None,
            clip_height: None,
        }
    }
}

impl ImageOptions {
    /// The clip rectangle, when all four components are configured.
    pub fn clip(&self) -> Option<(f64, f64, f64, f64)> {
        match (self.clip_x, self.clip_y, self.clip_width, self.clip_height) {
            (Some(x), Some(y), Some(w), Some(h)) => Some((x, y, w, h)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = MdpressConfig::default();
        assert_eq!(cfg.browser.variant, "modern");
        assert!(cfg.browser.name.is_empty());
        assert_eq!(cfg.export.types, vec!["pdf".to_string()]);
        assert_eq!(cfg.export.pdf.format, "A4");
        assert!(cfg.export.include_default_styles);
    }

    #[test]
    fn clip_requires_all_components() {
        let mut img = ImageOptions::default();
        assert!(img.clip().is_none());
        img.clip_x = Some(0.0);
        img.clip_y = Some(0.0);
        img.clip_width = Some(100.0);
        assert!(img.clip().is_none());
        img.clip_height = Some(50.0);
        assert_eq!(img.clip(), Some((0.0, 0.0, 100.0, 50.0)));
    }

    #[test]
    fn toml_round_trip_partial() {
        let raw = r#"
            [browser]
            variant = "legacy-v2"
            name = "chromium"
            version = "722234"

            [export]
            types = ["html", "pdf"]
        "#;
        let cfg: MdpressConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.browser.variant, "legacy-v2");
        assert_eq!(cfg.browser.version.as_deref(), Some("722234"));
        assert_eq!(cfg.export.types.len(), 2);
        // Unspecified sections keep their defaults.
        assert_eq!(cfg.export.pdf.margin.top, "1.5cm");
    }
}
