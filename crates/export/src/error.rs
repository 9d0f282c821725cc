//! Export error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(
        "no browser executable available; run `mdpress install-browser` or set browser.executable_path"
    )]
    NoExecutable,

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("PDF export failed: {0}")]
    PdfFailed(String),

    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("unsupported output type: {0}. Supported types are html, pdf, png, and jpeg")]
    UnsupportedOutputType(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
