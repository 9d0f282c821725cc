//! Export pipeline.
//!
//! Takes a rendered HTML page and produces the requested output files. HTML
//! output is a plain file write; PDF and image outputs load the page in a
//! headless browser resolved by the provisioning layer.

pub mod error;
pub mod output;
pub mod pdf;

use std::path::{Path, PathBuf};

use chromiumoxide::{
    Browser, BrowserConfig as CdpBrowserConfig, Page,
    cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport},
    page::ScreenshotParams,
};
use futures::StreamExt;
use mdpress_browser::ResolvedEnvironment;
use mdpress_config::ExportSection;
use tracing::{debug, info};
use url::Url;

pub use crate::{
    error::ExportError,
    output::{OutputType, intermediate_html_path, resolve_output_path},
    pdf::build_pdf_params,
};

pub struct Exporter {
    export: ExportSection,
}

impl Exporter {
    pub fn new(export: ExportSection) -> Self {
        Self { export }
    }

    /// Write all requested outputs for one rendered document. Returns the
    /// paths written, in request order.
    pub async fn export(
        &self,
        source: &Path,
        html: &str,
        types: &[OutputType],
        environment: &ResolvedEnvironment,
    ) -> Result<Vec<PathBuf>, ExportError> {
        // The page the browser loads is staged under a `_tmp` name. The
        // `.html` output path is only ever written when html is requested.
        let page_path = intermediate_html_path(source, &self.export)?;
        tokio::fs::write(&page_path, html).await?;

        let result = self
            .write_outputs(source, html, types, environment, &page_path)
            .await;

        if !self.export.debug {
            let _ = tokio::fs::remove_file(&page_path).await;
        }
        result
    }

    async fn write_outputs(
        &self,
        source: &Path,
        html: &str,
        types: &[OutputType],
        environment: &ResolvedEnvironment,
        page_path: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let session = if types.iter().any(OutputType::needs_browser) {
            let executable = environment
                .executable_path
                .as_deref()
                .ok_or(ExportError::NoExecutable)?;
            Some(self.open_page(executable, page_path).await?)
        } else {
            None
        };

        let mut outputs = Vec::with_capacity(types.len());
        for output_type in types {
            let path = resolve_output_path(source, *output_type, &self.export)?;
            match (output_type, &session) {
                (OutputType::Html, _) => {
                    tokio::fs::write(&path, html).await?;
                },
                (OutputType::Pdf, Some((_, page))) => {
                    let bytes = page
                        .pdf(build_pdf_params(&self.export.pdf))
                        .await
                        .map_err(|e| ExportError::PdfFailed(e.to_string()))?;
                    tokio::fs::write(&path, bytes).await?;
                },
                (OutputType::Png | OutputType::Jpeg, Some((_, page))) => {
                    let bytes = self.screenshot(page, *output_type).await?;
                    tokio::fs::write(&path, bytes).await?;
                },
                // A browser type in `types` guarantees the session above.
                (_, None) => return Err(ExportError::NoExecutable),
            }
            info!(path = %path.display(), "wrote output");
            outputs.push(path);
        }

        if let Some((mut browser, _)) = session {
            let _ = browser.close().await;
            let _ = browser.wait().await;
        }
        Ok(outputs)
    }

    async fn open_page(
        &self,
        executable: &Path,
        html_path: &Path,
    ) -> Result<(Browser, Page), ExportError> {
        let config = CdpBrowserConfig::builder()
            .chrome_executable(executable)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .build()
            .map_err(ExportError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExportError::LaunchFailed(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
        });

        let url = Url::from_file_path(std::path::absolute(html_path)?)
            .map_err(|_| ExportError::Navigation(format!("not a file path: {}", html_path.display())))?;
        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| ExportError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ExportError::Navigation(e.to_string()))?;
        // Diagram scripts render after load; give them a moment.
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        Ok((browser, page))
    }

    async fn screenshot(&self, page: &Page, output_type: OutputType) -> Result<Vec<u8>, ExportError> {
        let image = &self.export.image;
        let mut builder = ScreenshotParams::builder()
            .omit_background(image.omit_background);

        builder = match output_type {
            OutputType::Jpeg => builder
                .format(CaptureScreenshotFormat::Jpeg)
                .quality(i64::from(image.quality)),
            _ => builder.format(CaptureScreenshotFormat::Png),
        };

        // A clip region overrides full-page capture.
        if let Some((x, y, width, height)) = image.clip() {
            builder = builder.clip(Viewport {
                x,
                y,
                width,
                height,
                scale: 1.0,
            });
        } else {
            builder = builder.full_page(image.full_page);
        }

        page.screenshot(builder.build())
            .await
            .map_err(|e| ExportError::ScreenshotFailed(e.to_string()))
    }
}
