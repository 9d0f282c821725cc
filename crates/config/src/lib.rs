//! Configuration loading, validation, and env substitution.
//!
//! Config files: `mdpress.toml`, `mdpress.yaml`, or `mdpress.json`
//! Searched in `./` then `~/.config/mdpress/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        BrowserSection, ExportSection, HttpSection, ImageOptions, MdpressConfig, PdfMargin,
        PdfOptions,
    },
};
