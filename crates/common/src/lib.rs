//! Shared filesystem utilities used across all mdpress crates.

pub mod fs;

pub use fs::{is_exists_dir, is_exists_path, mkdir};
