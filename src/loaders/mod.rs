//! Scene and material file loading.

// Re-export.
pub mod material_file;
pub mod scene_file;

pub use scene_file::*;

use crate::core::prism::Float;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort loading entirely. Everything recoverable is
/// logged as a warning and skipped instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unable to open \"{path}\": {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Parse a whole token as a float.
pub(crate) fn parse_float(token: &str) -> Option<Float> {
    token.parse().ok()
}

/// Parse a whole token as an integer.
pub(crate) fn parse_int(token: &str) -> Option<i64> {
    token.parse().ok()
}
