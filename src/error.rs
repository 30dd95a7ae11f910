/**
 * Configuration errors, fatal to a run before any file is touched
 */

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid offset format: '{0}'. Use a format like '+1h', '-30m' or '-2h15m30s'")]
    InvalidOffset(String),

    #[error("invalid date format: '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("missing required parameter for {origin} source: {parameter}")]
    MissingParameter {
        origin: &'static str,
        parameter: &'static str,
    },

    #[error("directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("invalid credentials file {}: {reason}", .path.display())]
    InvalidCredentials { path: PathBuf, reason: String },

    #[error("exiftool is not available: {0}")]
    ExiftoolUnavailable(String),
}
