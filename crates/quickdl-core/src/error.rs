//! Error types for quickdl-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuickDlError>;

#[derive(Error, Debug)]
pub enum QuickDlError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// yt-dlp exited unsuccessfully; `message` is its own description of the failure.
    #[error("{message}")]
    Failed { code: Option<i32>, message: String },

    #[error("yt-dlp did not report an output file")]
    MissingOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path escapes the download directory: {0}")]
    OutsideDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
