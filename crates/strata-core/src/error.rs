use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable raster {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Empty stack: no input tiles survived discovery and shape validation")]
    EmptyStack,

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, StrataError>;
