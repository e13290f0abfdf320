// THEORY:
// The `error` module names every way the engine can fail. Each variant maps
// to one stage (configuration, file access, decoding, serialization, input
// expansion, inference, display), which lets the driver decide what is fatal
// and what `--keep-going` may skip.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the engine can report. Configuration problems are fatal and
/// surface before any image is touched; the rest are per-image.
#[derive(Debug, Error)]
pub enum GritError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize output record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input error: {message}")]
    Input { message: String },

    #[error("inference failed: {message}")]
    Inference { message: String },

    #[error("display error: {message}")]
    Display { message: String },
}

impl GritError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input { message: message.into() }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference { message: message.into() }
    }

    pub fn display(message: impl Into<String>) -> Self {
        Self::Display { message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type GritResult<T> = Result<T, GritError>;
