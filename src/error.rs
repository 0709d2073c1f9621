//! Crate-wide error type.

use thiserror::Error;

/// Errors raised by the host-side collaborators (configuration, audio,
/// compositing, export). The spectrum renderer itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
