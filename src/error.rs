//! Crate-wide error type

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to create resampler: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),
    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("No playable audio track found")]
    NoTrack,
    #[error("Audio device error: {0}")]
    Device(String),
    #[error("Failed to get stream config: {0}")]
    StreamConfig(String),
    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Failed to start stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
