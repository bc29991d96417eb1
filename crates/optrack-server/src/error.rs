use thiserror::Error;

/// Errors surfaced by the server and the session pipeline.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Frame source unavailable after {0} consecutive failures")]
    SourceUnavailable(u32),

    #[error("Frame read error: {0}")]
    FrameRead(String),

    #[error("Vision error: {0}")]
    Vision(#[from] optrack_vision::VisionError),

    #[error("Media error: {0}")]
    Media(#[from] optrack_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] optrack_storage::StorageError),

    #[error("ML client error: {0}")]
    MlClient(#[from] optrack_ml_client::MlClientError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

pub fn config_error(msg: impl Into<String>) -> ServerError {
    ServerError::ConfigError(msg.into())
}

pub fn frame_read_error(msg: impl Into<String>) -> ServerError {
    ServerError::FrameRead(msg.into())
}
