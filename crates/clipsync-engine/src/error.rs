//! Engine errors

use clipsync_media::MediaError;

use crate::transport::TransportError;

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Normalize error: {0}")]
    Normalize(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
