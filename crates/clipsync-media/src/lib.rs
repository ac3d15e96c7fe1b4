//! clipsync Media
//!
//! The media-resource model driven by the clipsync playback engine.
//!
//! Features:
//! - `MediaElement`, the surface a host exposes for a video or audio element
//! - `HtmlMediaElement`, an in-process simulated element
//! - One-shot readiness listeners
//! - Timed subtitle tracks

pub mod element;
pub mod events;
pub mod tracks;

pub use element::{HtmlMediaElement, MediaElement, NetworkState, ReadyState, TimeRanges};
pub use events::{MediaEvent, OnceListener};
pub use tracks::{SubtitleTimestamp, SubtitleTrack};

/// Media error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    Aborted = 1,
    Network = 2,
    Decode = 3,
    SrcNotSupported = 4,
    /// The host refused a programmatic `play()` (autoplay policy).
    NotAllowed = 5,
    /// The operation is not valid in the element's current state.
    InvalidState = 6,
}

/// Media error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct MediaError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaError {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `play()` was refused for lack of a user gesture.
    pub fn is_not_allowed(&self) -> bool {
        self.code == MediaErrorCode::NotAllowed
    }
}
