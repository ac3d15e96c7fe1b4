//! clipsync Engine
//!
//! Dual-track playback synchronization for short-video surfaces.
//!
//! # Goals
//! - One authoritative clock per surface: the primary video
//! - Dub audio that follows the video through toggles, seeks and scrolling
//! - Local, silent recovery from unready or broken media
//!
//! # Example
//! ```rust,ignore
//! use clipsync_engine::{EngineConfig, PlaybackContext, PlayerMode, VideoMedia};
//!
//! let config = EngineConfig::default();
//! let media = VideoMedia::new(1, "https://cdn.example/1.mp4").with_dub_audio("https://cdn.example/1-vi.mp3");
//! let mut ctx = PlaybackContext::from_media(media, PlayerMode::Feed, &config);
//! ctx.toggle_dubbing();
//! ctx.advance(16.0);
//! let snapshot = ctx.snapshot();
//! ```

mod error;

pub mod autoplay;
pub mod clock;
pub mod config;
pub mod context;
pub mod feed;
pub mod media;
pub mod mute_dub;
pub mod scheduler;
pub mod seek;
pub mod snapshot;
pub mod subtitle;
pub mod transcript;
pub mod transport;
pub mod visibility;

pub use autoplay::{AutoplayController, VisibilityChange};
pub use clock::TimeReference;
pub use config::EngineConfig;
pub use context::{ControlChange, ExternalControls, PlaybackContext, PlayerMode};
pub use error::EngineError;
pub use feed::Feed;
pub use media::{resolve_media_url, VideoId, VideoMedia};
pub use mute_dub::{DubFollow, FollowResult, MuteDubController};
pub use scheduler::{FrameHandle, Scheduler, TimerHandle};
pub use seek::{resolve_duration, SeekController, SeekOutcome, TrackGeometry};
pub use snapshot::{PlaybackSnapshot, SubtitleLanguage};
pub use subtitle::SubtitleRenderer;
pub use transcript::{Transcript, TranscriptProvider, TranscriptStore};
pub use transport::{
    ConnectionState, EventBus, Handler, HandlerId, RealtimeTransport, ReconnectPolicy,
    TransportError, TransportEvent,
};
pub use visibility::{Rect, VisibilityEntry, VisibilityObserver};

// Re-export the media model for hosts
pub use clipsync_media as media_model;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
