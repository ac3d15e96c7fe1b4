//! Transcript Store
//!
//! Lazily fetched, per-video cache of subtitle timestamps.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use clipsync_media::{SubtitleTimestamp, SubtitleTrack};
use serde::Deserialize;

use crate::config::EngineConfig;
use crate::media::VideoId;
use crate::EngineError;

/// Transcript as returned by the data provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub timestamps: Vec<SubtitleTimestamp>,
}

impl Transcript {
    /// Parse a `{ "timestamps": [...] }` document. Spans with a negative or
    /// inverted range are dropped.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let mut transcript: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Normalize(format!("bad transcript: {e}")))?;
        transcript
            .timestamps
            .retain(|t| t.start.is_finite() && t.end.is_finite() && t.start >= 0.0 && t.end >= t.start);
        Ok(transcript)
    }

    pub fn into_track(self) -> SubtitleTrack {
        SubtitleTrack::new(self.timestamps)
    }
}

/// Source of transcripts (the REST layer in the client)
pub trait TranscriptProvider {
    fn fetch(&mut self, video_id: VideoId) -> Result<Transcript, EngineError>;
}

impl<F> TranscriptProvider for F
where
    F: FnMut(VideoId) -> Result<Transcript, EngineError>,
{
    fn fetch(&mut self, video_id: VideoId) -> Result<Transcript, EngineError> {
        self(video_id)
    }
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    track: SubtitleTrack,
}

/// Transcript cache with a staleness window
#[derive(Debug)]
pub struct TranscriptStore<P> {
    provider: P,
    ttl: Duration,
    cache: HashMap<VideoId, CacheEntry>,
}

impl<P: TranscriptProvider> TranscriptStore<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: HashMap::new(),
        }
    }

    pub fn from_config(provider: P, config: &EngineConfig) -> Self {
        Self::new(provider, Duration::from_secs(config.transcript_ttl_secs))
    }

    /// Timestamps for `video_id`, fetching when absent or stale.
    pub fn get(&mut self, video_id: VideoId) -> SubtitleTrack {
        self.get_at(video_id, Instant::now())
    }

    /// `get` against an explicit clock.
    ///
    /// A failed fetch yields an empty track and is not cached, so the next
    /// call tries again.
    pub fn get_at(&mut self, video_id: VideoId, now: Instant) -> SubtitleTrack {
        if let Some(entry) = self.cache.get(&video_id) {
            if now.saturating_duration_since(entry.fetched_at) < self.ttl {
                return entry.track.clone();
            }
        }

        match self.provider.fetch(video_id) {
            Ok(transcript) => {
                let track = transcript.into_track();
                tracing::debug!(video_id, spans = track.len(), "transcript fetched");
                self.cache.insert(
                    video_id,
                    CacheEntry {
                        fetched_at: now,
                        track: track.clone(),
                    },
                );
                track
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "transcript fetch failed, subtitles unavailable");
                SubtitleTrack::default()
            }
        }
    }

    pub fn invalidate(&mut self, video_id: VideoId) {
        self.cache.remove(&video_id);
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
