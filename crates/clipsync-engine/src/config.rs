//! Engine Configuration

use clipsync_media::ReadyState;
use serde::Deserialize;

use crate::EngineError;

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Intersection ratio at or above which a surface counts as in view
    pub visibility_threshold: f32,

    /// Hit-region padding on each side of the progress track (px)
    pub track_padding_px: f32,

    /// Grace delay between a seek and resuming playback (ms)
    pub seek_resume_delay_ms: f64,

    /// Seekable window must extend past this to be trusted (s)
    pub min_seekable_span_secs: f64,

    /// Window is "restricted" when it starts after, or ends before, the full
    /// duration by more than this (s)
    pub seekable_gap_secs: f64,

    /// Readiness the dub track needs before time assignment or play
    pub dub_ready_state: ReadyState,

    /// Largest tolerated dub/video offset during playback (s)
    pub max_dub_drift_secs: f64,

    /// How long a fetched transcript stays fresh (s)
    pub transcript_ttl_secs: u64,

    /// Base for relative media URLs
    pub media_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.6,
            track_padding_px: 16.0,
            seek_resume_delay_ms: 100.0,
            min_seekable_span_secs: 1.0,
            seekable_gap_secs: 0.5,
            dub_ready_state: ReadyState::HaveCurrentData,
            max_dub_drift_secs: 0.25,
            transcript_ttl_secs: 5 * 60,
            media_base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(EngineError::Config(format!(
                "visibility_threshold must be within 0..=1, got {}",
                self.visibility_threshold
            )));
        }
        if !self.track_padding_px.is_finite()
            || self.track_padding_px < 0.0
            || !self.seek_resume_delay_ms.is_finite()
            || self.seek_resume_delay_ms < 0.0
        {
            return Err(EngineError::Config("padding and delay must be finite and non-negative".into()));
        }
        if !self.max_dub_drift_secs.is_finite() || self.max_dub_drift_secs <= 0.0 {
            return Err(EngineError::Config("max_dub_drift_secs must be positive".into()));
        }
        Ok(())
    }
}
