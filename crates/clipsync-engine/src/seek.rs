//! Seek / Progress Control
//!
//! Maps pointer interaction on the progress track to media time, resolves a
//! usable duration for streamed sources, performs the seek on the primary
//! video and keeps `progress_percent` in step with it.
//!
//! Re-synchronizing the dub track and resuming playback after a seek are
//! sequenced by the playback context; this controller reports what happened.

use clipsync_media::{MediaElement, ReadyState};

use crate::clock::TimeReference;
use crate::config::EngineConfig;

/// Client-space extent of the progress control's hit region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGeometry {
    pub left: f32,
    pub width: f32,
}

impl TrackGeometry {
    pub fn new(left: f32, width: f32) -> Self {
        Self { left, width }
    }
}

/// Result of a seek attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// Nothing to seek against yet (no metadata or no duration), or the
    /// pointer event did not belong to a drag.
    Ignored,
    /// The element rejected the time assignment; position is unchanged.
    Rejected { was_playing: bool },
    /// The video now sits at `time`.
    Seeked { time: f64, was_playing: bool },
}

/// Seek / progress controller
#[derive(Debug)]
pub struct SeekController {
    progress: f64,
    dragging: bool,
    resume_after_drag: bool,
    padding: f32,
    min_seekable_span: f64,
    seekable_gap: f64,
}

impl SeekController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            progress: 0.0,
            dragging: false,
            resume_after_drag: false,
            padding: config.track_padding_px,
            min_seekable_span: config.min_seekable_span_secs,
            seekable_gap: config.seekable_gap_secs,
        }
    }

    /// 0..=100
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Fraction of the track under `pointer_x`, excluding the padding.
    pub fn fraction_at(&self, pointer_x: f32, track: TrackGeometry) -> f64 {
        let bar_width = track.width - 2.0 * self.padding;
        if !bar_width.is_finite() || bar_width <= 0.0 {
            return 0.0;
        }
        let relative = pointer_x - track.left;
        let clamped = relative.clamp(self.padding, track.width - self.padding);
        f64::from((clamped - self.padding) / bar_width)
    }

    /// Restrict `target` to the seekable window only when that window is
    /// materially narrower than the whole media.
    pub fn seek_target<V: MediaElement>(&self, video: &V, target: f64, duration: f64) -> f64 {
        let seekable = video.seekable();
        let (Some(start), Some(end)) = (seekable.first_start(), seekable.last_end()) else {
            return target;
        };
        let trusted = end > self.min_seekable_span;
        let restricted =
            trusted && (start > self.seekable_gap || end < duration - self.seekable_gap);
        if restricted && (target < start || target > end) {
            target.clamp(start, end)
        } else {
            target
        }
    }

    /// Recompute progress from the primary video and publish its time.
    pub fn update_progress<V: MediaElement>(&mut self, video: &V, time: &TimeReference) {
        if video.ready_state() < ReadyState::HaveMetadata {
            self.progress = 0.0;
            time.reset();
            return;
        }
        match resolve_duration(video) {
            Some(duration) => {
                let current = video.current_time();
                self.progress = (current / duration * 100.0).clamp(0.0, 100.0);
                time.set(current);
            }
            None => {
                self.progress = 0.0;
                time.reset();
            }
        }
    }

    /// Pointer pressed on the track.
    pub fn on_scrub_start<V: MediaElement, A: MediaElement>(
        &mut self,
        pointer_x: f32,
        track: TrackGeometry,
        video: &mut V,
        dub: Option<&mut A>,
        dubbing: bool,
        time: &TimeReference,
    ) -> SeekOutcome {
        self.dragging = true;
        self.seek_to(pointer_x, track, video, dub, dubbing, time)
    }

    /// Pointer moved; only effective while dragging.
    pub fn on_scrub_move<V: MediaElement, A: MediaElement>(
        &mut self,
        pointer_x: f32,
        track: TrackGeometry,
        video: &mut V,
        dub: Option<&mut A>,
        dubbing: bool,
        time: &TimeReference,
    ) -> SeekOutcome {
        if !self.dragging {
            return SeekOutcome::Ignored;
        }
        self.seek_to(pointer_x, track, video, dub, dubbing, time)
    }

    /// Pointer released, on the track or anywhere else. Returns whether
    /// playback interrupted by the drag should now resume.
    pub fn on_scrub_end(&mut self) -> bool {
        self.dragging = false;
        std::mem::take(&mut self.resume_after_drag)
    }

    /// Hold a resume until the drag ends.
    pub fn defer_resume(&mut self) {
        self.resume_after_drag = true;
    }

    /// Forget a resume held for the end of a drag.
    pub fn cancel_resume(&mut self) {
        self.resume_after_drag = false;
    }

    /// Seek the video to the point under `pointer_x`.
    ///
    /// Both elements are paused first when the video was playing. Progress
    /// jumps to the clicked fraction immediately.
    pub fn seek_to<V: MediaElement, A: MediaElement>(
        &mut self,
        pointer_x: f32,
        track: TrackGeometry,
        video: &mut V,
        dub: Option<&mut A>,
        dubbing: bool,
        time: &TimeReference,
    ) -> SeekOutcome {
        if video.ready_state() < ReadyState::HaveMetadata {
            return SeekOutcome::Ignored;
        }
        let Some(duration) = resolve_duration(video) else {
            return SeekOutcome::Ignored;
        };

        let fraction = self.fraction_at(pointer_x, track);
        let target = (fraction * duration).clamp(0.0, duration);
        self.progress = fraction * 100.0;

        let was_playing = !video.paused();
        if was_playing {
            video.pause();
            if dubbing {
                if let Some(dub) = dub {
                    dub.pause();
                }
            }
        }

        let target = self.seek_target(&*video, target, duration);
        if let Err(e) = video.set_current_time(target) {
            tracing::warn!(error = %e, target, "seek rejected, keeping current position");
            let current = video.current_time();
            self.progress = (current / duration * 100.0).clamp(0.0, 100.0);
            time.set(current);
            return SeekOutcome::Rejected { was_playing };
        }

        let actual = video.current_time();
        time.set(actual);
        tracing::debug!(target, actual, was_playing, "seeked");
        SeekOutcome::Seeked {
            time: actual,
            was_playing,
        }
    }
}

/// Media duration, falling back to the end of the seekable range when the
/// element reports none (common for streamed sources).
pub fn resolve_duration<V: MediaElement>(video: &V) -> Option<f64> {
    let duration = video.duration();
    if duration.is_finite() && duration > 0.0 {
        return Some(duration);
    }
    video
        .seekable()
        .last_end()
        .filter(|end| end.is_finite() && *end > 0.0)
}
