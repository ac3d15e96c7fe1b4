//! Subtitle Renderer
//!
//! Per-frame lookup of the span under the current playback time.

use clipsync_media::{SubtitleTimestamp, SubtitleTrack};

use crate::clock::TimeReference;
use crate::context::Task;
use crate::scheduler::{FrameHandle, Scheduler};
use crate::snapshot::SubtitleLanguage;

/// Subtitle renderer
#[derive(Debug, Default)]
pub struct SubtitleRenderer {
    track: SubtitleTrack,
    language: SubtitleLanguage,
    active: Option<usize>,
    frame: Option<FrameHandle>,
}

impl SubtitleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> SubtitleLanguage {
        self.language
    }

    pub fn track(&self) -> &SubtitleTrack {
        &self.track
    }

    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    /// Replace the track or language. The frame loop restarts from scratch
    /// when either changes, and stays stopped while there is nothing to show.
    pub(crate) fn set_input(
        &mut self,
        track: SubtitleTrack,
        language: SubtitleLanguage,
        scheduler: &mut Scheduler<Task>,
    ) {
        if track.same_as(&self.track) && language == self.language {
            return;
        }
        self.stop(scheduler);
        self.track = track;
        self.language = language;
        if !language.is_off() && !self.track.is_empty() {
            self.frame = Some(scheduler.request_frame(Task::SubtitleFrame));
        }
    }

    /// One frame: re-match against `time` and queue the next frame.
    ///
    /// Returns true when the active span changed.
    pub(crate) fn tick(&mut self, time: &TimeReference, scheduler: &mut Scheduler<Task>) -> bool {
        if self.frame.take().is_none() {
            return false;
        }
        let found = self.track.find_active(time.get());
        let changed = found != self.active;
        self.active = found;
        self.frame = Some(scheduler.request_frame(Task::SubtitleFrame));
        changed
    }

    pub fn active(&self) -> Option<&SubtitleTimestamp> {
        self.active.and_then(|i| self.track.get(i))
    }

    /// Text of the active span in the selected language.
    pub fn current_text(&self) -> Option<&str> {
        let cue = self.active()?;
        match self.language {
            SubtitleLanguage::Off => None,
            SubtitleLanguage::En => Some(cue.text.as_str()),
            SubtitleLanguage::Vi => Some(cue.text_vi.as_str()),
        }
    }

    pub(crate) fn stop(&mut self, scheduler: &mut Scheduler<Task>) {
        if let Some(frame) = self.frame.take() {
            scheduler.cancel_frame(frame);
        }
        self.active = None;
    }
}
