//! Autoplay by Visibility
//!
//! Starts and stops a surface's playback as it scrolls in and out of view.

use clipsync_media::MediaElement;

use crate::media::VideoId;
use crate::mute_dub::{DubFollow, MuteDubController};
use crate::visibility::{VisibilityEntry, VisibilityObserver};

/// A change in a surface's in-view state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    /// The surface reached the threshold. `first_reveal` holds until an
    /// entry actually reaches a usable video.
    Entered { first_reveal: bool },
    Left,
}

/// Autoplay controller for one surface
#[derive(Debug)]
pub struct AutoplayController {
    threshold: f32,
    has_played_once: bool,
    in_view: bool,
    subscribed: Option<VideoId>,
}

impl AutoplayController {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            has_played_once: false,
            in_view: false,
            subscribed: None,
        }
    }

    pub fn is_in_view(&self) -> bool {
        self.in_view
    }

    pub fn has_played_once(&self) -> bool {
        self.has_played_once
    }

    pub fn subscription(&self) -> Option<VideoId> {
        self.subscribed
    }

    /// Observe `id`, replacing a subscription held for a different surface.
    pub fn subscribe(&mut self, observer: &mut VisibilityObserver, id: VideoId) {
        if self.subscribed == Some(id) {
            return;
        }
        if let Some(previous) = self.subscribed.take() {
            observer.unobserve(previous);
            self.in_view = false;
        }
        observer.observe(id);
        self.subscribed = Some(id);
    }

    pub fn unsubscribe(&mut self, observer: &mut VisibilityObserver) {
        if let Some(id) = self.subscribed.take() {
            observer.unobserve(id);
        }
        self.in_view = false;
    }

    /// Fold an observer entry into the in-view state. Entries for other
    /// surfaces, and entries that do not change the state, yield nothing.
    pub fn on_entry(&mut self, entry: &VisibilityEntry) -> Option<VisibilityChange> {
        if self.subscribed != Some(entry.target) {
            return None;
        }
        let in_view = entry.is_in_view(self.threshold);
        if in_view == self.in_view {
            return None;
        }
        self.in_view = in_view;

        if in_view {
            Some(VisibilityChange::Entered {
                first_reveal: !self.has_played_once,
            })
        } else {
            Some(VisibilityChange::Left)
        }
    }

    /// Start playback of a surface that came into view.
    pub fn enter<V: MediaElement, A: MediaElement>(
        &mut self,
        first_reveal: bool,
        video: &mut V,
        dub: Option<&mut A>,
        mute_dub: &mut MuteDubController,
    ) {
        if !video.is_usable() {
            tracing::debug!(src = video.src(), "video unusable, skipping autoplay");
            return;
        }
        // An unusable surface keeps its first reveal for later.
        self.has_played_once = true;
        if first_reveal {
            mute_dub.reveal(video);
        }
        if let Err(e) = video.play() {
            if e.is_not_allowed() {
                tracing::debug!("autoplay refused by host");
            } else {
                tracing::warn!(error = %e, "autoplay failed");
            }
            return;
        }
        mute_dub.follow(&*video, dub, DubFollow::AnchorAndPlay);
    }

    /// Pause a surface that left the view. Position is kept.
    pub fn leave<V: MediaElement, A: MediaElement>(
        &self,
        video: &mut V,
        dub: Option<&mut A>,
        mute_dub: &MuteDubController,
    ) {
        video.pause();
        mute_dub.pause_dub(dub);
    }
}
