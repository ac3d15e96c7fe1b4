//! Mute / Dub Control
//!
//! Owns the muted and dubbing flags and keeps the two media elements in line
//! with them: while dubbing, the video is silent and the dub track carries the
//! audio; otherwise the dub track is paused and silent.

use clipsync_media::{MediaElement, MediaEvent, NetworkState, OnceListener, ReadyState};

/// Events that can satisfy a pending readiness wait
const READY_EVENTS: &[MediaEvent] = &[MediaEvent::LoadedData, MediaEvent::CanPlay];

/// What to do with the dub track once it can accept a time assignment.
///
/// Ordered by strength; a pending wait is only ever upgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DubFollow {
    /// Move the dub position to the video's.
    Anchor,
    /// Anchor, then play if the video is playing.
    AnchorAndPlay,
    /// Anchor; the caller resumes both elements after a seek.
    AnchorThenResume,
}

/// Result of `MuteDubController::follow`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    /// Performed immediately.
    Done(DubFollow),
    /// Waiting on the dub track's readiness.
    Deferred,
    /// Dubbing is off, or there is no usable dub track.
    Skipped,
}

/// Mute / dub controller
#[derive(Debug)]
pub struct MuteDubController {
    muted: bool,
    dubbing: bool,
    ready_threshold: ReadyState,
    pending: OnceListener<DubFollow>,
}

impl MuteDubController {
    pub fn new(ready_threshold: ReadyState) -> Self {
        Self {
            muted: false,
            dubbing: false,
            ready_threshold,
            pending: OnceListener::new(),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_dubbing(&self) -> bool {
        self.dubbing
    }

    /// Pending readiness listeners on the dub track (0 or 1)
    pub fn pending_listener_count(&self) -> usize {
        self.pending.listener_count()
    }

    pub fn pending_follow(&self) -> Option<DubFollow> {
        self.pending.peek().copied()
    }

    pub fn cancel_pending(&mut self) {
        self.pending.cancel();
    }

    fn is_ready<A: MediaElement>(&self, dub: &A) -> bool {
        dub.ready_state() >= self.ready_threshold
    }

    /// Write the mute flags implied by the current state onto both elements.
    pub fn project<V: MediaElement, A: MediaElement>(&self, video: &mut V, dub: Option<&mut A>) {
        video.set_muted(self.dubbing || self.muted);
        if let Some(dub) = dub {
            dub.set_muted(!self.dubbing || self.muted);
        }
    }

    /// Flip the user's mute choice. Returns the new value.
    pub fn toggle_mute<V: MediaElement, A: MediaElement>(
        &mut self,
        video: &mut V,
        dub: Option<&mut A>,
    ) -> bool {
        self.muted = !self.muted;
        self.project(video, dub);
        tracing::debug!(muted = self.muted, dubbing = self.dubbing, "mute toggled");
        self.muted
    }

    /// Switch between native audio and the dub track. Returns the new value.
    pub fn toggle_dubbing<V: MediaElement, A: MediaElement>(
        &mut self,
        video: &mut V,
        dub: Option<&mut A>,
    ) -> bool {
        self.dubbing = !self.dubbing;
        tracing::debug!(dubbing = self.dubbing, "dubbing toggled");

        if self.dubbing {
            // Silence the native track before the dub track can make a sound.
            video.set_muted(true);
            if let Some(dub) = dub {
                dub.set_muted(self.muted);
                self.follow(&*video, Some(dub), DubFollow::AnchorAndPlay);
            }
        } else {
            self.pending.cancel();
            if let Some(dub) = dub {
                dub.pause();
                dub.set_muted(true);
                // Keep the next enable in sync.
                if dub.is_usable() {
                    anchor(&*video, dub);
                }
            }
            video.set_muted(self.muted);
        }
        self.dubbing
    }

    /// Mirror an externally owned mute value without toggle side effects.
    pub fn set_muted<V: MediaElement, A: MediaElement>(
        &mut self,
        muted: bool,
        video: &mut V,
        dub: Option<&mut A>,
    ) {
        if self.muted != muted {
            self.muted = muted;
            self.project(video, dub);
        }
    }

    /// Mirror an externally owned dubbing value without toggle side effects.
    pub fn set_dubbing<V: MediaElement, A: MediaElement>(
        &mut self,
        dubbing: bool,
        video: &mut V,
        mut dub: Option<&mut A>,
    ) {
        if self.dubbing == dubbing {
            return;
        }
        self.dubbing = dubbing;
        if !dubbing {
            self.pending.cancel();
            if let Some(dub) = dub.as_deref_mut() {
                dub.pause();
            }
        }
        self.project(video, dub);
    }

    /// First reveal of a surface: audible unless dubbing needs the video
    /// silent. The dub track's mute flag is left alone.
    pub fn reveal<V: MediaElement>(&mut self, video: &mut V) {
        if self.dubbing {
            video.set_muted(true);
        } else {
            self.muted = false;
            video.set_muted(false);
        }
    }

    /// Re-anchor the dub track to the video, deferring to the dub track's
    /// readiness signal when it cannot take a time assignment yet.
    pub fn follow<V: MediaElement, A: MediaElement>(
        &mut self,
        video: &V,
        dub: Option<&mut A>,
        action: DubFollow,
    ) -> FollowResult {
        if !self.dubbing {
            return FollowResult::Skipped;
        }
        let Some(dub) = dub else {
            return FollowResult::Skipped;
        };
        if !dub.is_usable() {
            tracing::debug!("dub track unusable, video stays muted without dub audio");
            return FollowResult::Skipped;
        }

        if self.is_ready(dub) {
            let action = self.pending.cancel().map_or(action, |p| p.max(action));
            self.perform(video, dub, action);
            return FollowResult::Done(action);
        }

        let action = self.pending_follow().map_or(action, |p| p.max(action));
        self.pending.arm(READY_EVENTS, action);
        if dub.ready_state() == ReadyState::HaveNothing
            && dub.network_state() != NetworkState::Loading
        {
            dub.load();
        }
        tracing::debug!(?action, ready_state = ?dub.ready_state(), "dub track not ready, deferring");
        FollowResult::Deferred
    }

    fn perform<V: MediaElement, A: MediaElement>(&self, video: &V, dub: &mut A, action: DubFollow) {
        anchor(video, dub);
        if action == DubFollow::AnchorAndPlay && !video.paused() {
            if let Err(e) = dub.play() {
                tracing::debug!(error = %e, "dub play refused");
            }
        }
    }

    /// Pause the dub track if it is in use.
    pub fn pause_dub<A: MediaElement>(&self, dub: Option<&mut A>) {
        if let Some(dub) = dub {
            if self.dubbing && dub.is_usable() {
                dub.pause();
            }
        }
    }

    /// Deliver a dub-track event. Returns the deferred action if this event
    /// completed it.
    pub fn on_dub_event<V: MediaElement, A: MediaElement>(
        &mut self,
        event: MediaEvent,
        video: &V,
        dub: Option<&mut A>,
    ) -> Option<DubFollow> {
        let dub = dub?;
        if event == MediaEvent::Error {
            self.on_dub_error(dub);
            return None;
        }

        let action = self.pending.fire(event)?;
        if !self.dubbing || !dub.is_usable() {
            return None;
        }
        if !self.is_ready(dub) {
            // Fired below the configured threshold; keep waiting.
            self.pending.arm(READY_EVENTS, action);
            return None;
        }
        self.perform(video, dub, action);
        Some(action)
    }

    /// The dub source failed: drop it for the rest of the session.
    pub fn on_dub_error<A: MediaElement>(&mut self, dub: &mut A) {
        let reason = dub
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".into());
        tracing::warn!(src = dub.src(), %reason, "dub track failed to load, continuing without dub audio");
        self.pending.cancel();
        dub.pause();
        dub.set_muted(true);
        dub.clear_source();
    }
}

fn anchor<V: MediaElement, A: MediaElement>(video: &V, dub: &mut A) {
    if let Err(e) = dub.set_current_time(video.current_time()) {
        tracing::warn!(error = %e, "could not anchor dub track");
    }
}
