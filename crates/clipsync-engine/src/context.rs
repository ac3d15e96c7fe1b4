//! Playback Context
//!
//! One context per rendered video surface. It owns the primary video, the
//! optional dub track, the time reference and the per-surface scheduler, and
//! is the single entry point for every user action on that surface.
//!
//! Element events are not delivered by callback; the host calls `advance`
//! once per frame and the context drains both elements' event queues, runs
//! due timers and frame callbacks, then drains again.

use clipsync_media::{HtmlMediaElement, MediaElement, MediaEvent, SubtitleTimestamp, SubtitleTrack};

use crate::autoplay::{AutoplayController, VisibilityChange};
use crate::clock::TimeReference;
use crate::config::EngineConfig;
use crate::media::{VideoId, VideoMedia};
use crate::mute_dub::{DubFollow, FollowResult, MuteDubController};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::seek::{SeekController, SeekOutcome, TrackGeometry};
use crate::snapshot::{PlaybackSnapshot, SubtitleLanguage};
use crate::subtitle::SubtitleRenderer;
use crate::visibility::{VisibilityEntry, VisibilityObserver};

/// Reactions to events can queue further events; bound the drain loop.
const MAX_EVENT_ROUNDS: usize = 8;

/// Deferred work queued on a context's scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    SubtitleFrame,
    ResumeAfterSeek,
}

/// Who owns the mute, dubbing and subtitle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerMode {
    /// The context owns everything.
    #[default]
    Feed,
    /// An external owner holds the control state and mirrors it back through
    /// `apply_external`.
    Detail,
}

/// Control-state change reported to an external owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChange {
    Muted(bool),
    Dubbing(bool),
    SubtitleLanguage(SubtitleLanguage),
}

/// Externally owned control state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalControls {
    pub muted: bool,
    pub dubbing: bool,
    pub subtitle_language: Option<SubtitleLanguage>,
}

/// Playback context for one video surface
#[derive(Debug)]
pub struct PlaybackContext<V: MediaElement, A: MediaElement> {
    media: VideoMedia,
    mode: PlayerMode,
    config: EngineConfig,

    video: V,
    dub: Option<A>,

    time: TimeReference,
    scheduler: Scheduler<Task>,

    mute_dub: MuteDubController,
    seek: SeekController,
    autoplay: AutoplayController,
    subtitles: SubtitleRenderer,

    language: SubtitleLanguage,
    transcript: Option<SubtitleTrack>,

    // Playback was interrupted by a seek and should restart once it settles.
    resume_wanted: bool,
    resume_timer: Option<TimerHandle>,
}

impl<V: MediaElement, A: MediaElement> PlaybackContext<V, A> {
    pub fn new(
        media: VideoMedia,
        video: V,
        dub: Option<A>,
        mode: PlayerMode,
        config: &EngineConfig,
    ) -> Self {
        let mut ctx = Self {
            mode,
            config: config.clone(),
            video,
            dub,
            time: TimeReference::new(),
            scheduler: Scheduler::new(),
            mute_dub: MuteDubController::new(config.dub_ready_state),
            seek: SeekController::new(config),
            autoplay: AutoplayController::new(config.visibility_threshold),
            subtitles: SubtitleRenderer::new(),
            language: SubtitleLanguage::Off,
            transcript: None,
            resume_wanted: false,
            resume_timer: None,
            media,
        };
        ctx.mute_dub.project(&mut ctx.video, ctx.dub.as_mut());
        tracing::info!(
            video_id = ctx.media.id,
            ?mode,
            has_dub = ctx.dub.is_some(),
            "playback context mounted"
        );
        ctx
    }

    pub fn id(&self) -> VideoId {
        self.media.id
    }

    pub fn media(&self) -> &VideoMedia {
        &self.media
    }

    pub fn mode(&self) -> PlayerMode {
        self.mode
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    /// Host access for driving the element (buffering, playback clock).
    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn dub(&self) -> Option<&A> {
        self.dub.as_ref()
    }

    pub fn dub_mut(&mut self) -> Option<&mut A> {
        self.dub.as_mut()
    }

    pub fn time_reference(&self) -> &TimeReference {
        &self.time
    }

    pub fn mute_dub(&self) -> &MuteDubController {
        &self.mute_dub
    }

    pub fn is_dragging(&self) -> bool {
        self.seek.is_dragging()
    }

    pub fn is_in_view(&self) -> bool {
        self.autoplay.is_in_view()
    }

    /// The only state the presentation layer reads.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_muted: self.mute_dub.is_muted(),
            is_dubbing: self.mute_dub.is_dubbing(),
            subtitle_language: self.language,
            progress_percent: self.seek.progress(),
        }
    }

    fn notify(&self, change: ControlChange) -> Option<ControlChange> {
        (self.mode == PlayerMode::Detail).then_some(change)
    }

    // ========================================================================
    // User actions
    // ========================================================================

    /// Mute button. In detail mode the new value is also reported.
    pub fn toggle_mute(&mut self) -> Option<ControlChange> {
        let muted = self.mute_dub.toggle_mute(&mut self.video, self.dub.as_mut());
        self.notify(ControlChange::Muted(muted))
    }

    /// Dub button. In detail mode the new value is also reported.
    pub fn toggle_dubbing(&mut self) -> Option<ControlChange> {
        let dubbing = self
            .mute_dub
            .toggle_dubbing(&mut self.video, self.dub.as_mut());
        if !dubbing {
            self.release_resume();
        }
        self.notify(ControlChange::Dubbing(dubbing))
    }

    /// Subtitle picker. Detail mode only reports the choice; it takes effect
    /// once the owner mirrors it back.
    pub fn select_subtitle_language(&mut self, language: SubtitleLanguage) -> Option<ControlChange> {
        match self.mode {
            PlayerMode::Feed => {
                self.set_language(language);
                None
            }
            PlayerMode::Detail => Some(ControlChange::SubtitleLanguage(language)),
        }
    }

    /// Mirror externally owned state. Never runs toggle side effects.
    pub fn apply_external(&mut self, controls: ExternalControls) {
        self.mute_dub
            .set_muted(controls.muted, &mut self.video, self.dub.as_mut());
        let was_dubbing = self.mute_dub.is_dubbing();
        self.mute_dub
            .set_dubbing(controls.dubbing, &mut self.video, self.dub.as_mut());
        if was_dubbing && !controls.dubbing {
            self.release_resume();
        }
        if let Some(language) = controls.subtitle_language {
            self.set_language(language);
        }
    }

    /// Click on the surface.
    pub fn toggle_play(&mut self) {
        self.cancel_resume();
        if self.video.paused() {
            if let Err(e) = self.video.play() {
                tracing::debug!(error = %e, "play refused");
                return;
            }
            let result = self
                .mute_dub
                .follow(&self.video, self.dub.as_mut(), DubFollow::AnchorAndPlay);
            self.on_follow(result);
        } else {
            self.video.pause();
            self.mute_dub.pause_dub(self.dub.as_mut());
        }
    }

    pub fn on_scrub_start(&mut self, pointer_x: f32, track: TrackGeometry) {
        // A drag takes over any resume a previous seek left pending.
        if self.take_resume() {
            self.seek.defer_resume();
        }
        let outcome = self.seek.on_scrub_start(
            pointer_x,
            track,
            &mut self.video,
            self.dub.as_mut(),
            self.mute_dub.is_dubbing(),
            &self.time,
        );
        self.after_seek(outcome);
    }

    pub fn on_scrub_move(&mut self, pointer_x: f32, track: TrackGeometry) {
        let outcome = self.seek.on_scrub_move(
            pointer_x,
            track,
            &mut self.video,
            self.dub.as_mut(),
            self.mute_dub.is_dubbing(),
            &self.time,
        );
        self.after_seek(outcome);
    }

    pub fn on_scrub_end(&mut self) {
        if !self.seek.is_dragging() {
            return;
        }
        let resume = self.seek.on_scrub_end();
        self.sync_and_resume(resume);
    }

    /// Pointer released anywhere; ends a drag that left the track.
    pub fn on_global_pointer_release(&mut self) {
        self.on_scrub_end();
    }

    pub fn on_click_seek(&mut self, pointer_x: f32, track: TrackGeometry) {
        let outcome = self.seek.seek_to(
            pointer_x,
            track,
            &mut self.video,
            self.dub.as_mut(),
            self.mute_dub.is_dubbing(),
            &self.time,
        );
        self.after_seek(outcome);
    }

    // ========================================================================
    // Seek sequencing
    // ========================================================================

    fn after_seek(&mut self, outcome: SeekOutcome) {
        let was_playing = match outcome {
            // A rejected seek leaves playback paused at the last known position.
            SeekOutcome::Ignored | SeekOutcome::Rejected { .. } => return,
            SeekOutcome::Seeked { was_playing, .. } => was_playing,
        };
        if self.seek.is_dragging() {
            if was_playing {
                self.seek.defer_resume();
            }
            let result = self
                .mute_dub
                .follow(&self.video, self.dub.as_mut(), DubFollow::Anchor);
            self.on_follow(result);
        } else {
            self.sync_and_resume(was_playing);
        }
    }

    /// Re-anchor the dub track at the new position and, when playback was
    /// interrupted, resume both once the dub track is ready.
    fn sync_and_resume(&mut self, was_playing: bool) {
        self.resume_wanted |= was_playing;
        let action = if self.resume_wanted {
            DubFollow::AnchorThenResume
        } else {
            DubFollow::Anchor
        };
        let result = self.mute_dub.follow(&self.video, self.dub.as_mut(), action);
        if result == FollowResult::Skipped && self.resume_wanted {
            self.schedule_resume();
        } else {
            self.on_follow(result);
        }
    }

    fn on_follow(&mut self, result: FollowResult) {
        if result == FollowResult::Done(DubFollow::AnchorThenResume)
            && self.resume_wanted
            && !self.seek.is_dragging()
        {
            self.schedule_resume();
        }
    }

    fn schedule_resume(&mut self) {
        if let Some(timer) = self.resume_timer.take() {
            self.scheduler.clear_timeout(timer);
        }
        let timer = self
            .scheduler
            .set_timeout(self.config.seek_resume_delay_ms, Task::ResumeAfterSeek);
        self.resume_timer = Some(timer);
    }

    /// A resume that was waiting on the dub track goes ahead without it.
    fn release_resume(&mut self) {
        if self.resume_wanted && self.resume_timer.is_none() && !self.seek.is_dragging() {
            self.schedule_resume();
        }
    }

    /// Drop a pending resume. Returns whether one was pending.
    fn take_resume(&mut self) -> bool {
        if let Some(timer) = self.resume_timer.take() {
            self.scheduler.clear_timeout(timer);
        }
        std::mem::take(&mut self.resume_wanted)
    }

    fn cancel_resume(&mut self) {
        self.take_resume();
        self.seek.cancel_resume();
    }

    fn resume(&mut self) {
        self.resume_timer = None;
        if !std::mem::take(&mut self.resume_wanted) {
            return;
        }
        if let Err(e) = self.video.play() {
            tracing::debug!(error = %e, "resume after seek refused");
            return;
        }
        let result = self
            .mute_dub
            .follow(&self.video, self.dub.as_mut(), DubFollow::AnchorAndPlay);
        self.on_follow(result);
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Observe this surface. Safe to call repeatedly.
    pub fn subscribe_visibility(&mut self, observer: &mut VisibilityObserver) {
        self.autoplay.subscribe(observer, self.media.id);
    }

    /// Feed an observer entry. Returns `(video id, in view)` when the
    /// surface's in-view state changed.
    pub fn on_visibility(&mut self, entry: &VisibilityEntry) -> Option<(VideoId, bool)> {
        let change = self.autoplay.on_entry(entry)?;
        tracing::debug!(video_id = self.media.id, ?change, "visibility changed");
        match change {
            VisibilityChange::Entered { first_reveal } => {
                self.autoplay.enter(
                    first_reveal,
                    &mut self.video,
                    self.dub.as_mut(),
                    &mut self.mute_dub,
                );
                Some((self.media.id, true))
            }
            VisibilityChange::Left => {
                self.cancel_resume();
                self.autoplay
                    .leave(&mut self.video, self.dub.as_mut(), &self.mute_dub);
                Some((self.media.id, false))
            }
        }
    }

    // ========================================================================
    // Subtitles
    // ========================================================================

    fn set_language(&mut self, language: SubtitleLanguage) {
        if language == self.language {
            return;
        }
        tracing::debug!(video_id = self.media.id, language = language.as_str(), "subtitle language");
        self.language = language;
        let track = self.transcript.clone().unwrap_or_default();
        self.subtitles.set_input(track, language, &mut self.scheduler);
    }

    /// A subtitle language is selected and no timestamps were provided yet.
    pub fn needs_transcript(&self) -> bool {
        !self.language.is_off() && self.transcript.is_none()
    }

    pub fn provide_transcript(&mut self, track: SubtitleTrack) {
        self.transcript = Some(track.clone());
        self.subtitles
            .set_input(track, self.language, &mut self.scheduler);
    }

    pub fn active_subtitle(&self) -> Option<&SubtitleTimestamp> {
        self.subtitles.active()
    }

    pub fn subtitle_text(&self) -> Option<&str> {
        self.subtitles.current_text()
    }

    // ========================================================================
    // Event pump
    // ========================================================================

    /// Run one host frame at `now_ms`. Returns true when the visible
    /// subtitle changed.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        self.pump_events();
        let mut changed = false;
        for task in self.scheduler.advance(now_ms) {
            match task {
                Task::SubtitleFrame => {
                    changed |= self.subtitles.tick(&self.time, &mut self.scheduler);
                }
                Task::ResumeAfterSeek => self.resume(),
            }
        }
        self.pump_events();
        changed
    }

    /// Deliver queued element events.
    pub fn pump_events(&mut self) {
        for _ in 0..MAX_EVENT_ROUNDS {
            let video_events = self.video.drain_events();
            let dub_events = self
                .dub
                .as_mut()
                .map(|dub| dub.drain_events())
                .unwrap_or_default();
            if video_events.is_empty() && dub_events.is_empty() {
                return;
            }
            for event in video_events {
                self.on_video_event(event);
            }
            for event in dub_events {
                self.on_dub_event(event);
            }
        }
        tracing::debug!(video_id = self.media.id, "event queue still busy, continuing next frame");
    }

    fn on_video_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => {
                self.seek.update_progress(&self.video, &self.time);
                self.correct_drift();
            }
            MediaEvent::LoadedMetadata => {
                self.seek.update_progress(&self.video, &self.time);
            }
            MediaEvent::Seeking => self.mute_dub.pause_dub(self.dub.as_mut()),
            MediaEvent::Seeked => {
                self.seek.update_progress(&self.video, &self.time);
                let action = if self.video.paused() {
                    DubFollow::Anchor
                } else {
                    DubFollow::AnchorAndPlay
                };
                let result = self.mute_dub.follow(&self.video, self.dub.as_mut(), action);
                self.on_follow(result);
            }
            MediaEvent::Play => {
                if self.dub.as_ref().is_some_and(|dub| dub.paused()) {
                    let result = self.mute_dub.follow(
                        &self.video,
                        self.dub.as_mut(),
                        DubFollow::AnchorAndPlay,
                    );
                    self.on_follow(result);
                }
            }
            MediaEvent::Pause => self.mute_dub.pause_dub(self.dub.as_mut()),
            _ => {}
        }
    }

    fn on_dub_event(&mut self, event: MediaEvent) {
        let completed = self
            .mute_dub
            .on_dub_event(event, &self.video, self.dub.as_mut());
        if let Some(action) = completed {
            self.on_follow(FollowResult::Done(action));
        }
        if event == MediaEvent::Error {
            self.release_resume();
        }
    }

    fn correct_drift(&mut self) {
        if !self.mute_dub.is_dubbing() || self.video.paused() {
            return;
        }
        let Some(dub) = self.dub.as_mut() else {
            return;
        };
        if dub.paused() || !dub.is_usable() || dub.ready_state() < self.config.dub_ready_state {
            return;
        }
        let target = self.video.current_time();
        let drift = (dub.current_time() - target).abs();
        if drift > self.config.max_dub_drift_secs {
            tracing::debug!(drift, "dub track drifted, re-anchoring");
            if let Err(e) = dub.set_current_time(target) {
                tracing::warn!(error = %e, "could not correct dub drift");
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release everything this context holds.
    pub fn teardown(&mut self, observer: Option<&mut VisibilityObserver>) {
        if let Some(observer) = observer {
            self.autoplay.unsubscribe(observer);
        }
        self.subtitles.stop(&mut self.scheduler);
        self.scheduler.clear();
        self.resume_timer = None;
        self.resume_wanted = false;
        self.seek.cancel_resume();
        self.mute_dub.cancel_pending();

        self.video.pause();
        self.video.clear_source();
        self.video.drain_events();
        if let Some(dub) = self.dub.as_mut() {
            dub.pause();
            dub.clear_source();
            dub.drain_events();
        }
        tracing::info!(video_id = self.media.id, "playback context torn down");
    }

    /// Tear down and start over for a different video.
    pub fn reset(
        &mut self,
        media: VideoMedia,
        video: V,
        dub: Option<A>,
        mut observer: Option<&mut VisibilityObserver>,
    ) {
        let resubscribe = self.autoplay.subscription().is_some();
        self.teardown(observer.as_deref_mut());
        tracing::info!(from = self.media.id, to = media.id, "resetting playback context");

        let config = self.config.clone();
        *self = Self::new(media, video, dub, self.mode, &config);
        if resubscribe {
            if let Some(observer) = observer {
                self.subscribe_visibility(observer);
            }
        }
    }
}

impl PlaybackContext<HtmlMediaElement, HtmlMediaElement> {
    /// Context over simulated elements created from the record's URLs.
    pub fn from_media(media: VideoMedia, mode: PlayerMode, config: &EngineConfig) -> Self {
        let video = HtmlMediaElement::from_url(&media.video_url);
        let dub = media
            .dub_audio_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(HtmlMediaElement::from_url);
        Self::new(media, video, dub, mode, config)
    }
}
