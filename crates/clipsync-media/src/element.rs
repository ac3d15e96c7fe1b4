//! Media Elements
//!
//! The element surface the playback engine drives, and `HtmlMediaElement`,
//! an in-process element that simulates buffering, playback and the events a
//! browser would fire.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::events::MediaEvent;
use crate::{MediaError, MediaErrorCode};

/// Network state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkState {
    #[default]
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

/// Ready state
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Time ranges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeRanges {
    ranges: Vec<(f64, f64)>,
}

impl TimeRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single `[start, end]` range.
    pub fn single(start: f64, end: f64) -> Self {
        let mut ranges = Self::new();
        ranges.add(start, end);
        ranges
    }

    pub fn add(&mut self, start: f64, end: f64) {
        self.ranges.push((start, end));
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn length(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn start(&self, index: usize) -> Option<f64> {
        self.ranges.get(index).map(|(s, _)| *s)
    }

    pub fn end(&self, index: usize) -> Option<f64> {
        self.ranges.get(index).map(|(_, e)| *e)
    }

    /// Start of the first range.
    pub fn first_start(&self) -> Option<f64> {
        self.start(0)
    }

    /// End of the last range.
    pub fn last_end(&self) -> Option<f64> {
        self.ranges.last().map(|(_, e)| *e)
    }
}

/// The operations the playback engine performs on a video or audio element.
///
/// Hosts implement this over their native element handles and queue the
/// element's events so `drain_events` can hand them to the engine.
pub trait MediaElement {
    fn src(&self) -> &str;

    fn has_source(&self) -> bool {
        !self.src().is_empty()
    }

    fn error(&self) -> Option<&MediaError>;

    /// A source is set and has not failed.
    fn is_usable(&self) -> bool {
        self.has_source() && self.error().is_none()
    }

    fn ready_state(&self) -> ReadyState;
    fn network_state(&self) -> NetworkState;

    fn current_time(&self) -> f64;
    /// Assign the playback position. Fails for non-finite targets or when the
    /// element cannot seek at all.
    fn set_current_time(&mut self, time: f64) -> Result<(), MediaError>;
    /// `NaN` until metadata is known, `INFINITY` for unbounded streams.
    fn duration(&self) -> f64;

    fn paused(&self) -> bool;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);

    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    fn buffered(&self) -> &TimeRanges;
    fn seekable(&self) -> &TimeRanges;

    /// Begin (or restart) fetching the source.
    fn load(&mut self);
    /// Drop the source so the element stops fetching and stays silent.
    fn clear_source(&mut self);

    /// Events fired since the previous call, oldest first.
    fn drain_events(&mut self) -> Vec<MediaEvent>;
}

/// Simulated media element.
///
/// Buffering progress is driven explicitly with `set_ready_state`,
/// `set_buffered` and `set_seekable`; playback advances with `advance`.
#[derive(Debug)]
pub struct HtmlMediaElement {
    // Source
    pub src: String,

    // State
    pub network_state: NetworkState,
    pub ready_state: ReadyState,
    pub error: Option<MediaError>,

    // Playback
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub ended: bool,
    pub seeking: bool,
    pub playback_rate: f64,

    // Volume
    pub volume: f64,
    pub muted: bool,

    // Buffering
    pub buffered: TimeRanges,
    pub seekable: TimeRanges,

    // Simulation knobs
    pub autoplay_allowed: bool,
    pub reject_seeks: bool,

    events: VecDeque<MediaEvent>,
    play_calls: usize,
}

impl HtmlMediaElement {
    pub fn new() -> Self {
        Self {
            src: String::new(),
            network_state: NetworkState::Empty,
            ready_state: ReadyState::HaveNothing,
            error: None,
            current_time: 0.0,
            duration: f64::NAN,
            paused: true,
            ended: false,
            seeking: false,
            playback_rate: 1.0,
            volume: 1.0,
            muted: false,
            buffered: TimeRanges::new(),
            seekable: TimeRanges::new(),
            autoplay_allowed: true,
            reject_seeks: false,
            events: VecDeque::new(),
            play_calls: 0,
        }
    }

    /// Create from URL
    pub fn from_url(src: &str) -> Self {
        let mut element = Self::new();
        element.src = src.to_string();
        element.network_state = NetworkState::Idle;
        element
    }

    /// A fully downloaded, playable element of the given duration.
    pub fn loaded(src: &str, duration: f64) -> Self {
        let mut element = Self::from_url(src);
        element.set_duration(duration);
        element.set_buffered(TimeRanges::single(0.0, duration));
        element.set_seekable(TimeRanges::single(0.0, duration));
        element.set_ready_state(ReadyState::HaveEnoughData);
        element.events.clear();
        element
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn set_buffered(&mut self, ranges: TimeRanges) {
        self.buffered = ranges;
    }

    pub fn set_seekable(&mut self, ranges: TimeRanges) {
        self.seekable = ranges;
    }

    /// Move to `state`, firing the events a browser fires when crossing each
    /// readiness level on the way up.
    pub fn set_ready_state(&mut self, state: ReadyState) {
        let previous = self.ready_state;
        self.ready_state = state;
        if state <= previous {
            return;
        }
        self.network_state = NetworkState::Idle;
        if previous < ReadyState::HaveMetadata && state >= ReadyState::HaveMetadata {
            self.events.push_back(MediaEvent::LoadedMetadata);
        }
        if previous < ReadyState::HaveCurrentData && state >= ReadyState::HaveCurrentData {
            self.events.push_back(MediaEvent::LoadedData);
        }
        if previous < ReadyState::HaveFutureData && state >= ReadyState::HaveFutureData {
            self.events.push_back(MediaEvent::CanPlay);
            if !self.paused {
                self.events.push_back(MediaEvent::Playing);
            }
        }
        if previous < ReadyState::HaveEnoughData && state >= ReadyState::HaveEnoughData {
            self.events.push_back(MediaEvent::CanPlayThrough);
        }
    }

    /// Simulate a failed fetch (network error, blocked cross-origin request).
    pub fn fail_source(&mut self, code: MediaErrorCode, message: &str) {
        self.error = Some(MediaError::new(code, message));
        self.network_state = NetworkState::NoSource;
        self.ready_state = ReadyState::HaveNothing;
        self.paused = true;
        self.events.push_back(MediaEvent::Error);
    }

    /// Advance playback by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || self.ready_state < ReadyState::HaveFutureData {
            return;
        }
        let mut next = self.current_time + dt * self.playback_rate;
        if self.duration.is_finite() && next >= self.duration {
            next = self.duration;
            self.ended = true;
            self.paused = true;
        }
        self.current_time = next;
        self.events.push_back(MediaEvent::TimeUpdate);
        if self.ended {
            self.events.push_back(MediaEvent::Pause);
            self.events.push_back(MediaEvent::Ended);
        }
    }

    /// Number of `play()` calls that actually started playback.
    pub fn play_calls(&self) -> usize {
        self.play_calls
    }

    fn seek_bounds(&self) -> (f64, f64) {
        match (self.seekable.first_start(), self.seekable.last_end()) {
            (Some(start), Some(end)) => (start, end),
            _ if self.duration.is_finite() => (0.0, self.duration),
            _ => (0.0, f64::MAX),
        }
    }
}

impl Default for HtmlMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for HtmlMediaElement {
    fn src(&self) -> &str {
        &self.src
    }

    fn error(&self) -> Option<&MediaError> {
        self.error.as_ref()
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn network_state(&self) -> NetworkState {
        self.network_state
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) -> Result<(), MediaError> {
        if !time.is_finite() {
            return Err(MediaError::new(
                MediaErrorCode::InvalidState,
                format!("non-finite seek target {time}"),
            ));
        }
        if self.src.is_empty() {
            return Err(MediaError::new(MediaErrorCode::InvalidState, "no source"));
        }
        if self.reject_seeks {
            return Err(MediaError::new(MediaErrorCode::InvalidState, "seek rejected"));
        }
        let (start, end) = self.seek_bounds();
        self.seeking = true;
        self.events.push_back(MediaEvent::Seeking);
        self.current_time = time.clamp(start, end.max(start));
        self.ended = false;
        self.seeking = false;
        self.events.push_back(MediaEvent::TimeUpdate);
        self.events.push_back(MediaEvent::Seeked);
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.src.is_empty() {
            return Err(MediaError::new(MediaErrorCode::SrcNotSupported, "no source"));
        }
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if !self.autoplay_allowed {
            return Err(MediaError::new(
                MediaErrorCode::NotAllowed,
                "play() requires a user gesture",
            ));
        }
        if self.paused {
            self.paused = false;
            self.ended = false;
            self.play_calls += 1;
            self.events.push_back(MediaEvent::Play);
            if self.ready_state >= ReadyState::HaveFutureData {
                self.events.push_back(MediaEvent::Playing);
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
        }
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            self.events.push_back(MediaEvent::VolumeChange);
        }
    }

    fn buffered(&self) -> &TimeRanges {
        &self.buffered
    }

    fn seekable(&self) -> &TimeRanges {
        &self.seekable
    }

    fn load(&mut self) {
        if self.src.is_empty() {
            self.network_state = NetworkState::Empty;
            return;
        }
        self.network_state = NetworkState::Loading;
        self.ready_state = ReadyState::HaveNothing;
        self.current_time = 0.0;
        self.paused = true;
        self.ended = false;
        self.events.push_back(MediaEvent::LoadStart);
    }

    fn clear_source(&mut self) {
        self.src.clear();
        self.network_state = NetworkState::Empty;
        self.ready_state = ReadyState::HaveNothing;
        self.paused = true;
        self.buffered.clear();
        self.seekable.clear();
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        self.events.drain(..).collect()
    }
}
