//! Media Events
//!
//! Event kinds fired by media elements and the one-shot listener slot used to
//! defer work until an element reaches a readiness level.

/// Events a media element fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    LoadStart,
    LoadedMetadata,
    LoadedData,
    CanPlay,
    CanPlayThrough,
    Play,
    Playing,
    Pause,
    Seeking,
    Seeked,
    TimeUpdate,
    Ended,
    VolumeChange,
    Error,
}

impl MediaEvent {
    /// DOM event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadStart => "loadstart",
            Self::LoadedMetadata => "loadedmetadata",
            Self::LoadedData => "loadeddata",
            Self::CanPlay => "canplay",
            Self::CanPlayThrough => "canplaythrough",
            Self::Play => "play",
            Self::Playing => "playing",
            Self::Pause => "pause",
            Self::Seeking => "seeking",
            Self::Seeked => "seeked",
            Self::TimeUpdate => "timeupdate",
            Self::Ended => "ended",
            Self::VolumeChange => "volumechange",
            Self::Error => "error",
        }
    }

    /// Parse a DOM event name
    pub fn from_name(name: &str) -> Option<Self> {
        let event = match name {
            "loadstart" => Self::LoadStart,
            "loadedmetadata" => Self::LoadedMetadata,
            "loadeddata" => Self::LoadedData,
            "canplay" => Self::CanPlay,
            "canplaythrough" => Self::CanPlayThrough,
            "play" => Self::Play,
            "playing" => Self::Playing,
            "pause" => Self::Pause,
            "seeking" => Self::Seeking,
            "seeked" => Self::Seeked,
            "timeupdate" => Self::TimeUpdate,
            "ended" => Self::Ended,
            "volumechange" => Self::VolumeChange,
            "error" => Self::Error,
            _ => return None,
        };
        Some(event)
    }
}

#[derive(Debug)]
struct Pending<A> {
    events: &'static [MediaEvent],
    action: A,
}

/// A listener registered with `{ once: true }` semantics.
///
/// The slot holds at most one pending action. Arming it again replaces the
/// previous action instead of stacking a second listener, and firing removes
/// the action before handing it back.
#[derive(Debug)]
pub struct OnceListener<A> {
    pending: Option<Pending<A>>,
}

impl<A> Default for OnceListener<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> OnceListener<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` to run on the first of `events`.
    ///
    /// Returns the action that was displaced, if any.
    pub fn arm(&mut self, events: &'static [MediaEvent], action: A) -> Option<A> {
        self.pending
            .replace(Pending { events, action })
            .map(|p| p.action)
    }

    /// Deliver an event; yields the action if this event triggers it.
    pub fn fire(&mut self, event: MediaEvent) -> Option<A> {
        let triggered = self
            .pending
            .as_ref()
            .is_some_and(|p| p.events.contains(&event));
        if triggered {
            self.pending.take().map(|p| p.action)
        } else {
            None
        }
    }

    /// Remove the pending action without running it.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|p| p.action)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of registered listeners (0 or 1).
    pub fn listener_count(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    pub fn peek(&self) -> Option<&A> {
        self.pending.as_ref().map(|p| &p.action)
    }
}
