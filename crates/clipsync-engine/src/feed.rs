//! Feed
//!
//! A scrolling list of surfaces sharing one visibility observer.

use std::collections::HashMap;

use clipsync_media::{HtmlMediaElement, MediaElement};
use serde_json::Value;
use url::Url;

use crate::config::EngineConfig;
use crate::context::{PlaybackContext, PlayerMode};
use crate::media::{VideoId, VideoMedia};
use crate::transcript::{TranscriptProvider, TranscriptStore};
use crate::visibility::{Rect, VisibilityObserver};
use crate::EngineError;

/// Feed of playback contexts
#[derive(Debug)]
pub struct Feed<V: MediaElement, A: MediaElement> {
    config: EngineConfig,
    observer: VisibilityObserver,
    contexts: Vec<PlaybackContext<V, A>>,
    current: Option<VideoId>,
}

impl<V: MediaElement, A: MediaElement> Feed<V, A> {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            observer: VisibilityObserver::with_threshold(config.visibility_threshold),
            contexts: Vec::new(),
            current: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn observer(&self) -> &VisibilityObserver {
        &self.observer
    }

    /// The item most recently reported in view; the first item until then.
    pub fn current_video_id(&self) -> Option<VideoId> {
        self.current
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaybackContext<V, A>> {
        self.contexts.iter()
    }

    pub fn get(&self, id: VideoId) -> Option<&PlaybackContext<V, A>> {
        self.contexts.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: VideoId) -> Option<&mut PlaybackContext<V, A>> {
        self.contexts.iter_mut().find(|c| c.id() == id)
    }

    /// Append an item (infinite scroll). Duplicate ids are ignored.
    pub fn push(&mut self, mut ctx: PlaybackContext<V, A>) -> bool {
        if self.get(ctx.id()).is_some() {
            tracing::debug!(video_id = ctx.id(), "duplicate feed item ignored");
            return false;
        }
        ctx.subscribe_visibility(&mut self.observer);
        if self.current.is_none() {
            self.current = Some(ctx.id());
        }
        self.contexts.push(ctx);
        true
    }

    /// Tear down and drop an item.
    pub fn remove(&mut self, id: VideoId) -> bool {
        let Some(pos) = self.contexts.iter().position(|c| c.id() == id) else {
            return false;
        };
        let mut ctx = self.contexts.remove(pos);
        ctx.teardown(Some(&mut self.observer));
        if self.current == Some(id) {
            self.current = self.contexts.first().map(PlaybackContext::id);
        }
        true
    }

    /// Evaluate visibility for the current layout and dispatch the changes.
    ///
    /// Surfaces leaving view are handled before surfaces entering it.
    /// Returns the `(video id, in view)` changes in dispatch order.
    pub fn process(
        &mut self,
        viewport: Rect,
        surfaces: &HashMap<VideoId, Rect>,
        now_ms: f64,
    ) -> Vec<(VideoId, bool)> {
        self.observer.check_intersections(viewport, surfaces, now_ms);
        let threshold = self.config.visibility_threshold;
        let mut entries = self.observer.take_entries();
        entries.sort_by_key(|e| e.is_in_view(threshold));

        let mut changes = Vec::new();
        for entry in &entries {
            let Some(ctx) = self.contexts.iter_mut().find(|c| c.id() == entry.target) else {
                continue;
            };
            if let Some((id, in_view)) = ctx.on_visibility(entry) {
                if in_view {
                    self.current = Some(id);
                }
                changes.push((id, in_view));
            }
        }
        changes
    }

    /// Run one host frame on every item. Returns the ids whose visible
    /// subtitle changed.
    pub fn advance(&mut self, now_ms: f64) -> Vec<VideoId> {
        self.contexts
            .iter_mut()
            .filter_map(|ctx| ctx.advance(now_ms).then(|| ctx.id()))
            .collect()
    }

    /// Hand timestamps to every item that selected a language but has none.
    pub fn load_transcripts<P: TranscriptProvider>(&mut self, store: &mut TranscriptStore<P>) {
        for ctx in self.contexts.iter_mut().filter(|c| c.needs_transcript()) {
            let track = store.get(ctx.id());
            ctx.provide_transcript(track);
        }
    }

    pub fn teardown_all(&mut self) {
        for ctx in &mut self.contexts {
            ctx.teardown(Some(&mut self.observer));
        }
        self.contexts.clear();
        self.observer.disconnect();
        self.current = None;
        tracing::info!("feed torn down");
    }
}

impl Feed<HtmlMediaElement, HtmlMediaElement> {
    /// Normalize provider records and append them. Records that cannot be
    /// normalized are skipped. Returns the number appended.
    pub fn extend_from_records(&mut self, records: &[Value]) -> Result<usize, EngineError> {
        let base = Url::parse(&self.config.media_base_url)
            .map_err(|e| EngineError::Config(format!("media_base_url: {e}")))?;
        let mut added = 0;
        for record in records {
            match VideoMedia::from_json(record, &base) {
                Ok(media) => {
                    let ctx = PlaybackContext::from_media(media, PlayerMode::Feed, &self.config);
                    if self.push(ctx) {
                        added += 1;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "skipping feed record"),
            }
        }
        Ok(added)
    }
}
