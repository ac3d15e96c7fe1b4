//! Subtitle Tracks
//!
//! Timed bilingual text spans and the track that looks them up by time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One timed subtitle span, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTimestamp {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, alias = "textVi")]
    pub text_vi: String,
}

impl SubtitleTimestamp {
    pub fn new(start: f64, end: f64, text: &str, text_vi: &str) -> Self {
        Self {
            start,
            end,
            text: text.to_string(),
            text_vi: text_vi.to_string(),
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// An immutable list of spans ordered by `start`.
///
/// Cloning is cheap; clones share the same spans, so a span index is a stable
/// identity for as long as the track is alive.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    cues: Arc<[SubtitleTimestamp]>,
}

impl SubtitleTrack {
    pub fn new(mut cues: Vec<SubtitleTimestamp>) -> Self {
        cues.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { cues: cues.into() }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SubtitleTimestamp> {
        self.cues.get(index)
    }

    pub fn cues(&self) -> &[SubtitleTimestamp] {
        &self.cues
    }

    /// Index of the first span containing `time`.
    pub fn find_active(&self, time: f64) -> Option<usize> {
        self.cues.iter().position(|c| c.contains(time))
    }

    /// Whether two handles share the same underlying spans.
    pub fn same_as(&self, other: &SubtitleTrack) -> bool {
        Arc::ptr_eq(&self.cues, &other.cues)
    }
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<SubtitleTimestamp>> for SubtitleTrack {
    fn from(cues: Vec<SubtitleTimestamp>) -> Self {
        Self::new(cues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> SubtitleTrack {
        SubtitleTrack::new(vec![
            SubtitleTimestamp::new(2.0, 4.0, "b", "bê"),
            SubtitleTimestamp::new(0.0, 2.0, "a", "a"),
        ])
    }

    #[test]
    fn test_track_is_sorted_by_start() {
        let track = track();
        assert_eq!(track.get(0).map(|c| c.text.as_str()), Some("a"));
        assert_eq!(track.get(1).map(|c| c.text.as_str()), Some("b"));
    }

    #[test]
    fn test_find_active() {
        let track = track();
        assert_eq!(track.find_active(1.5), Some(0));
        assert_eq!(track.find_active(2.5), Some(1));
        assert_eq!(track.find_active(5.0), None);
        // boundary belongs to the first matching span
        assert_eq!(track.find_active(2.0), Some(0));
    }

    #[test]
    fn test_deserialize_either_casing() {
        let snake: SubtitleTimestamp =
            serde_json::from_str(r#"{"start":0,"end":1,"text":"hi","text_vi":"chào"}"#).unwrap();
        let camel: SubtitleTimestamp =
            serde_json::from_str(r#"{"start":0,"end":1,"text":"hi","textVi":"chào"}"#).unwrap();
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_clones_share_identity() {
        let track = track();
        let clone = track.clone();
        assert!(track.same_as(&clone));
        assert!(!track.same_as(&self::track()));
    }
}
