//! Playback Snapshot
//!
//! The read-only state the presentation layer renders from.

use serde::{Deserialize, Serialize};

/// Subtitle language selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleLanguage {
    #[default]
    Off,
    En,
    Vi,
}

impl SubtitleLanguage {
    pub fn is_off(&self) -> bool {
        matches!(self, SubtitleLanguage::Off)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleLanguage::Off => "off",
            SubtitleLanguage::En => "en",
            SubtitleLanguage::Vi => "vi",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(SubtitleLanguage::Off),
            "en" => Some(SubtitleLanguage::En),
            "vi" => Some(SubtitleLanguage::Vi),
            _ => None,
        }
    }
}

/// Externally visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_muted: bool,
    pub is_dubbing: bool,
    pub subtitle_language: SubtitleLanguage,
    /// 0..=100, always derived from the primary video
    pub progress_percent: f64,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_muted: false,
            is_dubbing: false,
            subtitle_language: SubtitleLanguage::Off,
            progress_percent: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!(SubtitleLanguage::parse("vi"), Some(SubtitleLanguage::Vi));
        assert_eq!(SubtitleLanguage::parse("fr"), None);
        assert!(SubtitleLanguage::default().is_off());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = PlaybackSnapshot {
            is_dubbing: true,
            subtitle_language: SubtitleLanguage::En,
            progress_percent: 42.0,
            ..Default::default()
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["isDubbing"], true);
        assert_eq!(json["subtitleLanguage"], "en");
        assert_eq!(json["progressPercent"], 42.0);
    }
}
