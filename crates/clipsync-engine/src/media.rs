//! Video Media Records
//!
//! The canonical playable-unit record, and the boundary adapter that turns
//! data-provider records (which arrive in more than one casing convention)
//! into it.

use serde_json::Value;
use url::Url;

use crate::EngineError;

/// Video identifier as issued by the data provider
pub type VideoId = u64;

/// A playable unit. Immutable for the lifetime of a playback context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMedia {
    pub id: VideoId,
    /// Progressive or streaming URL of the primary video
    pub video_url: String,
    /// Secondary dubbed-audio track
    pub dub_audio_url: Option<String>,
    pub poster_url: Option<String>,
}

// Streaming URL wins over the progressive one.
const VIDEO_URL_KEYS: &[&str] = &["hlsUrl", "hls_url", "videoUrl", "video_url", "url"];
const DUB_URL_KEYS: &[&str] = &["audioVi", "audio_vi", "dubAudioUrl", "dub_audio_url"];
const POSTER_URL_KEYS: &[&str] = &["thumbnailUrl", "thumbnail_url", "thumbUrl", "thumb_url"];

impl VideoMedia {
    pub fn new(id: VideoId, video_url: &str) -> Self {
        Self {
            id,
            video_url: video_url.to_string(),
            dub_audio_url: None,
            poster_url: None,
        }
    }

    pub fn with_dub_audio(mut self, url: &str) -> Self {
        self.dub_audio_url = Some(url.to_string());
        self
    }

    pub fn with_poster(mut self, url: &str) -> Self {
        self.poster_url = Some(url.to_string());
        self
    }

    pub fn has_dub_audio(&self) -> bool {
        self.dub_audio_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Normalize a provider record.
    ///
    /// Relative URLs are resolved against `base`; absolute `http(s)` and
    /// `blob:` URLs pass through untouched.
    pub fn from_json(record: &Value, base: &Url) -> Result<Self, EngineError> {
        let id = parse_id(record.get("id"))
            .ok_or_else(|| EngineError::Normalize("video record has no usable id".into()))?;

        let video_url = first_string(record, VIDEO_URL_KEYS)
            .ok_or_else(|| EngineError::Normalize(format!("video {id} has no media url")))?;

        let resolve = |raw: &str| resolve_media_url(raw, base);
        Ok(Self {
            id,
            video_url: resolve(video_url)?,
            dub_audio_url: first_string(record, DUB_URL_KEYS).map(resolve).transpose()?,
            poster_url: first_string(record, POSTER_URL_KEYS).map(resolve).transpose()?,
        })
    }
}

fn parse_id(value: Option<&Value>) -> Option<VideoId> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first_string<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| record.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Resolve a media URL the way the client's media helper does.
pub fn resolve_media_url(raw: &str, base: &Url) -> Result<String, EngineError> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with("blob:") {
        return Ok(raw.to_string());
    }
    base.join(raw)
        .map(String::from)
        .map_err(|e| EngineError::Normalize(format!("bad media url {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("http://localhost:8000").unwrap()
    }

    #[test]
    fn test_camel_case_record() {
        let record = json!({
            "id": 42,
            "videoUrl": "/media/42.mp4",
            "audioVi": "https://cdn.example/42-vi.mp3",
            "thumbnailUrl": "thumbs/42.jpg",
        });
        let media = VideoMedia::from_json(&record, &base()).unwrap();
        assert_eq!(media.id, 42);
        assert_eq!(media.video_url, "http://localhost:8000/media/42.mp4");
        assert_eq!(media.dub_audio_url.as_deref(), Some("https://cdn.example/42-vi.mp3"));
        assert_eq!(media.poster_url.as_deref(), Some("http://localhost:8000/thumbs/42.jpg"));
    }

    #[test]
    fn test_snake_case_record_prefers_stream() {
        let record = json!({
            "id": "7",
            "url": "/media/7.mp4",
            "hls_url": "/media/7/index.m3u8",
            "audio_vi": "",
        });
        let media = VideoMedia::from_json(&record, &base()).unwrap();
        assert_eq!(media.id, 7);
        assert_eq!(media.video_url, "http://localhost:8000/media/7/index.m3u8");
        assert!(!media.has_dub_audio());
    }

    #[test]
    fn test_blob_urls_pass_through() {
        let record = json!({ "id": 1, "video_url": "blob:http://localhost/abc" });
        let media = VideoMedia::from_json(&record, &base()).unwrap();
        assert_eq!(media.video_url, "blob:http://localhost/abc");
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let record = json!({ "id": 9, "title": "no media" });
        assert!(matches!(
            VideoMedia::from_json(&record, &base()),
            Err(EngineError::Normalize(_))
        ));
        assert!(VideoMedia::from_json(&json!({ "url": "/a.mp4" }), &base()).is_err());
    }
}
