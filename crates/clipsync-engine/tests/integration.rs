//! Integration tests - Full playback contexts over simulated elements
//!
//! Drives contexts the way a host does: user actions, element buffering and
//! playback, then `advance` once per frame.

use std::collections::HashMap;
use std::time::Duration;

use clipsync_engine::media_model::{
    HtmlMediaElement, MediaElement, MediaErrorCode, ReadyState, SubtitleTimestamp, SubtitleTrack,
    TimeRanges,
};
use clipsync_engine::{
    EngineConfig, EngineError, Feed, PlaybackContext, PlayerMode, Rect, SubtitleLanguage,
    TrackGeometry, Transcript, TranscriptStore, VideoId, VideoMedia, VisibilityEntry,
};

type Ctx = PlaybackContext<HtmlMediaElement, HtmlMediaElement>;

// 16px padding each side leaves a 200px bar.
fn track() -> TrackGeometry {
    TrackGeometry::new(0.0, 232.0)
}

fn x_at(fraction: f32) -> f32 {
    16.0 + fraction * 200.0
}

fn context(id: VideoId, video: HtmlMediaElement, dub: Option<HtmlMediaElement>) -> Ctx {
    let media = VideoMedia::new(id, &video.src).with_dub_audio("dub.mp3");
    PlaybackContext::new(media, video, dub, PlayerMode::Feed, &EngineConfig::default())
}

/// Frame clock for one context
struct Frames {
    now: f64,
}

impl Frames {
    fn new() -> Self {
        Self { now: 0.0 }
    }

    fn step(&mut self, ctx: &mut Ctx) -> bool {
        self.now += 16.0;
        ctx.advance(self.now)
    }

    fn run_for(&mut self, ctx: &mut Ctx, ms: f64) {
        let end = self.now + ms;
        while self.now < end {
            self.step(ctx);
        }
    }
}

fn in_view(target: VideoId, ratio: f32) -> VisibilityEntry {
    VisibilityEntry {
        target,
        intersection_ratio: ratio,
        is_intersecting: ratio > 0.0,
        time: 0.0,
    }
}

fn dub_time(ctx: &Ctx) -> f64 {
    ctx.dub().map(|d| d.current_time()).unwrap_or(f64::NAN)
}

fn dub_paused(ctx: &Ctx) -> bool {
    ctx.dub().map_or(true, |d| d.paused())
}

// ============================================================================
// MUTE / DUB
// ============================================================================

#[test]
fn test_mutual_exclusion_holds_across_actions() {
    let mut ctx = context(
        1,
        HtmlMediaElement::loaded("clip.mp4", 60.0),
        Some(HtmlMediaElement::loaded("dub.mp3", 60.0)),
    );
    let mut frames = Frames::new();

    for step in 0..10 {
        match step {
            0 | 7 | 8 => ctx.toggle_play(),
            1 | 4 | 6 | 9 => {
                ctx.toggle_dubbing();
            }
            2 | 5 => {
                ctx.toggle_mute();
            }
            3 => ctx.on_click_seek(x_at(0.5), track()),
            _ => unreachable!(),
        }
        frames.run_for(&mut ctx, 160.0);

        let snapshot = ctx.snapshot();
        if snapshot.is_dubbing {
            assert!(ctx.video().muted(), "video audible while dubbing (step {step})");
        } else {
            assert!(dub_paused(&ctx), "dub playing while not dubbing (step {step})");
        }
    }
}

#[test]
fn test_toggle_re_anchors_dub() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 60.0);
    video.current_time = 7.5;
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::loaded("dub.mp3", 60.0)));
    let mut frames = Frames::new();
    frames.step(&mut ctx);

    ctx.toggle_dubbing();
    assert!((dub_time(&ctx) - 7.5).abs() < 1e-6);
    assert!(!dub_paused(&ctx));

    ctx.video_mut().advance(1.5);
    frames.step(&mut ctx);
    ctx.toggle_dubbing();
    assert!((dub_time(&ctx) - ctx.video().current_time()).abs() < 1e-6);
    assert!(dub_paused(&ctx));
    assert!(!ctx.video().muted());
}

#[test]
fn test_unready_dub_keeps_one_listener() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 60.0);
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::from_url("dub.mp3")));
    let mut frames = Frames::new();

    for _ in 0..10 {
        ctx.toggle_dubbing();
        frames.step(&mut ctx);
        assert!(ctx.mute_dub().pending_listener_count() <= 1);
    }
    assert!(!ctx.snapshot().is_dubbing);
    assert_eq!(ctx.mute_dub().pending_listener_count(), 0);

    ctx.toggle_dubbing();
    ctx.toggle_play();
    ctx.toggle_play();
    frames.step(&mut ctx);
    assert_eq!(ctx.mute_dub().pending_listener_count(), 1);
}

#[test]
fn test_dub_plays_once_ready() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 60.0);
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::from_url("dub.mp3")));
    let mut frames = Frames::new();

    ctx.toggle_dubbing();
    frames.step(&mut ctx);
    assert!(dub_paused(&ctx));

    ctx.video_mut().advance(2.0);
    if let Some(dub) = ctx.dub_mut() {
        dub.set_duration(60.0);
        dub.set_ready_state(ReadyState::HaveEnoughData);
    }
    frames.step(&mut ctx);

    assert!(!dub_paused(&ctx));
    assert!((dub_time(&ctx) - ctx.video().current_time()).abs() < 1e-6);
}

#[test]
fn test_broken_dub_source_degrades_silently() {
    let mut ctx = context(
        1,
        HtmlMediaElement::loaded("clip.mp4", 60.0),
        Some(HtmlMediaElement::from_url("https://cdn.example/dub.mp3")),
    );
    let mut frames = Frames::new();
    ctx.toggle_play();
    if let Some(dub) = ctx.dub_mut() {
        dub.fail_source(MediaErrorCode::Network, "blocked by cross-origin policy");
    }
    frames.step(&mut ctx);

    ctx.toggle_dubbing();
    frames.step(&mut ctx);
    assert!(ctx.snapshot().is_dubbing);
    assert!(ctx.video().muted());
    assert!(dub_paused(&ctx));
    assert!(!ctx.video().paused());
    assert_eq!(ctx.mute_dub().pending_listener_count(), 0);

    ctx.toggle_dubbing();
    frames.step(&mut ctx);
    assert!(!ctx.video().muted());
}

// ============================================================================
// SEEK / PROGRESS
// ============================================================================

#[test]
fn test_click_seek_progress_from_metadata() {
    let mut ctx = context(1, HtmlMediaElement::loaded("clip.mp4", 100.0), None);
    ctx.on_click_seek(x_at(0.3), track());

    assert!((ctx.snapshot().progress_percent - 30.0).abs() < 1e-3);
    assert!((ctx.video().current_time() - 30.0).abs() < 1e-3);
    assert!((ctx.time_reference().get() - 30.0).abs() < 1e-3);
}

#[test]
fn test_click_seek_progress_from_seekable_range() {
    let mut video = HtmlMediaElement::loaded("live.m3u8", 100.0);
    video.set_duration(f64::INFINITY);
    video.set_seekable(TimeRanges::single(0.0, 48.0));
    let mut ctx = context(1, video, None);
    let mut frames = Frames::new();

    ctx.on_click_seek(x_at(0.3), track());
    assert!((ctx.snapshot().progress_percent - 30.0).abs() < 1e-3);
    assert!((ctx.video().current_time() - 14.4).abs() < 1e-3);

    frames.step(&mut ctx);
    assert!((ctx.snapshot().progress_percent - 30.0).abs() < 1e-3);
}

#[test]
fn test_click_seek_resumes_after_grace_delay() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 100.0);
    video.play().unwrap();
    let mut ctx = context(1, video, None);
    let mut frames = Frames::new();
    frames.step(&mut ctx);

    ctx.on_click_seek(x_at(0.5), track());
    assert!(ctx.video().paused());
    frames.step(&mut ctx);
    assert!(ctx.video().paused());

    frames.run_for(&mut ctx, 120.0);
    assert!(!ctx.video().paused());
    assert!((ctx.video().current_time() - 50.0).abs() < 1e-3);
}

#[test]
fn test_seek_waits_for_dub_readiness_before_resuming() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 100.0);
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::from_url("dub.mp3")));
    let mut frames = Frames::new();
    ctx.toggle_dubbing();
    frames.step(&mut ctx);

    ctx.on_click_seek(x_at(0.5), track());
    frames.run_for(&mut ctx, 300.0);
    assert!(ctx.video().paused(), "resumed before the dub track was ready");

    if let Some(dub) = ctx.dub_mut() {
        dub.set_duration(100.0);
        dub.set_ready_state(ReadyState::HaveEnoughData);
    }
    frames.run_for(&mut ctx, 200.0);

    assert!(!ctx.video().paused());
    assert!(!dub_paused(&ctx));
    assert!((dub_time(&ctx) - ctx.video().current_time()).abs() < 1e-6);
}

#[test]
fn test_rejected_seek_stays_paused_at_last_position() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 100.0);
    video.current_time = 20.0;
    video.play().unwrap();
    video.reject_seeks = true;
    let mut ctx = context(1, video, None);
    let mut frames = Frames::new();

    ctx.on_click_seek(x_at(0.8), track());
    assert!((ctx.snapshot().progress_percent - 20.0).abs() < 1e-9);
    frames.run_for(&mut ctx, 200.0);

    assert_eq!(ctx.video().current_time(), 20.0);
    assert!(ctx.video().paused());
    assert!((ctx.time_reference().get() - 20.0).abs() < 1e-9);
    assert!((ctx.snapshot().progress_percent - 20.0).abs() < 1e-9);
}

#[test]
fn test_dubbing_off_releases_resume_waiting_on_dub() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 100.0);
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::from_url("dub.mp3")));
    let mut frames = Frames::new();
    ctx.toggle_dubbing();
    frames.step(&mut ctx);

    ctx.on_click_seek(x_at(0.5), track());
    frames.step(&mut ctx);
    assert!(ctx.video().paused());

    ctx.toggle_dubbing();
    frames.run_for(&mut ctx, 200.0);

    assert!(!ctx.snapshot().is_dubbing);
    assert!(!ctx.video().paused(), "resume lost when dubbing was switched off");
    assert!(!ctx.video().muted());
    assert!(dub_paused(&ctx));
    assert!((ctx.video().current_time() - 50.0).abs() < 1e-3);
}

#[test]
fn test_scrub_during_dubbing() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 100.0);
    video.current_time = 10.0;
    video.play().unwrap();
    let mut ctx = context(1, video, Some(HtmlMediaElement::loaded("dub.mp3", 100.0)));
    let mut frames = Frames::new();
    ctx.toggle_dubbing();
    frames.step(&mut ctx);
    assert!(!dub_paused(&ctx));

    ctx.on_scrub_start(x_at(0.1), track());
    frames.step(&mut ctx);
    ctx.on_scrub_move(x_at(0.35), track());
    frames.step(&mut ctx);
    ctx.on_scrub_move(x_at(0.6), track());
    frames.run_for(&mut ctx, 200.0);

    // Still dragging: both parked at the new position.
    assert!(ctx.is_dragging());
    assert!(ctx.video().paused());
    assert!(dub_paused(&ctx));
    assert!((ctx.video().current_time() - 60.0).abs() < 1e-3);
    assert!((dub_time(&ctx) - 60.0).abs() < 1e-3);

    ctx.on_scrub_end();
    frames.run_for(&mut ctx, 200.0);
    assert!(!ctx.video().paused());
    assert!(!dub_paused(&ctx));
    assert!((dub_time(&ctx) - ctx.video().current_time()).abs() < 1e-6);
    assert!((ctx.snapshot().progress_percent - 60.0).abs() < 1e-3);
}

#[test]
fn test_release_outside_track_ends_drag() {
    let mut ctx = context(1, HtmlMediaElement::loaded("clip.mp4", 100.0), None);
    ctx.on_scrub_start(x_at(0.2), track());
    assert!(ctx.is_dragging());

    ctx.on_global_pointer_release();
    assert!(!ctx.is_dragging());

    ctx.on_scrub_move(x_at(0.9), track());
    assert!((ctx.video().current_time() - 20.0).abs() < 1e-3);
}

// ============================================================================
// SUBTITLES
// ============================================================================

#[test]
fn test_subtitle_selection_by_time() {
    let mut ctx = context(1, HtmlMediaElement::loaded("clip.mp4", 10.0), None);
    let mut frames = Frames::new();
    ctx.select_subtitle_language(SubtitleLanguage::En);
    assert!(ctx.needs_transcript());
    ctx.provide_transcript(SubtitleTrack::new(vec![
        SubtitleTimestamp::new(0.0, 2.0, "a", "a-vi"),
        SubtitleTimestamp::new(2.0, 4.0, "b", "b-vi"),
    ]));

    for (time, expected) in [(1.5, Some("a")), (2.5, Some("b")), (5.0, None)] {
        ctx.video_mut().set_current_time(time).unwrap();
        frames.step(&mut ctx);
        assert_eq!(ctx.subtitle_text(), expected, "at {time}s");
    }

    ctx.select_subtitle_language(SubtitleLanguage::Vi);
    ctx.video_mut().set_current_time(1.0).unwrap();
    frames.step(&mut ctx);
    assert_eq!(ctx.subtitle_text(), Some("a-vi"));
}

#[test]
fn test_subtitle_track_from_store() {
    let mut ctx = context(9, HtmlMediaElement::loaded("clip.mp4", 10.0), None);
    let mut frames = Frames::new();
    let mut store = TranscriptStore::new(
        |id: VideoId| -> Result<Transcript, EngineError> {
            assert_eq!(id, 9);
            Transcript::from_json(r#"{ "timestamps": [{ "start": 0, "end": 3, "text": "hi", "textVi": "chào" }] }"#)
        },
        Duration::from_secs(300),
    );

    ctx.select_subtitle_language(SubtitleLanguage::Vi);
    if ctx.needs_transcript() {
        ctx.provide_transcript(store.get(ctx.id()));
    }
    ctx.video_mut().set_current_time(1.0).unwrap();
    assert!(frames.step(&mut ctx));
    assert_eq!(ctx.subtitle_text(), Some("chào"));
}

// ============================================================================
// AUTOPLAY
// ============================================================================

#[test]
fn test_re_entry_without_leaving_is_idempotent() {
    let mut ctx = context(1, HtmlMediaElement::loaded("clip.mp4", 30.0), None);
    let mut observer = clipsync_engine::VisibilityObserver::with_threshold(0.6);
    ctx.subscribe_visibility(&mut observer);

    assert_eq!(ctx.on_visibility(&in_view(1, 0.9)), Some((1, true)));
    ctx.toggle_mute();
    assert_eq!(ctx.on_visibility(&in_view(1, 1.0)), None);

    assert_eq!(ctx.video().play_calls(), 1);
    assert!(ctx.video().muted());
}

#[test]
fn test_feed_autoplay_scenario() {
    let config = EngineConfig::default();
    let mut feed: Feed<HtmlMediaElement, HtmlMediaElement> = Feed::new(&config);
    for id in [1, 2] {
        let media = VideoMedia::new(id, &format!("{id}.mp4"));
        let video = HtmlMediaElement::loaded(&media.video_url, 30.0);
        feed.push(PlaybackContext::new(media, video, None, PlayerMode::Feed, &config));
    }
    let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
    let layout = |offset: f32| -> HashMap<VideoId, Rect> {
        HashMap::from([
            (1, Rect::new(0.0, -offset, 400.0, 800.0)),
            (2, Rect::new(0.0, 800.0 - offset, 400.0, 800.0)),
        ])
    };

    // A enters view: plays, unmuted.
    feed.process(viewport, &layout(0.0), 0.0);
    let a = feed.get_mut(1).unwrap();
    assert!(!a.video().paused());
    assert!(!a.video().muted());
    a.video_mut().advance(3.0);
    a.toggle_mute();
    feed.advance(16.0);

    // A leaves view: paused, position kept.
    feed.process(viewport, &layout(700.0), 32.0);
    let a = feed.get(1).unwrap();
    assert!(a.video().paused());
    assert_eq!(a.video().current_time(), 3.0);
    assert_eq!(feed.current_video_id(), Some(2));

    // A re-enters: plays again with the mute choice intact.
    feed.process(viewport, &layout(0.0), 48.0);
    let a = feed.get(1).unwrap();
    assert!(!a.video().paused());
    assert!(a.video().muted());
    assert_eq!(a.video().current_time(), 3.0);
    assert!(feed.get(2).unwrap().video().paused());
}

#[test]
fn test_first_reveal_keeps_video_silent_while_dubbing() {
    let mut ctx = context(
        1,
        HtmlMediaElement::loaded("clip.mp4", 30.0),
        Some(HtmlMediaElement::loaded("dub.mp3", 30.0)),
    );
    let mut observer = clipsync_engine::VisibilityObserver::with_threshold(0.6);
    ctx.subscribe_visibility(&mut observer);
    ctx.toggle_dubbing();

    ctx.on_visibility(&in_view(1, 1.0));
    assert!(ctx.video().muted());
    assert!(!ctx.video().paused());
    assert!(!dub_paused(&ctx));

    ctx.on_visibility(&in_view(1, 0.1));
    assert!(ctx.video().paused());
    assert!(dub_paused(&ctx));
}

#[test]
fn test_refused_autoplay_retries_on_re_entry() {
    let mut video = HtmlMediaElement::loaded("clip.mp4", 30.0);
    video.autoplay_allowed = false;
    let mut ctx = context(1, video, None);
    let mut observer = clipsync_engine::VisibilityObserver::with_threshold(0.6);
    ctx.subscribe_visibility(&mut observer);

    ctx.on_visibility(&in_view(1, 1.0));
    assert!(ctx.video().paused());

    ctx.on_visibility(&in_view(1, 0.0));
    ctx.video_mut().autoplay_allowed = true;
    ctx.on_visibility(&in_view(1, 1.0));
    assert!(!ctx.video().paused());
}
