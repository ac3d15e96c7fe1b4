//! Simulated feed session
//!
//! Scrolls a two-item feed, turns on subtitles and dubbing, and scrubs,
//! printing each surface's snapshot as it changes.
//!
//! Usage: clipsync-demo [config.json]

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use clipsync_engine::media_model::{HtmlMediaElement, MediaElement, ReadyState, TimeRanges};
use clipsync_engine::{
    EngineConfig, EngineError, Feed, Rect, SubtitleLanguage, TrackGeometry, Transcript,
    TranscriptStore, VideoId,
};
use serde_json::json;

const FRAME_MS: f64 = 16.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            EngineConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => EngineConfig::default(),
    };

    println!("clipsync engine v{}", clipsync_engine::VERSION);
    smol::block_on(run(config))
}

fn layout(ids: &[VideoId], offset: f32) -> HashMap<VideoId, Rect> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (*id, Rect::new(0.0, i as f32 * 800.0 - offset, 400.0, 800.0)))
        .collect()
}

fn buffer(element: &mut HtmlMediaElement, duration: f64, state: ReadyState) {
    element.set_duration(duration);
    element.set_buffered(TimeRanges::single(0.0, duration));
    element.set_seekable(TimeRanges::single(0.0, duration));
    element.set_ready_state(state);
}

async fn run(config: EngineConfig) -> Result<()> {
    let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
    let track = TrackGeometry::new(0.0, 400.0);

    let mut feed: Feed<HtmlMediaElement, HtmlMediaElement> = Feed::new(&config);
    let records = vec![
        json!({ "id": 1, "videoUrl": "/media/1.mp4", "thumbnailUrl": "/thumbs/1.jpg" }),
        json!({ "id": 2, "hls_url": "/media/2/index.m3u8", "audio_vi": "/media/2-vi.mp3" }),
    ];
    let added = feed.extend_from_records(&records)?;
    println!("feed loaded: {added} videos");

    let ids: Vec<VideoId> = feed.iter().map(|c| c.id()).collect();
    for id in &ids {
        if let Some(ctx) = feed.get_mut(*id) {
            buffer(ctx.video_mut(), 20.0, ReadyState::HaveEnoughData);
        }
    }

    let mut store = TranscriptStore::from_config(
        |id: VideoId| -> Result<Transcript, EngineError> {
            Transcript::from_json(&format!(
                r#"{{ "timestamps": [
                    {{ "start": 0.0, "end": 1.0, "text": "Video {id}", "text_vi": "Video số {id}" }},
                    {{ "start": 1.0, "end": 3.0, "text": "Hello there", "text_vi": "Xin chào" }}
                ] }}"#
            ))
        },
        &config,
    );

    let mut now = 0.0;
    let mut offset = 0.0;
    for frame in 0..360u32 {
        match frame {
            0 => {
                if let Some(ctx) = feed.get_mut(1) {
                    ctx.select_subtitle_language(SubtitleLanguage::En);
                }
                feed.load_transcripts(&mut store);
            }
            120 => offset = 800.0,
            140 => {
                if let Some(ctx) = feed.get_mut(2) {
                    ctx.toggle_dubbing();
                    ctx.select_subtitle_language(SubtitleLanguage::Vi);
                }
                feed.load_transcripts(&mut store);
            }
            180 => {
                if let Some(dub) = feed.get_mut(2).and_then(|c| c.dub_mut()) {
                    buffer(dub, 20.0, ReadyState::HaveEnoughData);
                }
            }
            240 => {
                if let Some(ctx) = feed.get_mut(2) {
                    ctx.on_scrub_start(16.0 + 0.25 * 368.0, track);
                    ctx.on_scrub_move(16.0 + 0.75 * 368.0, track);
                    ctx.on_global_pointer_release();
                }
            }
            _ => {}
        }

        for (id, in_view) in feed.process(viewport, &layout(&ids, offset), now) {
            println!("[{now:>6.0}ms] video {id} {}", if in_view { "in view" } else { "out of view" });
        }

        for id in &ids {
            if let Some(ctx) = feed.get_mut(*id) {
                ctx.video_mut().advance(FRAME_MS / 1000.0);
                if let Some(dub) = ctx.dub_mut() {
                    dub.advance(FRAME_MS / 1000.0);
                }
            }
        }

        for id in feed.advance(now) {
            if let Some(ctx) = feed.get(id) {
                println!(
                    "[{now:>6.0}ms] video {id} subtitle: {}",
                    ctx.subtitle_text().unwrap_or("")
                );
            }
        }

        if frame % 60 == 59 {
            for ctx in feed.iter() {
                let dub_time = ctx.dub().filter(|d| d.has_source()).map(|d| d.current_time());
                println!(
                    "[{now:>6.0}ms] video {} {} video={:.2}s dub={:?}",
                    ctx.id(),
                    serde_json::to_string(&ctx.snapshot())?,
                    ctx.video().current_time(),
                    dub_time
                );
            }
        }

        now += FRAME_MS;
        smol::Timer::after(Duration::from_millis(FRAME_MS as u64)).await;
    }

    feed.teardown_all();
    Ok(())
}
