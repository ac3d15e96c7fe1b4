//! Visibility Observation
//!
//! Intersection-observer equivalent: reports when a video surface crosses
//! one of the configured visibility thresholds relative to the viewport.

use std::collections::HashMap;

use crate::media::VideoId;

/// Axis-aligned rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f32 {
        self.x
    }
    pub fn top(&self) -> f32 {
        self.y
    }
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Calculate intersection with another rect
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(Rect {
                x,
                y,
                width: right - x,
                height: bottom - y,
            })
        } else {
            None
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Fraction of `self` covered by `viewport`
    pub fn visible_ratio(&self, viewport: &Rect) -> f32 {
        if self.area() <= 0.0 {
            return 0.0;
        }
        self.intersect(viewport)
            .map(|i| i.area() / self.area())
            .unwrap_or(0.0)
    }
}

/// One visibility notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub target: VideoId,
    pub intersection_ratio: f32,
    pub is_intersecting: bool,
    pub time: f64,
}

impl VisibilityEntry {
    /// In view only when intersecting at or above `threshold`
    pub fn is_in_view(&self, threshold: f32) -> bool {
        self.is_intersecting && self.intersection_ratio >= threshold
    }
}

/// Visibility observer
///
/// Each observed target gets an initial entry on the first check, then one
/// entry per threshold crossing.
#[derive(Debug)]
pub struct VisibilityObserver {
    thresholds: Vec<f32>,
    observed: HashMap<VideoId, Option<f32>>, // last ratio
    pending_entries: Vec<VisibilityEntry>,
}

impl VisibilityObserver {
    pub fn new(thresholds: Vec<f32>) -> Self {
        Self {
            thresholds,
            observed: HashMap::new(),
            pending_entries: Vec::new(),
        }
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self::new(vec![threshold])
    }

    /// Start observing a surface. Observing an already observed target keeps
    /// its single subscription.
    pub fn observe(&mut self, target: VideoId) {
        self.observed.entry(target).or_insert(None);
    }

    /// Stop observing
    pub fn unobserve(&mut self, target: VideoId) {
        self.observed.remove(&target);
        self.pending_entries.retain(|e| e.target != target);
    }

    pub fn is_observing(&self, target: VideoId) -> bool {
        self.observed.contains_key(&target)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Disconnect all
    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.pending_entries.clear();
    }

    /// Check intersections
    pub fn check_intersections(
        &mut self,
        viewport: Rect,
        surface_rects: &HashMap<VideoId, Rect>,
        time: f64,
    ) {
        for (target, last_ratio) in &mut self.observed {
            let Some(rect) = surface_rects.get(target) else {
                continue;
            };
            let ratio = rect.visible_ratio(&viewport);

            // Check if crossed threshold
            let should_notify = match *last_ratio {
                Some(lr) => self
                    .thresholds
                    .iter()
                    .any(|&t| (lr < t && ratio >= t) || (lr >= t && ratio < t)),
                None => true,
            };

            if should_notify {
                *last_ratio = Some(ratio);
                self.pending_entries.push(VisibilityEntry {
                    target: *target,
                    intersection_ratio: ratio,
                    is_intersecting: ratio > 0.0,
                    time,
                });
            }
        }
    }

    /// Take pending entries
    pub fn take_entries(&mut self) -> Vec<VisibilityEntry> {
        std::mem::take(&mut self.pending_entries)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_entries.is_empty()
    }
}
