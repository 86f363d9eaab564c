use std::collections::VecDeque;

use crate::overlay::model::{PenStyle, Point, Rgb};

pub const MAX_STROKES: usize = 128;
pub const MAX_POINTS_PER_STROKE: usize = 4096;
pub const MIN_POINT_DISTANCE: f64 = 1.0;
pub const STROKE_FADE_MS: u64 = 1550;
pub const STROKE_TAIL_MS: u64 = 760;
pub const STROKE_TAIL_ALPHA: f32 = 0.22;

/// Capacity and fade timing for a [`StrokeStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePolicy {
    pub max_strokes: usize,
    pub max_points: usize,
    pub fade_ms: u64,
    pub tail_ms: u64,
    pub tail_alpha: f32,
}

impl Default for StrokePolicy {
    fn default() -> Self {
        Self {
            max_strokes: MAX_STROKES,
            max_points: MAX_POINTS_PER_STROKE,
            fade_ms: STROKE_FADE_MS,
            tail_ms: STROKE_TAIL_MS,
            tail_alpha: STROKE_TAIL_ALPHA,
        }
    }
}

impl StrokePolicy {
    pub fn lifetime_ms(&self) -> u64 {
        self.fade_ms.saturating_add(self.tail_ms)
    }

    /// Opacity in `[0, 1]` of a finished stroke `age_ms` after its last point.
    pub fn fade_alpha(&self, age_ms: u64) -> f32 {
        if age_ms >= self.lifetime_ms() {
            return 0.0;
        }
        if age_ms <= self.fade_ms {
            if self.fade_ms == 0 {
                return self.tail_alpha;
            }
            let t = age_ms as f32 / self.fade_ms as f32;
            return 1.0 - (1.0 - self.tail_alpha) * smoothstep(t);
        }
        let tail_t = (age_ms - self.fade_ms) as f32 / self.tail_ms.max(1) as f32;
        self.tail_alpha * (1.0 - tail_t).max(0.0).powf(1.75)
    }
}

/// Quintic smoothstep `t³(6t² − 15t + 10)` on `[0, 1]`.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeState {
    Building,
    Frozen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Rgb,
    pub size: i32,
    pub last_updated_ms: u64,
    state: StrokeState,
    points: VecDeque<Point>,
}

impl Stroke {
    fn new(style: PenStyle, now_ms: u64) -> Self {
        Self {
            color: style.color,
            size: style.size,
            last_updated_ms: now_ms,
            state: StrokeState::Building,
            points: VecDeque::new(),
        }
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = Point> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lifecycle state. Only the store moves a stroke between states.
    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_building(&self) -> bool {
        self.state == StrokeState::Building
    }

    fn push(&mut self, point: Point, now_ms: u64, max_points: usize) -> bool {
        if let Some(last) = self.points.back() {
            if last.distance_to(point) < MIN_POINT_DISTANCE {
                return false;
            }
        }
        self.points.push_back(point);
        while self.points.len() > max_points.max(1) {
            self.points.pop_front();
        }
        self.last_updated_ms = now_ms;
        true
    }
}

/// Ordered strokes, oldest first. Only the last stroke may be building.
#[derive(Debug, Default)]
pub struct StrokeStore {
    strokes: VecDeque<Stroke>,
    policy: StrokePolicy,
}

impl StrokeStore {
    pub fn new(policy: StrokePolicy) -> Self {
        Self {
            strokes: VecDeque::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &StrokePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }

    pub fn building(&self) -> Option<&Stroke> {
        self.strokes.back().filter(|stroke| stroke.is_building())
    }

    pub fn is_building(&self) -> bool {
        self.building().is_some()
    }

    /// Starts a stroke with `style` if none is building, then offers `point` to it.
    /// Returns whether the point was kept.
    pub fn begin_if_needed(&mut self, point: Point, style: PenStyle, now_ms: u64) -> bool {
        if !self.is_building() {
            self.strokes.push_back(Stroke::new(style, now_ms));
            while self.strokes.len() > self.policy.max_strokes.max(1) {
                self.strokes.pop_front();
            }
            tracing::debug!(
                strokes = self.strokes.len(),
                size = style.size,
                "stroke started"
            );
        }
        let max_points = self.policy.max_points;
        match self.strokes.back_mut() {
            Some(stroke) => stroke.push(point, now_ms, max_points),
            None => false,
        }
    }

    /// Freezes the building stroke. Returns `true` if one was building.
    pub fn end(&mut self) -> bool {
        match self.strokes.back_mut() {
            Some(stroke) if stroke.is_building() => {
                stroke.state = StrokeState::Frozen;
                tracing::debug!(points = stroke.len(), "stroke frozen");
                true
            }
            _ => false,
        }
    }

    /// Ends any building stroke and removes the most recent one.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.end();
        self.strokes.pop_back()
    }

    pub fn clear(&mut self) -> usize {
        self.end();
        let removed = self.strokes.len();
        self.strokes.clear();
        removed
    }

    /// Opacity of `stroke` at `now_ms`; building strokes are always opaque.
    pub fn alpha_of(&self, stroke: &Stroke, now_ms: u64) -> f32 {
        if stroke.is_building() {
            return 1.0;
        }
        self.policy
            .fade_alpha(now_ms.saturating_sub(stroke.last_updated_ms))
    }

    /// Drops frozen strokes that have faded to nothing, either by outliving the
    /// fade or by dropping below one alpha step. Returns how many were evicted.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let policy = self.policy;
        let before = self.strokes.len();
        self.strokes.retain(|stroke| {
            if stroke.is_building() {
                return true;
            }
            let age = now_ms.saturating_sub(stroke.last_updated_ms);
            age < policy.lifetime_ms() && policy.fade_alpha(age) * 255.0 >= 0.5
        });
        let evicted = before - self.strokes.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.strokes.len(), "strokes faded out");
        }
        evicted
    }
}
