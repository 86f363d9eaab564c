use std::f32::consts::TAU;

use crate::overlay::composite::{draw_cursor_glow, stroke_rect_border, CoverageMask};
use crate::overlay::error::OverlayResult;
use crate::overlay::model::{OverlayBounds, PenStyle, PointerState, Rgb};
use crate::overlay::strokes::{Stroke, StrokeStore};
use crate::overlay::surface::PixelSurface;

pub const BLINK_PERIOD_MS: u64 = 2200;
pub const BLINK_MIN_ALPHA: f32 = 0.35;
pub const BLINK_SWING: f32 = 0.45;
pub const BORDER_WIDTH_FACTOR: f32 = 1.08;
pub const RECORDING_BORDER_COLOR: Rgb = Rgb::new(255, 59, 48);

/// Recording-border opacity, oscillating in `[0.35, 0.80]` with a 2.2 s period.
pub fn blink_alpha(now_ms: u64) -> f32 {
    let phase = TAU * (now_ms % BLINK_PERIOD_MS) as f32 / BLINK_PERIOD_MS as f32;
    BLINK_MIN_ALPHA + 0.5 * (phase.sin() + 1.0) * BLINK_SWING
}

pub fn alpha_to_byte(alpha: f32) -> u8 {
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn border_width(border_px: i32, visual_scale: f32) -> i32 {
    ((border_px as f32) * BORDER_WIDTH_FACTOR * visual_scale)
        .round()
        .max(1.0) as i32
}

pub fn scaled_pen_size(pen_size: i32, visual_scale: f32) -> i32 {
    ((pen_size as f32) * visual_scale).round().max(1.0) as i32
}

pub fn stroke_radius(pen_size: i32, visual_scale: f32) -> i32 {
    ((pen_size as f32) * visual_scale / 2.0).round().max(1.0) as i32
}

/// `(outer, core)` cursor glow radii for a pen.
pub fn glow_radii(pen_size: i32, visual_scale: f32) -> (i32, i32) {
    let scaled = scaled_pen_size(pen_size, visual_scale);
    let outer = (scaled + 13).max(12);
    let core = ((scaled as f32) * 0.74).round().max(4.0) as i32;
    (outer, core)
}

/// Everything about the session a frame depends on, apart from the strokes.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub bounds: OverlayBounds,
    pub border_px: i32,
    pub recording: bool,
    pub visual_scale: f32,
    pub pointer: PointerState,
    pub pen: PenStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub strokes_drawn: usize,
    pub strokes_evicted: usize,
    pub pixels_blended: u64,
    pub glow_drawn: bool,
    pub border_alpha: u8,
}

/// Composes frames into an owned surface.
#[derive(Debug, Default)]
pub struct SceneRenderer {
    surface: PixelSurface,
    mask: CoverageMask,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    /// Sizes the surface and coverage mask to `bounds`, releasing both if either fails.
    pub fn prepare(&mut self, bounds: OverlayBounds) -> OverlayResult<()> {
        let result = self
            .surface
            .ensure(bounds.width, bounds.height)
            .and_then(|_| {
                self.mask
                    .ensure(self.surface.width(), self.surface.height())
            });
        if result.is_err() {
            self.release();
        }
        result
    }

    pub fn release(&mut self) {
        self.surface.release();
        self.mask.release();
    }

    /// Draws one frame at `now_ms`. Expired strokes are dropped from `strokes`.
    pub fn compose(
        &mut self,
        scene: &Scene,
        strokes: &mut StrokeStore,
        now_ms: u64,
    ) -> OverlayResult<FrameReport> {
        self.prepare(scene.bounds)?;
        self.surface.clear();

        let mut report = FrameReport::default();

        if scene.recording {
            let alpha = alpha_to_byte(blink_alpha(now_ms));
            let width = border_width(scene.border_px, scene.visual_scale);
            stroke_rect_border(
                &mut self.surface,
                (0, 0, scene.bounds.width, scene.bounds.height),
                width,
                RECORDING_BORDER_COLOR,
                alpha,
            );
            report.border_alpha = alpha;
        }

        report.strokes_evicted = strokes.evict_expired(now_ms);
        for stroke in strokes.iter() {
            let alpha = alpha_to_byte(strokes.alpha_of(stroke, now_ms));
            if alpha == 0 || stroke.is_empty() {
                continue;
            }
            report.pixels_blended += self.draw_stroke(stroke, scene.visual_scale, alpha);
            report.strokes_drawn += 1;
        }

        if scene.pointer.shows_glow() {
            let (outer, core) = glow_radii(scene.pen.size, scene.visual_scale);
            draw_cursor_glow(&mut self.surface, scene.pointer.position, outer, core);
            report.glow_drawn = true;
        }

        Ok(report)
    }

    fn draw_stroke(&mut self, stroke: &Stroke, visual_scale: f32, alpha: u8) -> u64 {
        let radius = stroke_radius(stroke.size, visual_scale);
        let mut points = stroke.points();
        let Some(first) = points.next() else {
            return 0;
        };
        if stroke.len() == 1 {
            self.mask.stamp_circle(first, radius);
        }
        let mut previous = first;
        for point in points {
            self.mask.stamp_segment(previous, point, radius);
            previous = point;
        }
        self.mask
            .composite_into(&mut self.surface, stroke.color, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::model::Point;
    use crate::overlay::strokes::StrokePolicy;

    fn scene(width: i32, height: i32) -> Scene {
        Scene {
            bounds: OverlayBounds::new(0, 0, width, height),
            border_px: 4,
            recording: false,
            visual_scale: 1.0,
            pointer: PointerState::default(),
            pen: PenStyle::default(),
        }
    }

    #[test]
    fn blink_alpha_stays_in_range_and_repeats() {
        for now in (0..BLINK_PERIOD_MS * 2).step_by(7) {
            let byte = alpha_to_byte(blink_alpha(now));
            assert!((89..=204).contains(&byte), "{byte} at {now}");
            let repeat = blink_alpha(now + BLINK_PERIOD_MS);
            assert!((blink_alpha(now) - repeat).abs() < 1e-4);
        }
        assert_eq!(alpha_to_byte(blink_alpha(BLINK_PERIOD_MS / 4)), 204);
        assert_eq!(alpha_to_byte(blink_alpha(BLINK_PERIOD_MS * 3 / 4)), 89);
    }

    #[test]
    fn glow_radii_follow_scaled_pen() {
        assert_eq!(glow_radii(4, 1.0), (17, 4));
        assert_eq!(glow_radii(20, 1.0), (33, 15));
        assert_eq!(glow_radii(1, 0.55), (14, 4));
        assert_eq!(glow_radii(20, 2.0), (53, 30));
    }

    #[test]
    fn sizes_scale_with_visual_scale() {
        assert_eq!(border_width(4, 1.0), 4);
        assert_eq!(border_width(4, 2.0), 9);
        assert_eq!(border_width(1, 0.55), 1);
        assert_eq!(stroke_radius(4, 1.0), 2);
        assert_eq!(stroke_radius(1, 0.55), 1);
    }

    #[test]
    fn idle_frame_is_fully_transparent() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::default();
        let report = renderer
            .compose(&scene(32, 24), &mut strokes, 0)
            .expect("frame");
        assert_eq!(report, FrameReport::default());
        assert!(renderer.surface().pixels().iter().all(|b| *b == 0));
    }

    #[test]
    fn recording_frame_draws_border_band() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::default();
        let mut scene = scene(40, 30);
        scene.recording = true;
        let report = renderer
            .compose(&scene, &mut strokes, 550)
            .expect("frame");
        assert_eq!(report.border_alpha, 204);
        let edge = renderer.surface().pixel(0, 15).expect("edge");
        assert_eq!(edge[3], 204);
        assert_eq!(renderer.surface().pixel(3, 15).map(|p| p[3]), Some(204));
        assert_eq!(renderer.surface().pixel(4, 15), Some([0, 0, 0, 0]));
    }

    #[test]
    fn strokes_fade_and_are_dropped() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::new(StrokePolicy::default());
        let pen = PenStyle::default();
        strokes.begin_if_needed(Point::new(10, 10), pen, 0);
        strokes.begin_if_needed(Point::new(20, 10), pen, 0);
        strokes.end();

        let scene = scene(40, 30);
        let fresh = renderer.compose(&scene, &mut strokes, 0).expect("frame");
        assert_eq!(fresh.strokes_drawn, 1);
        assert_eq!(renderer.surface().pixel(15, 10).map(|p| p[3]), Some(255));

        renderer.compose(&scene, &mut strokes, 1550).expect("frame");
        assert_eq!(renderer.surface().pixel(15, 10).map(|p| p[3]), Some(56));

        let gone = renderer
            .compose(&scene, &mut strokes, 2310)
            .expect("frame");
        assert_eq!(gone.strokes_evicted, 1);
        assert!(strokes.is_empty());
        assert_eq!(renderer.surface().pixel(15, 10), Some([0, 0, 0, 0]));
    }

    #[test]
    fn single_point_stroke_is_a_dot() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::default();
        strokes.begin_if_needed(Point::new(8, 8), PenStyle::new(Rgb::WHITE, 4), 0);
        let report = renderer
            .compose(&scene(16, 16), &mut strokes, 0)
            .expect("frame");
        assert_eq!(report.pixels_blended, 13);
        assert_eq!(renderer.surface().pixel(10, 8).map(|p| p[3]), Some(255));
        assert_eq!(renderer.surface().pixel(11, 8), Some([0, 0, 0, 0]));
    }

    #[test]
    fn translucent_stroke_has_uniform_body() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::default();
        let pen = PenStyle::new(Rgb::WHITE, 8);
        for x in (4..40).step_by(2) {
            strokes.begin_if_needed(Point::new(x, 12), pen, 0);
        }
        strokes.end();

        renderer
            .compose(&scene(48, 24), &mut strokes, 1000)
            .expect("frame");
        let expected = alpha_to_byte(strokes.policy().fade_alpha(1000));
        for px in renderer.surface().pixels().chunks_exact(4) {
            assert!(px[3] == 0 || px[3] == expected);
        }
    }

    #[test]
    fn glow_follows_pointer_when_drawing_is_active() {
        let mut renderer = SceneRenderer::new();
        let mut strokes = StrokeStore::default();
        let mut scene = scene(64, 64);
        scene.pointer = PointerState {
            position: Point::new(30, 30),
            inside: true,
            down: false,
            draw_active: true,
        };
        let report = renderer.compose(&scene, &mut strokes, 0).expect("frame");
        assert!(report.glow_drawn);
        assert!(renderer.surface().pixel(30, 30).expect("center")[3] >= 252);

        scene.pointer.inside = false;
        let report = renderer.compose(&scene, &mut strokes, 0).expect("frame");
        assert!(!report.glow_drawn);
        assert_eq!(renderer.surface().pixel(30, 30), Some([0, 0, 0, 0]));
    }

    #[test]
    fn invalid_bounds_release_the_surface() {
        let mut renderer = SceneRenderer::new();
        renderer
            .prepare(OverlayBounds::new(0, 0, 16, 16))
            .expect("prepare");
        assert!(renderer.prepare(OverlayBounds::new(0, 0, 0, 16)).is_err());
        assert!(!renderer.surface().is_allocated());
    }
}
