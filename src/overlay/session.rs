use std::time::Instant;

use crate::overlay::error::OverlayResult;
use crate::overlay::metrics::{RenderMetrics, RenderMetricsSnapshot};
use crate::overlay::model::{OverlayBounds, PenStyle, PointerState};
use crate::overlay::present::PresentationSurface;
use crate::overlay::render::{FrameReport, Scene, SceneRenderer};
use crate::overlay::strokes::{StrokePolicy, StrokeStore};
use crate::overlay::surface::PixelSurface;

pub const DEFAULT_BORDER_PX: i32 = 4;
pub const MIN_BORDER_PX: i32 = 1;
pub const DEFAULT_VISUAL_SCALE: f32 = 1.0;
pub const MIN_VISUAL_SCALE: f32 = 0.55;
pub const MAX_VISUAL_SCALE: f32 = 2.0;

pub fn clamp_visual_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        return DEFAULT_VISUAL_SCALE;
    }
    scale.clamp(MIN_VISUAL_SCALE, MAX_VISUAL_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartParams {
    pub bounds: OverlayBounds,
    pub border_px: i32,
    pub recording: bool,
    pub visual_scale: f32,
}

impl StartParams {
    pub fn new(bounds: OverlayBounds) -> Self {
        Self {
            bounds,
            border_px: DEFAULT_BORDER_PX,
            recording: true,
            visual_scale: DEFAULT_VISUAL_SCALE,
        }
    }

    /// Applies the border floor and the visual scale range. Bounds are validated by the surface.
    pub fn sanitized(self) -> Self {
        Self {
            border_px: self.border_px.max(MIN_BORDER_PX),
            visual_scale: clamp_visual_scale(self.visual_scale),
            ..self
        }
    }
}

/// Partial pointer update; `None` keeps the previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerUpdate {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub inside: Option<bool>,
    pub down: Option<bool>,
    pub draw_active: Option<bool>,
}

/// One live overlay: geometry, pen, pointer, strokes and the surfaces they are drawn to.
pub struct OverlaySession {
    params: StartParams,
    pen: PenStyle,
    pointer: PointerState,
    strokes: StrokeStore,
    renderer: SceneRenderer,
    presenter: Box<dyn PresentationSurface>,
    metrics: RenderMetrics,
}

impl std::fmt::Debug for OverlaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlaySession")
            .field("params", &self.params)
            .field("pen", &self.pen)
            .field("pointer", &self.pointer)
            .field("strokes", &self.strokes.len())
            .finish_non_exhaustive()
    }
}

impl OverlaySession {
    /// Creates the surfaces for `params` and renders the first frame.
    /// On failure everything acquired so far is released.
    pub fn start(
        mut presenter: Box<dyn PresentationSurface>,
        params: StartParams,
        pen: PenStyle,
        policy: StrokePolicy,
        metrics: RenderMetrics,
        now_ms: u64,
    ) -> OverlayResult<Self> {
        let params = params.sanitized();
        let mut renderer = SceneRenderer::new();
        if let Err(err) = acquire(&mut renderer, presenter.as_mut(), params.bounds) {
            presenter.release();
            return Err(err);
        }

        let mut session = Self {
            params,
            pen,
            pointer: PointerState::default(),
            strokes: StrokeStore::new(policy),
            renderer,
            presenter,
            metrics,
        };
        tracing::info!(
            x = params.bounds.x,
            y = params.bounds.y,
            width = params.bounds.width,
            height = params.bounds.height,
            border_px = params.border_px,
            recording = params.recording,
            visual_scale = params.visual_scale,
            "overlay session started"
        );
        session.render_logged(now_ms);
        Ok(session)
    }

    /// Applies new geometry to a running session. Strokes, pen and pointer survive.
    pub fn restart(&mut self, params: StartParams, now_ms: u64) -> OverlayResult<()> {
        let params = params.sanitized();
        acquire(&mut self.renderer, self.presenter.as_mut(), params.bounds)?;
        self.params = params;
        let position = self.pointer.position;
        self.pointer.position = self.bounds().clamp_local(position.x, position.y);
        tracing::info!(
            width = params.bounds.width,
            height = params.bounds.height,
            recording = params.recording,
            strokes = self.strokes.len(),
            "overlay session restarted"
        );
        self.render_logged(now_ms);
        Ok(())
    }

    pub fn params(&self) -> &StartParams {
        &self.params
    }

    pub fn bounds(&self) -> OverlayBounds {
        self.params.bounds
    }

    pub fn pen(&self) -> PenStyle {
        self.pen
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn strokes(&self) -> &StrokeStore {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn point_count(&self) -> usize {
        self.strokes.point_count()
    }

    pub fn surface(&self) -> &PixelSurface {
        self.renderer.surface()
    }

    pub fn metrics(&self) -> RenderMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn set_pointer(&mut self, update: PointerUpdate, now_ms: u64) -> PointerState {
        let previous = self.pointer;
        let position = self.bounds().clamp_local(
            update.x.unwrap_or(previous.position.x),
            update.y.unwrap_or(previous.position.y),
        );
        self.pointer = PointerState {
            position,
            inside: update.inside.unwrap_or(previous.inside),
            down: update.down.unwrap_or(previous.down),
            draw_active: update.draw_active.unwrap_or(previous.draw_active),
        };

        if self.pointer.should_draw() {
            self.strokes.begin_if_needed(position, self.pen, now_ms);
        } else {
            self.strokes.end();
        }
        self.render_logged(now_ms);
        self.pointer
    }

    /// New strokes use `pen`; existing strokes keep the style they were started with.
    pub fn set_pen_style(&mut self, pen: PenStyle, now_ms: u64) {
        self.pen = pen;
        self.render_logged(now_ms);
    }

    pub fn undo(&mut self, now_ms: u64) -> usize {
        if self.strokes.undo().is_some() {
            tracing::debug!(remaining = self.strokes.len(), "stroke undone");
        }
        self.render_logged(now_ms);
        self.strokes.len()
    }

    pub fn clear(&mut self, now_ms: u64) {
        let removed = self.strokes.clear();
        tracing::debug!(removed, "strokes cleared");
        self.render_logged(now_ms);
    }

    /// Composes and presents one frame.
    pub fn render(&mut self, now_ms: u64) -> OverlayResult<FrameReport> {
        let started = Instant::now();
        let scene = Scene {
            bounds: self.params.bounds,
            border_px: self.params.border_px,
            recording: self.params.recording,
            visual_scale: self.params.visual_scale,
            pointer: self.pointer,
            pen: self.pen,
        };
        let report = match self
            .renderer
            .compose(&scene, &mut self.strokes, now_ms)
            .and_then(|report| {
                self.presenter
                    .present(self.renderer.surface())
                    .map(|_| report)
            }) {
            Ok(report) => report,
            Err(err) => {
                self.metrics.record_failure();
                return Err(err);
            }
        };
        self.metrics.record_frame(
            started.elapsed().as_secs_f64() * 1000.0,
            report.pixels_blended,
        );
        Ok(report)
    }

    /// Renders, logging a failure instead of returning it. The next tick retries.
    pub fn render_logged(&mut self, now_ms: u64) -> Option<FrameReport> {
        match self.render(now_ms) {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(error = %err, "overlay frame failed");
                None
            }
        }
    }

    /// Ends the session, releasing the surface and the presentation target.
    pub fn stop(mut self) {
        self.strokes.clear();
        tracing::info!("overlay session stopped");
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        self.renderer.release();
        self.presenter.release();
    }
}

fn acquire(
    renderer: &mut SceneRenderer,
    presenter: &mut dyn PresentationSurface,
    bounds: OverlayBounds,
) -> OverlayResult<()> {
    renderer.prepare(bounds)?;
    if let Err(err) = presenter.ensure(bounds) {
        renderer.release();
        return Err(err);
    }
    Ok(())
}
