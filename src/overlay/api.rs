//! Host-facing entry points.
//!
//! [`OverlayHost`] owns at most one [`OverlaySession`] and turns every call into
//! a structured response. Nothing here panics across the boundary: platform,
//! payload and resource problems come back as `ok: false` plus a reason code.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::overlay::clock::{Clock, SystemClock};
use crate::overlay::error::OverlayError;
use crate::overlay::metrics::RenderMetrics;
use crate::overlay::model::PenStyle;
use crate::overlay::payload::{parse_pen_style, parse_pointer, parse_start};
use crate::overlay::present::OverlayBackend;
use crate::overlay::scheduler::FrameScheduler;
use crate::overlay::session::{OverlaySession, StartParams};
use crate::overlay::settings::OverlaySettings;

pub const REASON_OK: &str = "OK";
pub const REASON_INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
const UNSUPPORTED_MESSAGE: &str = "Windows-only backend.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub ok: bool,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Rejection {
    pub fn new(reason: &'static str) -> Self {
        Self {
            ok: false,
            reason,
            message: None,
        }
    }

    pub fn with_message(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason,
            message: Some(message.into()),
        }
    }
}

impl From<OverlayError> for Rejection {
    fn from(err: OverlayError) -> Self {
        Self::with_message(err.reason(), err.to_string())
    }
}

/// Either the call's own response or a bare rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Done(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Done(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub ok: bool,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub border_px: i32,
    pub recording: bool,
    pub visual_scale: f32,
    pub visual_scale_milli: i32,
}

impl StartResponse {
    fn from_params(params: &StartParams, error: Option<OverlayError>) -> Self {
        Self {
            ok: error.is_none(),
            reason: error.as_ref().map_or(REASON_OK, OverlayError::reason),
            message: error.map(|err| err.to_string()),
            x: params.bounds.x,
            y: params.bounds.y,
            width: params.bounds.width,
            height: params.bounds.height,
            border_px: params.border_px,
            recording: params.recording,
            visual_scale: params.visual_scale,
            visual_scale_milli: (params.visual_scale * 1000.0).round() as i32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerResponse {
    pub ok: bool,
    pub x: i32,
    pub y: i32,
    pub inside: bool,
    pub down: bool,
    pub draw_active: bool,
    pub stroke_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenStyleResponse {
    pub ok: bool,
    pub size: i32,
    pub color: String,
    pub color_bgr: u32,
}

impl From<PenStyle> for PenStyleResponse {
    fn from(pen: PenStyle) -> Self {
        Self {
            ok: true,
            size: pen.size,
            color: pen.color.to_hex(),
            color_bgr: pen.color.to_bgr_u32(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeCountResponse {
    pub ok: bool,
    pub stroke_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopResponse {
    pub ok: bool,
    pub stopped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugMetricsResponse {
    pub ok: bool,
    pub active: bool,
    pub frames_rendered: u64,
    pub frames_failed: u64,
    pub avg_frame_ms: f64,
    pub worst_frame_ms: f64,
    pub p95_frame_ms: f64,
    pub stroke_count: usize,
    pub point_count: usize,
    pub width: u32,
    pub height: u32,
    pub surface_allocations: usize,
}

pub struct OverlayHost {
    backend: Box<dyn OverlayBackend>,
    clock: Box<dyn Clock>,
    settings: OverlaySettings,
    pen: PenStyle,
    session: Option<OverlaySession>,
    scheduler: FrameScheduler,
}

impl OverlayHost {
    pub fn new(backend: Box<dyn OverlayBackend>, settings: OverlaySettings) -> Self {
        Self::with_clock(backend, Box::new(SystemClock::new()), settings)
    }

    pub fn with_clock(
        backend: Box<dyn OverlayBackend>,
        clock: Box<dyn Clock>,
        mut settings: OverlaySettings,
    ) -> Self {
        settings.sanitize();
        Self {
            pen: settings.pen_style(),
            scheduler: FrameScheduler::new(settings.frame_interval_ms),
            backend,
            clock,
            settings,
            session: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&OverlaySession> {
        self.session.as_ref()
    }

    /// Pen applied to the next stroke, whether or not a session is running.
    pub fn pen(&self) -> PenStyle {
        self.pen
    }

    pub fn backend_mut(&mut self) -> &mut dyn OverlayBackend {
        self.backend.as_mut()
    }

    fn unsupported(&self) -> Option<Rejection> {
        (!self.backend.is_supported())
            .then(|| Rejection::with_message(OverlayError::Unsupported.reason(), UNSUPPORTED_MESSAGE))
    }

    fn start_defaults(&self) -> StartParams {
        StartParams {
            bounds: self.backend.virtual_screen_bounds(),
            border_px: self.settings.border_px,
            recording: self.settings.recording,
            visual_scale: self.settings.visual_scale,
        }
    }

    /// Creates the overlay, or reconfigures the running one while keeping its strokes.
    pub fn start(&mut self, payload: Option<&Value>) -> Outcome<StartResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        let params = parse_start(payload, self.start_defaults());
        let now = self.clock.now_ms();

        let result = match self.session.as_mut() {
            Some(session) => session.restart(params, now),
            None => self.backend.create_presenter().and_then(|presenter| {
                OverlaySession::start(
                    presenter,
                    params,
                    self.pen,
                    self.settings.stroke_policy(),
                    RenderMetrics::new(self.settings.metrics_window),
                    now,
                )
                .map(|session| self.session = Some(session))
            }),
        };

        match result {
            Ok(()) => {
                self.scheduler.start(now);
                let params = self.session.as_ref().map_or(params, |s| *s.params());
                Outcome::Done(StartResponse::from_params(&params, None))
            }
            Err(err) => {
                tracing::warn!(error = %err, "overlay start failed");
                self.scheduler.stop();
                if let Some(session) = self.session.take() {
                    session.stop();
                }
                Outcome::Done(StartResponse::from_params(&params.sanitized(), Some(err)))
            }
        }
    }

    pub fn set_pointer(&mut self, payload: Option<&Value>) -> Outcome<PointerResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        let Some(update) = parse_pointer(payload) else {
            return Outcome::Rejected(Rejection::new(REASON_INVALID_PAYLOAD));
        };
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Outcome::Rejected(OverlayError::NotActive.into());
        };
        let pointer = session.set_pointer(update, now);
        Outcome::Done(PointerResponse {
            ok: true,
            x: pointer.position.x,
            y: pointer.position.y,
            inside: pointer.inside,
            down: pointer.down,
            draw_active: pointer.draw_active,
            stroke_count: session.stroke_count(),
        })
    }

    /// Updates the pen for future strokes. Works without a session; the value is kept for the next start.
    pub fn set_pen_style(&mut self, payload: Option<&Value>) -> Outcome<PenStyleResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        self.pen = parse_pen_style(payload, self.pen).value;
        let now = self.clock.now_ms();
        if let Some(session) = self.session.as_mut() {
            session.set_pen_style(self.pen, now);
        }
        Outcome::Done(self.pen.into())
    }

    pub fn undo_stroke(&mut self) -> Outcome<StrokeCountResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Outcome::Rejected(OverlayError::NotActive.into());
        };
        Outcome::Done(StrokeCountResponse {
            ok: true,
            stroke_count: session.undo(now),
        })
    }

    pub fn clear_strokes(&mut self) -> Outcome<StrokeCountResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Outcome::Rejected(OverlayError::NotActive.into());
        };
        session.clear(now);
        Outcome::Done(StrokeCountResponse {
            ok: true,
            stroke_count: 0,
        })
    }

    /// Tears the overlay down. Safe to call at any time, on any backend.
    pub fn stop(&mut self) -> StopResponse {
        self.scheduler.stop();
        if let Some(session) = self.session.take() {
            session.stop();
        }
        StopResponse {
            ok: true,
            stopped: true,
        }
    }

    pub fn debug_metrics(&self) -> Outcome<DebugMetricsResponse> {
        if let Some(rejection) = self.unsupported() {
            return Outcome::Rejected(rejection);
        }
        let Some(session) = self.session.as_ref() else {
            return Outcome::Done(DebugMetricsResponse {
                ok: true,
                ..Default::default()
            });
        };
        let metrics = session.metrics();
        let surface = session.surface();
        Outcome::Done(DebugMetricsResponse {
            ok: true,
            active: true,
            frames_rendered: metrics.frames_rendered,
            frames_failed: metrics.frames_failed,
            avg_frame_ms: metrics.avg_frame_ms,
            worst_frame_ms: metrics.worst_frame_ms,
            p95_frame_ms: metrics.p95_frame_ms,
            stroke_count: session.stroke_count(),
            point_count: session.point_count(),
            width: surface.width(),
            height: surface.height(),
            surface_allocations: surface.allocation_count(),
        })
    }

    /// Renders a frame if the scheduler says one is due. Returns whether it did.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.scheduler.poll(now) {
            return false;
        }
        match self.session.as_mut() {
            Some(session) => session.render_logged(now).is_some(),
            None => false,
        }
    }

    /// Time until the next frame is due, or `None` while idle.
    pub fn next_tick_in(&self) -> Option<Duration> {
        self.scheduler.time_until_due(self.clock.now_ms())
    }
}
