use serde::{Deserialize, Serialize};

use crate::overlay::metrics::DEFAULT_METRICS_WINDOW;
use crate::overlay::model::{
    PenStyle, Rgb, DEFAULT_PEN_COLOR, DEFAULT_PEN_SIZE, MAX_PEN_SIZE, MIN_PEN_SIZE,
};
use crate::overlay::scheduler::DEFAULT_FRAME_INTERVAL_MS;
use crate::overlay::session::{
    clamp_visual_scale, DEFAULT_BORDER_PX, DEFAULT_VISUAL_SCALE, MIN_BORDER_PX,
};
use crate::overlay::strokes::{
    StrokePolicy, MAX_POINTS_PER_STROKE, MAX_STROKES, STROKE_FADE_MS, STROKE_TAIL_ALPHA,
    STROKE_TAIL_MS,
};

const MAX_FRAME_INTERVAL_MS: u64 = 1000;
const MAX_STROKE_PHASE_MS: u64 = 60_000;

/// Defaults applied when a host payload leaves a field out, plus tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default = "default_border_px")]
    pub border_px: i32,
    #[serde(default = "default_recording")]
    pub recording: bool,
    #[serde(default = "default_visual_scale")]
    pub visual_scale: f32,
    #[serde(default = "default_pen_color")]
    pub pen_color: String,
    #[serde(default = "default_pen_size")]
    pub pen_size: i32,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_stroke_fade_ms")]
    pub stroke_fade_ms: u64,
    #[serde(default = "default_stroke_tail_ms")]
    pub stroke_tail_ms: u64,
    #[serde(default = "default_max_strokes")]
    pub max_strokes: usize,
    #[serde(default = "default_max_points_per_stroke")]
    pub max_points_per_stroke: usize,
    #[serde(default = "default_metrics_window")]
    pub metrics_window: usize,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            border_px: default_border_px(),
            recording: default_recording(),
            visual_scale: default_visual_scale(),
            pen_color: default_pen_color(),
            pen_size: default_pen_size(),
            frame_interval_ms: default_frame_interval_ms(),
            stroke_fade_ms: default_stroke_fade_ms(),
            stroke_tail_ms: default_stroke_tail_ms(),
            max_strokes: default_max_strokes(),
            max_points_per_stroke: default_max_points_per_stroke(),
            metrics_window: default_metrics_window(),
            debug_logging: false,
        }
    }
}

fn default_border_px() -> i32 {
    DEFAULT_BORDER_PX
}

fn default_recording() -> bool {
    true
}

fn default_visual_scale() -> f32 {
    DEFAULT_VISUAL_SCALE
}

fn default_pen_color() -> String {
    DEFAULT_PEN_COLOR.to_hex()
}

fn default_pen_size() -> i32 {
    DEFAULT_PEN_SIZE
}

fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

fn default_stroke_fade_ms() -> u64 {
    STROKE_FADE_MS
}

fn default_stroke_tail_ms() -> u64 {
    STROKE_TAIL_MS
}

fn default_max_strokes() -> usize {
    MAX_STROKES
}

fn default_max_points_per_stroke() -> usize {
    MAX_POINTS_PER_STROKE
}

fn default_metrics_window() -> usize {
    DEFAULT_METRICS_WINDOW
}

impl OverlaySettings {
    /// Pulls every field back into its valid range. Returns `true` if anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();

        self.border_px = self.border_px.max(MIN_BORDER_PX);
        self.visual_scale = clamp_visual_scale(self.visual_scale);
        if Rgb::parse_hex(&self.pen_color).is_none() {
            self.pen_color = default_pen_color();
        }
        self.pen_size = self.pen_size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
        self.frame_interval_ms = self.frame_interval_ms.clamp(1, MAX_FRAME_INTERVAL_MS);
        self.stroke_fade_ms = self.stroke_fade_ms.clamp(1, MAX_STROKE_PHASE_MS);
        self.stroke_tail_ms = self.stroke_tail_ms.clamp(1, MAX_STROKE_PHASE_MS);
        self.max_strokes = self.max_strokes.clamp(1, MAX_STROKES);
        self.max_points_per_stroke = self.max_points_per_stroke.clamp(1, MAX_POINTS_PER_STROKE);
        self.metrics_window = self.metrics_window.max(1);

        *self != before
    }

    pub fn pen_style(&self) -> PenStyle {
        PenStyle::new(
            Rgb::parse_hex(&self.pen_color).unwrap_or(DEFAULT_PEN_COLOR),
            self.pen_size,
        )
    }

    pub fn stroke_policy(&self) -> StrokePolicy {
        StrokePolicy {
            max_strokes: self.max_strokes,
            max_points: self.max_points_per_stroke,
            fade_ms: self.stroke_fade_ms,
            tail_ms: self.stroke_tail_ms,
            tail_alpha: STROKE_TAIL_ALPHA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OverlaySettings;
    use crate::overlay::model::{PenStyle, Rgb};
    use crate::overlay::strokes::StrokePolicy;

    #[test]
    fn defaults_match_overlay_constants() {
        let settings = OverlaySettings::default();
        assert_eq!(settings.pen_style(), PenStyle::default());
        assert_eq!(settings.stroke_policy(), StrokePolicy::default());
        assert_eq!(settings.pen_color, "#ff4f70");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings: OverlaySettings =
            serde_json::from_str(r#"{ "pen_size": 9 }"#).expect("parse");
        assert_eq!(settings.pen_size, 9);
        assert_eq!(settings.border_px, 4);
        assert!(settings.recording);
        assert_eq!(settings.frame_interval_ms, 16);
    }

    #[test]
    fn sanitize_pulls_values_into_range() {
        let mut settings = OverlaySettings {
            border_px: 0,
            visual_scale: 5.0,
            pen_color: "pink".into(),
            pen_size: 300,
            frame_interval_ms: 0,
            max_strokes: 10_000,
            stroke_fade_ms: u64::MAX,
            stroke_tail_ms: 0,
            ..OverlaySettings::default()
        };
        assert!(settings.sanitize());
        assert_eq!(settings.border_px, 1);
        assert_eq!(settings.visual_scale, 2.0);
        assert_eq!(settings.pen_style(), PenStyle::new(Rgb::new(255, 79, 112), 64));
        assert_eq!(settings.frame_interval_ms, 1);
        assert_eq!(settings.max_strokes, 128);
        assert_eq!((settings.stroke_fade_ms, settings.stroke_tail_ms), (60_000, 1));
        assert!(!settings.sanitize());
    }
}
