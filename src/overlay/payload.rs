//! Lenient readers for host payloads.
//!
//! Host calls arrive as loosely typed JSON objects. A missing or mistyped field
//! never fails the call; it falls back to a default and the reader reports that
//! it did so through [`Parsed::used_default`].

use serde_json::{Map, Value};

use crate::overlay::model::{clamp_pen_size, OverlayBounds, PenStyle, Rgb};
use crate::overlay::session::{clamp_visual_scale, PointerUpdate, StartParams, MIN_BORDER_PX};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub used_default: bool,
}

impl<T> Parsed<T> {
    pub fn given(value: T) -> Self {
        Self {
            value,
            used_default: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            used_default: true,
        }
    }
}

pub fn as_object(payload: Option<&Value>) -> Option<&Map<String, Value>> {
    payload.and_then(Value::as_object)
}

/// Integer field. Fractional numbers are truncated toward zero and saturate at the `i32` range.
pub fn read_i32(obj: &Map<String, Value>, key: &str, fallback: i32) -> Parsed<i32> {
    let Some(value) = obj.get(key) else {
        return Parsed::fallback(fallback);
    };
    if let Some(n) = value.as_i64() {
        return Parsed::given(n.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
    }
    match value.as_f64() {
        Some(n) if n.is_finite() => Parsed::given(n as i32),
        _ => Parsed::fallback(fallback),
    }
}

pub fn read_bool(obj: &Map<String, Value>, key: &str, fallback: bool) -> Parsed<bool> {
    match obj.get(key).and_then(Value::as_bool) {
        Some(value) => Parsed::given(value),
        None => Parsed::fallback(fallback),
    }
}

/// Number field that also accepts a numeric string such as `"1.25"`.
pub fn read_f64(obj: &Map<String, Value>, key: &str, fallback: f64) -> Parsed<f64> {
    let parsed = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(value) if value.is_finite() => Parsed::given(value),
        _ => Parsed::fallback(fallback),
    }
}

pub fn read_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Start parameters layered over `defaults`. Missing `bounds` fields come from `defaults.bounds`.
pub fn parse_start(payload: Option<&Value>, defaults: StartParams) -> StartParams {
    let mut params = defaults.sanitized();
    let Some(obj) = as_object(payload) else {
        return params;
    };
    let screen = defaults.bounds;

    if let Some(bounds) = obj.get("bounds").and_then(Value::as_object) {
        params.bounds = OverlayBounds::new(
            read_i32(bounds, "x", screen.x).value,
            read_i32(bounds, "y", screen.y).value,
            read_i32(bounds, "width", screen.width).value,
            read_i32(bounds, "height", screen.height).value,
        );
    }
    params.border_px = read_i32(obj, "borderPx", params.border_px)
        .value
        .max(MIN_BORDER_PX);
    params.recording = read_bool(obj, "recording", params.recording).value;
    params.visual_scale =
        clamp_visual_scale(read_f64(obj, "visualScale", params.visual_scale as f64).value as f32);
    params
}

/// Pointer update, or `None` when the payload is not an object.
pub fn parse_pointer(payload: Option<&Value>) -> Option<PointerUpdate> {
    let obj = as_object(payload)?;
    let int = |key: &str| {
        let parsed = read_i32(obj, key, 0);
        (!parsed.used_default).then_some(parsed.value)
    };
    let flag = |key: &str| {
        let parsed = read_bool(obj, key, false);
        (!parsed.used_default).then_some(parsed.value)
    };
    Some(PointerUpdate {
        x: int("x"),
        y: int("y"),
        inside: flag("inside"),
        down: flag("down"),
        draw_active: flag("drawActive"),
    })
}

/// Applies a pen payload to `current`. Colours other than exact `#RRGGBB` are ignored.
pub fn parse_pen_style(payload: Option<&Value>, current: PenStyle) -> Parsed<PenStyle> {
    let Some(obj) = as_object(payload) else {
        return Parsed::fallback(current);
    };
    let color = read_str(obj, "color").and_then(Rgb::parse_hex);
    let size = read_i32(obj, "size", current.size);
    let pen = PenStyle {
        color: color.unwrap_or(current.color),
        size: clamp_pen_size(size.value),
    };
    Parsed {
        value: pen,
        used_default: color.is_none() && size.used_default,
    }
}
