use serde::{Deserialize, Serialize};

pub const DEFAULT_PEN_COLOR: Rgb = Rgb::new(255, 79, 112);
pub const DEFAULT_PEN_SIZE: i32 = 4;
pub const MIN_PEN_SIZE: i32 = 1;
pub const MAX_PEN_SIZE: i32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Parses the exact `#RRGGBB` form. Short forms, names and missing `#` are rejected.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let bytes = value.as_bytes();
        if bytes.len() != 7 || bytes[0] != b'#' {
            return None;
        }
        let channel = |offset: usize| -> Option<u8> {
            let hi = (bytes[offset] as char).to_digit(16)?;
            let lo = (bytes[offset + 1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        };
        Some(Self::new(channel(1)?, channel(3)?, channel(5)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// GDI `COLORREF` layout (0x00BBGGRR).
    pub fn to_bgr_u32(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        dx.hypot(dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlayBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl OverlayBounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamps a point into `[0, width-1] x [0, height-1]`.
    pub fn clamp_local(&self, x: i32, y: i32) -> Point {
        let max_x = (self.width - 1).max(0);
        let max_y = (self.height - 1).max(0);
        Point::new(x.clamp(0, max_x), y.clamp(0, max_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenStyle {
    pub color: Rgb,
    pub size: i32,
}

impl PenStyle {
    pub fn new(color: Rgb, size: i32) -> Self {
        Self {
            color,
            size: clamp_pen_size(size),
        }
    }
}

impl Default for PenStyle {
    fn default() -> Self {
        Self::new(DEFAULT_PEN_COLOR, DEFAULT_PEN_SIZE)
    }
}

pub fn clamp_pen_size(size: i32) -> i32 {
    size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerState {
    pub position: Point,
    pub inside: bool,
    pub down: bool,
    pub draw_active: bool,
}

impl PointerState {
    pub fn should_draw(&self) -> bool {
        self.draw_active && self.inside && self.down
    }

    pub fn shows_glow(&self) -> bool {
        self.draw_active && self.inside
    }
}
