//! Premultiplied-alpha compositing primitives.
//!
//! Every primitive funnels through [`blend_over`], which takes a straight-alpha
//! colour and composites it "source over" onto a premultiplied BGRA pixel.

use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::model::{Point, Rgb};
use crate::overlay::surface::{PixelSurface, BYTES_PER_PIXEL};

pub const GLOW_MAX_ALPHA: f32 = 228.0;
pub const GLOW_CORE_ALPHA: u8 = 232;
pub const GLOW_HOTSPOT_ALPHA: u8 = 252;

#[inline]
fn mul_div_255(a: u32, b: u32) -> u32 {
    // `a * b / 255` never lands exactly on .5, so +127 rounds to nearest.
    (a * b + 127) / 255
}

/// Composites `color` at straight alpha `alpha` over one premultiplied BGRA pixel.
#[inline]
pub fn blend_over(dst: &mut [u8], color: Rgb, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let sa = alpha as u32;
    let inv = 255 - sa;
    let channel = |src: u8, dst: u8| -> u8 {
        (mul_div_255(src as u32, sa) + mul_div_255(dst as u32, inv)).min(255) as u8
    };
    dst[0] = channel(color.b, dst[0]);
    dst[1] = channel(color.g, dst[1]);
    dst[2] = channel(color.r, dst[2]);
    dst[3] = (sa + mul_div_255(dst[3] as u32, inv)).min(255) as u8;
}

pub fn blend_pixel(surface: &mut PixelSurface, x: i32, y: i32, color: Rgb, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let Some(idx) = surface.pixel_index(x, y) else {
        return;
    };
    blend_over(
        &mut surface.pixels_mut()[idx..idx + BYTES_PER_PIXEL],
        color,
        alpha,
    );
}

/// Largest `|dx|` with `dx*dx + dy*dy <= radius*radius`, or -1 when the row misses the circle.
pub(crate) fn circle_half_width(radius: i32, dy: i32) -> i32 {
    let rem = (radius as i64) * (radius as i64) - (dy as i64) * (dy as i64);
    if rem < 0 {
        return -1;
    }
    let mut half = (rem as f64).sqrt() as i64;
    while half * half > rem {
        half -= 1;
    }
    while (half + 1) * (half + 1) <= rem {
        half += 1;
    }
    half as i32
}

pub fn fill_circle(surface: &mut PixelSurface, center: Point, radius: i32, color: Rgb, alpha: u8) {
    if radius < 0 || alpha == 0 {
        return;
    }
    let height = surface.height() as i32;
    let width = surface.width() as i32;
    let y0 = (center.y - radius).max(0);
    let y1 = (center.y + radius).min(height - 1);
    for y in y0..=y1 {
        let half = circle_half_width(radius, y - center.y);
        if half < 0 {
            continue;
        }
        let x0 = (center.x - half).max(0);
        let x1 = (center.x + half).min(width - 1);
        for x in x0..=x1 {
            blend_pixel(surface, x, y, color, alpha);
        }
    }
}

pub fn segment_step(radius: i32) -> f32 {
    (radius as f32 * 0.5).max(0.6)
}

/// Stamp centres along `start..=end`, spaced by [`segment_step`], consecutive duplicates removed.
pub fn segment_stamps(start: Point, end: Point, radius: i32) -> Vec<Point> {
    let dx = (end.x - start.x) as f32;
    let dy = (end.y - start.y) as f32;
    let distance = (dx * dx + dy * dy).sqrt();
    let steps = (distance / segment_step(radius)).ceil().max(1.0) as i32;

    let mut stamps = Vec::with_capacity(steps as usize + 1);
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let point = Point::new(
            (start.x as f32 + dx * t).round() as i32,
            (start.y as f32 + dy * t).round() as i32,
        );
        if stamps.last() != Some(&point) {
            stamps.push(point);
        }
    }
    stamps
}

/// Capsule approximation: filled circles stamped along the segment.
///
/// Overlapping stamps blend repeatedly, so translucent callers that need a
/// uniform body should go through [`CoverageMask`] instead.
pub fn draw_thick_segment(
    surface: &mut PixelSurface,
    start: Point,
    end: Point,
    radius: i32,
    color: Rgb,
    alpha: u8,
) {
    for stamp in segment_stamps(start, end, radius) {
        fill_circle(surface, stamp, radius, color, alpha);
    }
}

/// Fills only the four edge bands of `(x, y, w, h)`; the interior is untouched.
pub fn stroke_rect_border(
    surface: &mut PixelSurface,
    rect: (i32, i32, i32, i32),
    stroke_width: i32,
    color: Rgb,
    alpha: u8,
) {
    let (x, y, w, h) = rect;
    if w <= 0 || h <= 0 || alpha == 0 {
        return;
    }
    let band = stroke_width.clamp(1, (w.min(h) / 2).max(1));
    for py in y..y + h {
        let in_horizontal_band = py < y + band || py >= y + h - band;
        if in_horizontal_band {
            for px in x..x + w {
                blend_pixel(surface, px, py, color, alpha);
            }
            continue;
        }
        for px in (x..x + band).chain((x + w - band).max(x + band)..x + w) {
            blend_pixel(surface, px, py, color, alpha);
        }
    }
}

pub fn glow_mix(t: f32) -> f32 {
    let center_boost = (1.0 - 0.92 * t).max(0.0).powf(0.85);
    let edge_fade = (1.0 - t).max(0.0).powf(1.65);
    0.62 * center_boost + 0.38 * edge_fade
}

pub fn glow_color(t: f32) -> Rgb {
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Rgb::new(255, channel(236.0 - 74.0 * t), channel(82.0 - 54.0 * t))
}

pub fn draw_cursor_glow(
    surface: &mut PixelSurface,
    center: Point,
    outer_radius: i32,
    core_radius: i32,
) {
    let outer = outer_radius.max(1);
    let outer_f = outer as f32;
    for dy in -outer..=outer {
        let half = circle_half_width(outer, dy);
        for dx in -half..=half {
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            let t = (distance / outer_f).min(1.0);
            let alpha = (GLOW_MAX_ALPHA * glow_mix(t)).round().clamp(0.0, 255.0) as u8;
            blend_pixel(surface, center.x + dx, center.y + dy, glow_color(t), alpha);
        }
    }

    fill_circle(surface, center, core_radius, Rgb::WHITE, GLOW_CORE_ALPHA);
    let hotspot = ((core_radius as f32) * 0.5).round().max(1.0) as i32;
    fill_circle(surface, center, hotspot, Rgb::WHITE, GLOW_HOTSPOT_ALPHA);
}

/// Reusable per-pixel coverage for one stroke.
///
/// Stamps mark pixels; [`CoverageMask::composite_into`] blends each marked
/// pixel exactly once and resets only the touched region.
#[derive(Debug, Default)]
pub struct CoverageMask {
    cells: Vec<u8>,
    width: i32,
    height: i32,
    dirty: Option<(i32, i32, i32, i32)>,
}

impl CoverageMask {
    /// Sizes the mask to match a surface. Allocation failure is reported, not fatal.
    pub fn ensure(&mut self, width: u32, height: u32) -> OverlayResult<()> {
        let (w, h) = (width as i32, height as i32);
        if self.width == w && self.height == h {
            return Ok(());
        }
        let len = (width as usize) * (height as usize);
        let mut cells = Vec::new();
        if cells.try_reserve_exact(len).is_err() {
            self.release();
            return Err(OverlayError::Allocation {
                width: w,
                height: h,
                bytes: len,
            });
        }
        cells.resize(len, 0);
        self.cells = cells;
        self.width = w;
        self.height = h;
        self.dirty = None;
        Ok(())
    }

    pub fn release(&mut self) {
        *self = Self::default();
    }

    fn mark_dirty(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        self.dirty = Some(match self.dirty {
            Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
            None => (x0, y0, x1, y1),
        });
    }

    pub fn stamp_circle(&mut self, center: Point, radius: i32) {
        if radius < 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let y0 = (center.y - radius).max(0);
        let y1 = (center.y + radius).min(self.height - 1);
        if y0 > y1 {
            return;
        }
        let mut min_x = i32::MAX;
        let mut max_x = i32::MIN;
        for y in y0..=y1 {
            let half = circle_half_width(radius, y - center.y);
            if half < 0 {
                continue;
            }
            let x0 = (center.x - half).max(0);
            let x1 = (center.x + half).min(self.width - 1);
            if x0 > x1 {
                continue;
            }
            let row = (y * self.width) as usize;
            self.cells[row + x0 as usize..=row + x1 as usize].fill(1);
            min_x = min_x.min(x0);
            max_x = max_x.max(x1);
        }
        if min_x <= max_x {
            self.mark_dirty(min_x, y0, max_x, y1);
        }
    }

    pub fn stamp_segment(&mut self, start: Point, end: Point, radius: i32) {
        for stamp in segment_stamps(start, end, radius) {
            self.stamp_circle(stamp, radius);
        }
    }

    /// Blends every covered pixel once and clears the mask. Returns the number of pixels blended.
    pub fn composite_into(&mut self, surface: &mut PixelSurface, color: Rgb, alpha: u8) -> u64 {
        let Some((x0, y0, x1, y1)) = self.dirty.take() else {
            return 0;
        };
        let mut blended = 0u64;
        for y in y0..=y1 {
            let row = (y * self.width) as usize;
            for x in x0..=x1 {
                let cell = &mut self.cells[row + x as usize];
                if *cell == 0 {
                    continue;
                }
                *cell = 0;
                if alpha != 0 {
                    blend_pixel(surface, x, y, color, alpha);
                    blended += 1;
                }
            }
        }
        blended
    }
}
