use crate::overlay::error::{OverlayError, OverlayResult};

pub const BYTES_PER_PIXEL: usize = 4;
pub const MAX_SURFACE_DIMENSION: i32 = 16_384;

/// Off-screen premultiplied BGRA buffer, rows top-down with no padding.
#[derive(Debug, Default)]
pub struct PixelSurface {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    allocation_count: usize,
}

impl PixelSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the buffer exactly `width x height`. Returns `true` when it had to reallocate.
    pub fn ensure(&mut self, width: i32, height: i32) -> OverlayResult<bool> {
        if width <= 0 || height <= 0 || width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION
        {
            return Err(OverlayError::InvalidSize { width, height });
        }
        let size = (width as u32, height as u32);
        if self.size() == size && self.pixels.len() == byte_len(size) {
            return Ok(false);
        }

        let bytes = byte_len(size);
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(bytes)
            .map_err(|_| OverlayError::Allocation {
                width,
                height,
                bytes,
            })?;
        pixels.resize(bytes, 0);

        self.pixels = pixels;
        self.width = size.0;
        self.height = size.1;
        self.allocation_count += 1;
        tracing::debug!(width, height, "overlay surface reallocated");
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn release(&mut self) {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    pub fn is_allocated(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn pixel_index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }

    /// Returns `[b, g, r, a]` at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let idx = self.pixel_index(x, y)?;
        let px = &self.pixels[idx..idx + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }
}

fn byte_len(size: (u32, u32)) -> usize {
    (size.0 as usize)
        .saturating_mul(size.1 as usize)
        .saturating_mul(BYTES_PER_PIXEL)
}
