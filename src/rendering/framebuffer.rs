/// Pixel and depth storage for the rasterizer
///
/// Colour and depth live in separate allocations: the depth buffer stays with
/// the world loop for collision sampling while pixel buffers travel between the
/// raster worker and the display link.
use crate::count_call;

/// Packed 16-bit RGB565 colour target.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u16>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Fill every pixel with one colour
    pub fn clear(&mut self, colour: u16) {
        count_call!(pixel_clear_calls);
        self.pixels.fill(colour);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Count pixels that differ from `colour`, handy for coverage checks
    pub fn count_not(&self, colour: u16) -> usize {
        self.pixels.iter().filter(|&&p| p != colour).count()
    }

    /// Expand to 8-bit RGB triples, row-major, for image export.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for &p in &self.pixels {
            let [r, g, b] = rgb565_to_rgb8(p);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }
}

/// One float per pixel. Cleared to the far plane each frame; nearer z wins.
#[derive(Clone, Debug)]
pub struct DepthBuffer {
    pub width: usize,
    pub height: usize,
    pub depth: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize, far: f32) -> Self {
        Self {
            width,
            height,
            depth: vec![far; width * height],
        }
    }

    pub fn clear(&mut self, far: f32) {
        count_call!(depth_clear_calls);
        self.depth.fill(far);
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    /// Depth test with the `<=` rule; coplanar fragments drawn later win.
    /// Out-of-range indices fail the test.
    #[inline(always)]
    pub fn test_and_set(&mut self, index: usize, z: f32) -> bool {
        let Some(slot) = self.depth.get_mut(index) else {
            return false;
        };
        if z <= *slot {
            *slot = z;
            true
        } else {
            false
        }
    }
}

/// Mutable view the rasterizer draws into for one frame.
pub struct RasterTarget<'a> {
    pub pixels: &'a mut PixelBuffer,
    pub depth: &'a mut DepthBuffer,
}

impl<'a> RasterTarget<'a> {
    pub fn new(pixels: &'a mut PixelBuffer, depth: &'a mut DepthBuffer) -> Self {
        debug_assert_eq!(pixels.width, depth.width);
        debug_assert_eq!(pixels.height, depth.height);
        Self { pixels, depth }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.width
    }

    #[inline]
    pub fn write(&mut self, index: usize, colour: u16) {
        self.pixels.pixels[index] = colour;
    }
}

/// Pack 8-bit channels into RGB565
#[inline]
pub const fn rgb888_to_rgb565(rgb: u32) -> u16 {
    (((rgb >> 8) & 0xF800) | ((rgb >> 5) & 0x07E0) | ((rgb >> 3) & 0x001F)) as u16
}

/// Expand RGB565 to 8-bit channels (bit replication for the low bits)
#[inline]
pub const fn rgb565_to_rgb8(c: u16) -> [u8; 3] {
    let r = (c >> 11) & 0x1F;
    let g = (c >> 5) & 0x3F;
    let b = c & 0x1F;
    [
        ((r << 3) | (r >> 2)) as u8,
        ((g << 2) | (g >> 4)) as u8,
        ((b << 3) | (b >> 2)) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_packing_keeps_top_bits() {
        assert_eq!(rgb888_to_rgb565(0xFFFFFF), 0xFFFF);
        assert_eq!(rgb888_to_rgb565(0xFF0000), 0xF800);
        assert_eq!(rgb888_to_rgb565(0x00FF00), 0x07E0);
        assert_eq!(rgb888_to_rgb565(0x0000FF), 0x001F);
        assert_eq!(rgb565_to_rgb8(0xFFFF), [255, 255, 255]);
    }

    #[test]
    fn depth_test_allows_equal_depth() {
        let mut depth = DepthBuffer::new(2, 2, 100.0);
        assert!(depth.test_and_set(0, 5.0));
        assert!(depth.test_and_set(0, 5.0), "equal depth should pass");
        assert!(!depth.test_and_set(0, 6.0));
        assert_eq!(depth.at(0, 0), 5.0);
        assert!(!depth.test_and_set(99, 1.0), "out of range index must be ignored");
    }
}
