/// Screen-space helpers shared by setup, rasterization and hit-testing.
/// Vector and matrix math itself comes from glam.
use glam::{Vec3, Vec4};

/// Default panel size in pixels.
pub const SCREEN_WIDTH: usize = 128;
pub const SCREEN_HEIGHT: usize = 128;

/// Float bounding rectangle in raster coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Workload estimate used by the frame budget, not an exact pixel count.
    #[inline]
    pub fn area(&self) -> u32 {
        (self.width() * self.height()) as u32
    }

    /// Inclusive integer box test, matching how queued records are re-walked
    /// for hit-testing.
    #[inline]
    pub fn contains_pixel(&self, x: u32, y: u32) -> bool {
        x >= self.min_x as u32
            && x <= self.max_x as u32
            && y >= self.min_y as u32
            && y <= self.max_y as u32
    }
}

/// Pixel dimensions of the render target and the homogeneous raster transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        }
    }
}

impl Viewport {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Clip space to raster space without the perspective divide.
    /// x and y stay scaled by w so that 1/w can be interpolated per pixel.
    #[inline]
    pub fn to_raster(&self, clip: Vec4) -> Vec4 {
        let hw = self.width as f32 * 0.5;
        let hh = self.height as f32 * 0.5;
        Vec4::new(hw * (clip.x + clip.w), hh * (clip.w - clip.y), clip.z, clip.w)
    }

    /// Full-screen rectangle handed to triangles that straddle a clip plane.
    #[inline]
    pub fn full_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

/// Inside test for one edge function value.
///
/// `edge` holds the (a, b, c) coefficients; only a and b matter here. A value of
/// exactly zero is resolved by the direction of the edge so that two triangles
/// sharing an edge never both claim (or both drop) a pixel on it.
#[inline(always)]
pub fn edge_passes(edge: Vec3, value: f32) -> bool {
    if value > 0.0 {
        true
    } else if value < 0.0 {
        false
    } else {
        (edge.y == 0.0 && edge.x > 0.0) || edge.y > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_value_is_claimed_by_exactly_one_side() {
        let edges = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.5, -0.5, 2.0),
            Vec3::new(-0.25, 0.75, -1.0),
        ];
        for e in edges {
            let flipped = -e;
            assert_ne!(
                edge_passes(e, 0.0),
                edge_passes(flipped, 0.0),
                "edge {:?} and its reverse must disagree on a zero value",
                e
            );
        }
    }

    #[test]
    fn raster_transform_keeps_w() {
        let vp = Viewport::new(128, 128);
        let r = vp.to_raster(Vec4::new(0.0, 0.0, 0.5, 2.0));
        assert_eq!(r, Vec4::new(128.0, 128.0, 0.5, 2.0));
        // divide by w lands on the screen centre
        assert_eq!(r.x / r.w, 64.0);
    }

    #[test]
    fn contains_pixel_is_inclusive() {
        let rect = Rect::new(8.0, 8.0, 16.0, 16.0);
        assert!(rect.contains_pixel(16, 16));
        assert!(rect.contains_pixel(8, 8));
        assert!(!rect.contains_pixel(7, 8));
        assert!(!rect.contains_pixel(8, 17));
        assert_eq!(rect.area(), 64);
    }
}
