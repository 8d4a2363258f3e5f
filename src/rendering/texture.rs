/// Material textures: row-major 0x00RRGGBB texels addressed by wrapped UV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<u32>,
}

impl Texture {
    /// Returns None when the dimensions do not match the texel count or are zero.
    pub fn new(width: u32, height: u32, texels: Vec<u32>) -> Option<Self> {
        if width == 0 || height == 0 || texels.len() != (width * height) as usize {
            return None;
        }
        Some(Self { width, height, texels })
    }

    /// Two-colour checkerboard, `cell` texels per square. None for a zero
    /// dimension, like `new`.
    pub fn checkerboard(width: u32, height: u32, cell: u32, a: u32, b: u32) -> Option<Self> {
        let cell = cell.max(1);
        let texels = (0..height)
            .flat_map(|y| (0..width).map(move |x| if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b }))
            .collect();
        Self::new(width, height, texels)
    }

    /// Mean colour over all texels, used in place of sampling for distant or
    /// tiny primitives.
    pub fn average_rgb(&self) -> u32 {
        let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
        for &t in &self.texels {
            r += ((t >> 16) & 0xFF) as u64;
            g += ((t >> 8) & 0xFF) as u64;
            b += (t & 0xFF) as u64;
        }
        let n = self.texels.len().max(1) as u64;
        (((r / n) as u32 & 0xFF) << 16) | (((g / n) as u32 & 0xFF) << 8) | ((b / n) as u32 & 0xFF)
    }

    /// Sample at texture coordinates. Only the fractional parts are used, and
    /// rows are addressed top-down exactly as stored (no vertical flip).
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> u32 {
        let s = (u.fract() * self.width as f32 - 0.5) as u32;
        let t = (v.fract() * self.height as f32 - 0.5) as u32;
        let index = (t.min(self.height - 1) * self.width + s.min(self.width - 1)) as usize;
        self.texels[index]
    }
}
