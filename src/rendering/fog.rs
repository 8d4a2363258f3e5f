/// Linear depth fog, blended at 8-bit precision and packed to RGB565.

pub const FOG_START: f32 = 5.0;
pub const FOG_END: f32 = 30.0;
pub const FOG_COLOUR: u32 = 0x30_30_30;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fog {
    pub start: f32,
    pub end: f32,
    /// 0x00RRGGBB
    pub colour: u32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            start: FOG_START,
            end: FOG_END,
            colour: FOG_COLOUR,
        }
    }
}

impl Fog {
    /// 1.0 at or before `start`, 0.0 at or beyond `end`
    #[inline]
    pub fn factor(&self, depth: f32) -> f32 {
        ((self.end - depth) / (self.end - self.start)).clamp(0.0, 1.0)
    }

    /// Mix `rgb888` towards the fog colour by depth and pack to RGB565.
    ///
    /// Channels are mixed into a 16-bit range (`fog*(255-a) + c*a`), so the
    /// 565 fields are taken from the top bits of each mixed value.
    #[inline]
    pub fn blend_rgb565(&self, rgb888: u32, depth: f32) -> u16 {
        let a = (255.0 * self.factor(depth)) as u32;
        let mix = |fog: u32, pix: u32| fog * (255 - a) + pix * a;

        let r = mix((self.colour >> 16) & 0xFF, (rgb888 >> 16) & 0xFF);
        let g = mix((self.colour >> 8) & 0xFF, (rgb888 >> 8) & 0xFF);
        let b = mix(self.colour & 0xFF, rgb888 & 0xFF);

        ((r & 0xF800) | ((g >> 5) & 0x07E0) | ((b >> 11) & 0x001F)) as u16
    }

    /// Clear colour for a fresh frame
    #[inline]
    pub fn background_rgb565(&self) -> u16 {
        crate::rendering::framebuffer::rgb888_to_rgb565(self.colour)
    }
}
