/// Per-face lighting: one Lambert term and one specular term per triangle,
/// quantized to bytes so the raster loop only does integer multiplies.
use glam::Vec3;

use crate::count_call;

/// Diffuse and specular intensities for one face, each in 0..=255
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Shade {
    pub lamb: u8,
    pub spec: u8,
}

impl Shade {
    /// Full diffuse, no highlight. Leaves a colour (almost) untouched.
    pub const UNLIT: Shade = Shade { lamb: 255, spec: 0 };

    /// Apply to a 0x??RRGGBB colour: `((lamb * c) >> 8) + spec` per channel.
    /// The top byte (roughness) is dropped.
    #[inline]
    pub fn apply(&self, rgb888: u32) -> u32 {
        let lamb = self.lamb as u32;
        let spec = self.spec as u32;
        let channel = |c: u32| (((lamb * c) >> 8) + spec).min(255);

        let r = channel((rgb888 >> 16) & 0xFF);
        let g = channel((rgb888 >> 8) & 0xFF);
        let b = channel(rgb888 & 0xFF);
        (r << 16) | (g << 8) | b
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ShadingConfig {
    /// Direction light travels (world space, unit length)
    pub incident_light: Vec3,
    /// Specular fraction left when the half vector misses the normal entirely
    pub specular_floor: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            incident_light: Vec3::new(0.548821, -0.329293, 0.768350).normalize(),
            specular_floor: 0.1,
        }
    }
}

impl ShadingConfig {
    /// Shade a triangle from its object-space vertices.
    /// `roughness` is the palette byte scaled to 0..1.
    pub fn face_shade(&self, v0: Vec3, v1: Vec3, v2: Vec3, eye: Vec3, roughness: f32) -> Shade {
        count_call!(faces_shaded);
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        let light = self.incident_light;

        let lambertian = normal.dot(light).clamp(0.0, 1.0);

        let centroid = (v0 + v1 + v2) / 3.0;
        // Light sign reversed relative to the textbook half vector
        let half = ((eye - centroid).normalize_or_zero() - light).normalize_or_zero();
        let s = normal.dot(half).clamp(0.0, 1.0);
        let shine = s * s * s * s * s * s;

        let ns = roughness * 0.5;
        let diffuse = (1.0 - ns) * 0.5 + lambertian * 0.5;
        let specular = ns * (self.specular_floor + shine * (1.0 - self.specular_floor));

        Shade {
            lamb: quantize(diffuse),
            spec: quantize(specular),
        }
    }
}

#[inline]
fn quantize(x: f32) -> u8 {
    (256.0 * x).clamp(0.0, 255.0) as u8
}

/// Roughness byte stored in the top of a palette colour, scaled to 0..1
#[inline]
pub fn roughness_of(rgb888: u32) -> f32 {
    (rgb888 >> 24) as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_apply_scales_and_saturates() {
        let shade = Shade { lamb: 128, spec: 0 };
        assert_eq!(shade.apply(0xFF_80_40_20), 0x40_20_10);

        let hot = Shade { lamb: 255, spec: 200 };
        assert_eq!(hot.apply(0x00_FF_FF_FF) & 0xFF, 255, "channel must saturate");
    }

    #[test]
    fn smooth_surface_has_no_specular() {
        let cfg = ShadingConfig::default();
        let shade = cfg.face_shade(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Z,
            Vec3::new(0.0, 5.0, 0.0),
            0.0,
        );
        assert_eq!(shade.spec, 0);
        // diffuse floor alone is 0.5 -> 128
        assert!(shade.lamb >= 128);
    }
}
