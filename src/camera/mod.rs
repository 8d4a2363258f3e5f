/// Camera for the chunked world: eye position plus a view direction.
/// Builds the right-handed view matrix and a GL-convention projection.
use glam::{Mat4, Vec3};

use crate::geometry::Viewport;

pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub direction: Vec3,
    pub fov: f32, // vertical, radians
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(eye: Vec3, direction: Vec3, aspect_ratio: f32) -> Self {
        Self {
            eye,
            direction: direction.normalize_or_zero(),
            fov: DEFAULT_FOV_DEGREES.to_radians(),
            near: NEAR_PLANE,
            far: FAR_PLANE,
            aspect_ratio,
        }
    }

    pub fn for_viewport(eye: Vec3, direction: Vec3, viewport: &Viewport) -> Self {
        Self::new(eye, direction, viewport.aspect_ratio())
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.direction, Vec3::Y)
    }

    /// Get projection matrix.
    /// Clip z runs from -w at the near plane to +w at the far plane; the clip
    /// classifier treats z < 0 as outside.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Rotate the view direction about +Y by `angle` radians.
    pub fn turn(&mut self, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        let d = self.direction;
        self.direction = Vec3::new(d.x * cos - d.z * sin, d.y, d.x * sin + d.z * cos);
    }

    /// Move the eye in the horizontal plane only; height comes from the ground.
    pub fn step_horizontal(&mut self, step: Vec3) {
        self.eye.x += step.x;
        self.eye.z += step.z;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

/// Button state sampled once per frame
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub forward_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
}

impl Controls {
    pub const fn idle() -> Self {
        Self {
            forward_pressed: false,
            left_pressed: false,
            right_pressed: false,
        }
    }

    pub const fn forward() -> Self {
        Self {
            forward_pressed: true,
            left_pressed: false,
            right_pressed: false,
        }
    }

    #[inline]
    pub fn any_pressed(&self) -> bool {
        self.forward_pressed || self.left_pressed || self.right_pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn point_ahead_lands_inside_clip_volume() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 1.0);
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, -10.0, 1.0);

        assert!(clip.w > 0.0, "w should be positive in front of the eye");
        assert!(clip.z >= 0.0 && clip.z <= clip.w, "z should be inside [0, w]");
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
    }

    #[test]
    fn point_behind_is_rejected_by_near_plane() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 1.0);
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert!(clip.z < 0.0, "point behind the eye must have negative clip z");
    }

    #[test]
    fn quarter_turn_rotates_direction_in_xz() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 1.0);
        camera.turn(std::f32::consts::FRAC_PI_2);
        assert!((camera.direction - Vec3::X).length() < 1e-5, "got {:?}", camera.direction);
    }

    #[test]
    fn horizontal_step_ignores_y() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::NEG_Z, 1.0);
        camera.step_horizontal(Vec3::new(1.0, 5.0, -1.0));
        assert_eq!(camera.eye, Vec3::new(2.0, 2.0, 2.0));
    }
}
