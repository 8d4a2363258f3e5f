/// Viewer motion between frames: stepping, turning, collision slow-down, fall
/// damage and the adaptive pixel budget.
///
/// Everything here is plain arithmetic on frame time and the nearest depth
/// sample, so the world loop stays a sequence of calls.
use std::f32::consts::PI;

use glam::Vec3;

use crate::camera::{Camera, Controls};
use crate::events::EventCode;

#[derive(Clone, Debug)]
pub struct MotionConfig {
    /// World units per millisecond of frame time
    pub step_per_ms: f32,
    /// Radians per millisecond of frame time
    pub turn_per_ms: f32,
    /// Closest the viewer may get to a surface ahead
    pub collision_distance: f32,
    /// Step is scaled by `(nearest - collision_distance) * impact_slowdown`
    /// once something is inside the collision range
    pub impact_slowdown: f32,
    /// Height change per unit step below which the viewer counts as falling
    pub fall_rate: f32,
    /// Accumulated fall that hurts
    pub fall_damage: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_per_ms: 0.005,
            turn_per_ms: PI * 0.0003,
            collision_distance: 1.0,
            impact_slowdown: 0.2,
            fall_rate: -0.8,
            fall_damage: -1.0,
        }
    }
}

/// Pixel workload allowed per frame, steered towards a target frame time
#[derive(Clone, Debug, PartialEq)]
pub struct LodBudget {
    pub max_pixels: u32,
    pub floor: u32,
    pub ceiling: u32,
    pub target_ms: f32,
    /// Budget change per millisecond of slack
    pub gain: f32,
}

impl LodBudget {
    pub fn for_pixels(pixel_count: usize) -> Self {
        let pixels = pixel_count as u32;
        Self {
            max_pixels: 2 * pixels,
            floor: 2 * pixels,
            ceiling: 5 * pixels,
            target_ms: 99.0,
            gain: 100.0,
        }
    }

    /// Fold in the last frame's time and return the new budget
    pub fn update(&mut self, frame_ms: f32) -> u32 {
        let next = self.max_pixels as f32 + (self.target_ms - frame_ms) * self.gain;
        self.max_pixels = next.clamp(self.floor as f32, self.ceiling as f32) as u32;
        self.max_pixels
    }
}

/// Accumulates height lost while the viewer drops faster than the fall rate
#[derive(Clone, Debug, Default)]
pub struct FallTracker {
    fallen: f32,
}

impl FallTracker {
    /// `drop` is the change of ground height over a step of length
    /// `step_len`. Returns the damage event once a hard fall ends.
    pub fn update(&mut self, drop: f32, step_len: f32, config: &MotionConfig) -> Option<EventCode> {
        let rate = if step_len > 0.0 { drop / step_len } else { 0.0 };
        if rate < config.fall_rate {
            self.fallen += drop;
            return None;
        }
        let fallen = std::mem::take(&mut self.fallen);
        if fallen < config.fall_damage {
            let operand = fallen.round().clamp(i8::MIN as f32, -1.0) as i8;
            log::debug!("fell {:.2}, damage {}", fallen, operand);
            return Some(EventCode::energy(EventCode::CHANGE | EventCode::DISPLAY, operand));
        }
        None
    }

    pub fn fallen(&self) -> f32 {
        self.fallen
    }
}

/// What the controls ask for this frame, after collision adjustment
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MovePlan {
    /// Horizontal displacement of the eye
    pub step: Vec3,
    /// Rotation about +Y in radians
    pub turn: f32,
    /// Forward was pressed with a surface inside the collision range: look up
    /// what was hit
    pub impact: bool,
}

/// Work out this frame's motion from the controls and the nearest depth in
/// the collision window.
pub fn plan_move(
    controls: Controls,
    direction: Vec3,
    frame_ms: f32,
    nearest: f32,
    config: &MotionConfig,
) -> MovePlan {
    let mut plan = MovePlan::default();
    let mut step = direction * frame_ms * config.step_per_ms;

    if controls.forward_pressed {
        if nearest < config.collision_distance + step.length() {
            plan.impact = true;
            step *= (nearest - config.collision_distance) * config.impact_slowdown;
        }
        plan.step = step;
    }

    if controls.left_pressed || controls.right_pressed {
        if nearest < config.collision_distance {
            plan.step -= direction * (config.collision_distance - nearest);
        }
        let turn = config.turn_per_ms * frame_ms;
        if controls.left_pressed {
            plan.turn -= turn;
        }
        if controls.right_pressed {
            plan.turn += turn;
        }
    }
    plan
}

/// Apply a plan to the camera. Height is left to the ground follow.
pub fn apply_move(camera: &mut Camera, plan: &MovePlan) {
    camera.step_horizontal(plan.step);
    if plan.turn != 0.0 {
        camera.turn(plan.turn);
    }
}
