/// Trivial accept / reject against the six homogeneous clip planes.
/// No geometric clipping: straddling triangles are handed a full-screen box
/// and left to the tile classifier.
use glam::Vec4;

use crate::geometry::{Rect, Viewport};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClipOutcome {
    /// Entirely outside one plane
    Reject,
    /// Entirely inside; carries the clamped screen bounding box
    Accept(Rect),
    /// Crosses at least one plane; carries the full-screen box
    MustClip(Rect),
}

/// Per-plane "outside" tests, in the order left, right, bottom, top, near, far.
#[inline(always)]
fn outside(v: Vec4) -> [bool; 6] {
    [
        v.x < -v.w,
        v.x > v.w,
        v.y < -v.w,
        v.y > v.w,
        v.z < 0.0,
        v.z > v.w,
    ]
}

pub fn classify(clip: &[Vec4; 3], viewport: &Viewport) -> ClipOutcome {
    let o0 = outside(clip[0]);
    let o1 = outside(clip[1]);
    let o2 = outside(clip[2]);

    let mut all_inside = true;
    for plane in 0..6 {
        if o0[plane] && o1[plane] && o2[plane] {
            return ClipOutcome::Reject;
        }
        all_inside &= !(o0[plane] || o1[plane] || o2[plane]);
    }

    if all_inside {
        ClipOutcome::Accept(bounding_box(clip, viewport))
    } else {
        ClipOutcome::MustClip(viewport.full_rect())
    }
}

/// Screen-space box of a triangle whose vertices all have w > 0, clamped to
/// `[0, W-1] x [0, H-1]`.
fn bounding_box(clip: &[Vec4; 3], viewport: &Viewport) -> Rect {
    let width = viewport.width as f32;
    let height = viewport.height as f32;

    let mut rect = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for v in clip {
        let x = width * (v.x + v.w) / (2.0 * v.w);
        let y = height * (v.w - v.y) / (2.0 * v.w);
        rect.min_x = rect.min_x.min(x);
        rect.max_x = rect.max_x.max(x);
        rect.min_y = rect.min_y.min(y);
        rect.max_y = rect.max_y.max(y);
    }

    rect.min_x = rect.min_x.max(0.0);
    rect.max_x = rect.max_x.min(width - 1.0);
    rect.min_y = rect.min_y.max(0.0);
    rect.max_y = rect.max_y.min(height - 1.0);
    rect
}
