//! Coverage and ordering properties of triangle setup and rasterization
use chunk_raster::camera::Camera;
use chunk_raster::geometry::{Rect, Viewport};
use chunk_raster::rendering::clip::{classify, ClipOutcome};
use chunk_raster::rendering::fog::Fog;
use chunk_raster::rendering::framebuffer::{DepthBuffer, PixelBuffer, RasterTarget};
use chunk_raster::rendering::queue::{Generation, QueueKind, QueuePair};
use chunk_raster::rendering::{Rasterizer, RenderRecord, Shade, ShadingConfig, TriangleSetup};
use chunk_raster::world::{Material, Mesh, MeshId};
use glam::{Mat3, Vec2, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const W: usize = 64;
const H: usize = 64;

fn palette_mesh(colours: &[u32]) -> Mesh {
    Mesh {
        vertices: vec![Vec3::ZERO; 3],
        indices: colours.iter().flat_map(|_| [0u16, 1, 2]).collect(),
        uvs: vec![Vec2::ZERO],
        uv_indices: vec![0; colours.len() * 3],
        attributes: (0..colours.len() as u16).collect(),
        materials: colours.iter().map(|&c| Material::plain(c)).collect(),
    }
}

fn raster_record(face: u32, points: [(f32, f32); 3], z: f32) -> Option<RenderRecord> {
    let raster = points.map(|(x, y)| Vec4::new(x, y, z, 1.0));
    let (min_x, max_x) = points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (min_y, max_y) = points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let bbox = Rect::new(
        min_x.floor().max(0.0),
        min_y.floor().max(0.0),
        max_x.ceil().min(W as f32),
        max_y.ceil().min(H as f32),
    );
    RenderRecord::from_raster(MeshId(0), face, &raster, Shade::UNLIT).map(|r| r.with_bbox(bbox))
}

fn coverage(records: &[RenderRecord], mesh: &Mesh) -> (PixelBuffer, DepthBuffer) {
    let mut pixels = PixelBuffer::new(W, H);
    let mut depth = DepthBuffer::new(W, H, 100.0);
    let rasterizer = Rasterizer::new();
    {
        let mut target = RasterTarget::new(&mut pixels, &mut depth);
        for record in records {
            rasterizer.rasterize_edge_checked(record, mesh, &mut target);
        }
    }
    (pixels, depth)
}

#[test]
fn shared_edge_pixels_belong_to_exactly_one_triangle() {
    let mesh = palette_mesh(&[0xFFFFFF, 0xFFFFFF]);
    let t1 = raster_record(0, [(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 1.0).expect("front facing");
    let t2 = raster_record(1, [(16.0, 0.0), (0.0, 16.0), (16.0, 16.0)], 1.0).expect("front facing");

    let (only_t1, _) = coverage(&[t1], &mesh);
    let (only_t2, _) = coverage(&[t2], &mesh);
    let (both, _) = coverage(&[t1, t2], &mesh);

    let lit = |p: &PixelBuffer| p.count_not(0);
    assert_eq!(lit(&only_t1) + lit(&only_t2), 256, "pixels double-counted or dropped");
    assert_eq!(lit(&both), 256);
    for y in 0..16 {
        for x in 0..16 {
            let a = only_t1.get(x, y).unwrap_or(0) != 0;
            let b = only_t2.get(x, y).unwrap_or(0) != 0;
            assert!(a ^ b, "pixel ({}, {}) claimed by {} triangles", x, y, a as u8 + b as u8);
        }
    }
}

#[test]
fn final_image_does_not_depend_on_submission_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xD3A7);
    let colours: Vec<u32> = (0..24).map(|_| rng.gen_range(0x10_10_10..0xFF_FF_FF)).collect();
    let mesh = palette_mesh(&colours);

    let mut records = Vec::new();
    for face in 0..colours.len() as u32 {
        let mut points = [(0.0f32, 0.0f32); 3];
        for p in &mut points {
            *p = (rng.gen_range(-8.0..72.0), rng.gen_range(-8.0..72.0));
        }
        // Distinct depths: exact ties are the only order-dependent case
        let z = 1.0 + face as f32 * 0.5 + rng.gen_range(0.0..0.25);
        let rec = raster_record(face, points, z).or_else(|| {
            points.swap(1, 2);
            raster_record(face, points, z)
        });
        records.extend(rec);
    }
    assert!(records.len() > 16, "too many degenerate triangles");

    let (forward, forward_depth) = coverage(&records, &mesh);
    let mut shuffled = records.clone();
    for i in (1..shuffled.len()).rev() {
        shuffled.swap(i, rng.gen_range(0..=i));
    }
    let (reordered, reordered_depth) = coverage(&shuffled, &mesh);

    assert_eq!(forward.pixels, reordered.pixels);
    assert_eq!(forward_depth.depth, reordered_depth.depth);
    assert!(forward.count_not(0) > 0);
}

#[test]
fn back_faces_never_reach_a_queue() {
    let a = Vec3::new(-1.0, -1.0, -5.0);
    let b = Vec3::new(1.0, -1.0, -5.0);
    let c = Vec3::new(0.0, 1.0, -5.0);
    let mesh = Mesh {
        vertices: vec![a, b, c],
        // Face 0 winds towards the eye, face 1 away from it
        indices: vec![0, 1, 2, 0, 2, 1],
        uvs: vec![Vec2::ZERO],
        uv_indices: vec![0; 6],
        attributes: vec![0, 0],
        materials: vec![Material::plain(0x808080)],
    };
    let viewport = Viewport::new(W, H);
    let camera = Camera::for_viewport(Vec3::ZERO, Vec3::NEG_Z, &viewport);
    let setup = TriangleSetup::new(&camera, viewport, ShadingConfig::default());
    let mut queues = QueuePair::new(Generation::A, 8, 8);

    let front = setup.setup_face(MeshId(0), &mesh, 0, &mut queues).expect("room");
    assert_eq!(queues.len(), 1);
    assert!(front > 0);
    assert_eq!(queues.queue(QueueKind::EdgeChecked).len(), 1);

    let back = setup.setup_face(MeshId(0), &mesh, 1, &mut queues).expect("room");
    assert_eq!(back, 0);
    assert_eq!(queues.len(), 1);
}

#[test]
fn queues_reset_and_refill_without_reallocating() {
    let rec = raster_record(0, [(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 1.0).expect("front facing");
    let mut queues = QueuePair::new(Generation::B, 2, 2);

    assert_eq!(queues.push(QueueKind::Covered, rec).expect("room"), 256);
    assert_eq!(queues.push(QueueKind::Covered, rec).expect("room"), 256);
    let full = queues.push(QueueKind::Covered, rec).unwrap_err();
    assert_eq!(full.kind, QueueKind::Covered);
    assert_eq!(full.capacity, 2);

    queues.reset();
    assert!(queues.is_empty());
    queues.push(QueueKind::Covered, rec).expect("room after reset");
    assert_eq!(queues.covered.as_slice(), &[rec]);
    assert_eq!(queues.covered.capacity(), 2);
}

#[test]
fn fog_ramps_between_start_and_end() {
    let fog = Fog::default();
    assert_eq!(fog.factor(5.0), 1.0);
    assert!((fog.factor(17.5) - 0.5).abs() < 1e-6);
    assert_eq!(fog.factor(30.0), 0.0);
    assert_eq!(fog.factor(1.0), 1.0);
    assert_eq!(fog.factor(80.0), 0.0);

    assert_eq!(fog.blend_rgb565(0xFFFFFF, 5.0), 0xFFFF);
    // Fully fogged: 0x30 * 255 per channel
    assert_eq!(fog.blend_rgb565(0xFFFFFF, 30.0), 0x2965);
}

#[test]
fn record_interpolates_plane_through_vertices() {
    let raster = [
        Vec4::new(10.0, 4.0, 2.0, 2.0),
        Vec4::new(4.0, 30.0, 3.0, 3.0),
        Vec4::new(40.0, 12.0, 5.0, 4.0),
    ];
    let rec = RenderRecord::from_raster(MeshId(0), 0, &raster, Shade::UNLIT)
        .or_else(|| RenderRecord::from_raster(MeshId(0), 0, &[raster[0], raster[2], raster[1]], Shade::UNLIT))
        .expect("one winding is front facing");
    let m = Mat3::from_cols(
        Vec3::new(raster[0].x, raster[0].y, raster[0].w),
        Vec3::new(raster[1].x, raster[1].y, raster[1].w),
        Vec3::new(raster[2].x, raster[2].y, raster[2].w),
    );
    // At each vertex 1/w evaluates to 1/w_i
    for col in 0..3 {
        let v = m.col(col);
        let p = Vec3::new(v.x / v.z, v.y / v.z, 1.0);
        assert!((rec.one_over_w.dot(p) - 1.0 / v.z).abs() < 1e-4);
    }
}

fn inside_volume(v: Vec4) -> bool {
    v.x >= -v.w && v.x <= v.w && v.y >= -v.w && v.y <= v.w && v.z >= 0.0 && v.z <= v.w
}

/// Planes in the same order as the classifier: left, right, bottom, top, near, far
fn outside_plane(v: Vec4, plane: usize) -> bool {
    match plane {
        0 => v.x < -v.w,
        1 => v.x > v.w,
        2 => v.y < -v.w,
        3 => v.y > v.w,
        4 => v.z < 0.0,
        _ => v.z > v.w,
    }
}

#[test]
fn clip_outcomes_match_their_definitions_for_random_triangles() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xC11F);
    let viewport = Viewport::new(W, H);
    let (mut accepted, mut rejected, mut straddling) = (0, 0, 0);

    for _ in 0..4000 {
        let clip: [Vec4; 3] = std::array::from_fn(|_| {
            // Mostly in front of the eye, sometimes behind it
            let w: f32 = if rng.gen_bool(0.85) {
                rng.gen_range(0.2..4.0)
            } else {
                rng.gen_range(-3.0..-0.1)
            };
            let spread = w.abs() * 1.3;
            Vec4::new(
                rng.gen_range(-spread..spread),
                rng.gen_range(-spread..spread),
                rng.gen_range(-0.15 * w.abs()..1.15 * w.abs()),
                w,
            )
        });
        let shared_outside = (0..6).any(|plane| clip.iter().all(|&v| outside_plane(v, plane)));

        match classify(&clip, &viewport) {
            ClipOutcome::Accept(bbox) => {
                accepted += 1;
                assert!(clip.iter().all(|&v| v.w > 0.0 && inside_volume(v)), "accepted {:?}", clip);
                assert!(bbox.min_x >= 0.0 && bbox.min_y >= 0.0);
                assert!(bbox.max_x <= W as f32 - 1.0 && bbox.max_y <= H as f32 - 1.0);
                for v in clip {
                    let x = (W as f32 * (v.x + v.w) / (2.0 * v.w)).min(W as f32 - 1.0);
                    let y = (H as f32 * (v.w - v.y) / (2.0 * v.w)).min(H as f32 - 1.0);
                    assert!(x >= bbox.min_x - 1e-3 && x <= bbox.max_x + 1e-3, "x {} outside {:?}", x, bbox);
                    assert!(y >= bbox.min_y - 1e-3 && y <= bbox.max_y + 1e-3, "y {} outside {:?}", y, bbox);
                }
            }
            ClipOutcome::Reject => {
                rejected += 1;
                assert!(shared_outside, "rejected without a shared plane: {:?}", clip);
            }
            ClipOutcome::MustClip(rect) => {
                straddling += 1;
                assert!(!shared_outside, "shared plane should reject: {:?}", clip);
                assert!(!clip.iter().all(|&v| inside_volume(v)), "fully inside should accept: {:?}", clip);
                assert_eq!(rect, viewport.full_rect());
            }
        }
    }
    assert!(accepted > 20 && rejected > 20 && straddling > 20, "{} {} {}", accepted, rejected, straddling);
}
