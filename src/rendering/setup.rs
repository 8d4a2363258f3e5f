/// Triangle setup: clip-space transform, backface cull, edge functions and
/// tile classification. Produces render records for the queues.
///
/// Works in 2D homogeneous raster space: the 3x3 matrix of vertex (x, y, w)
/// columns is inverted once per triangle, and its rows are the three edge
/// functions. Their sum interpolates 1/w, so no perspective divide is needed
/// and vertices behind the eye still rasterize correctly.
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::camera::Camera;
use crate::error::QueueFull;
use crate::geometry::{Rect, Viewport};
use crate::rendering::clip::{classify, ClipOutcome};
use crate::rendering::queue::{QueueKind, QueuePair};
use crate::rendering::shading::{roughness_of, Shade, ShadingConfig};
use crate::world::{ChunkGrid, Mesh, MeshId};
use crate::count_call;

/// Tile edge in pixels
pub const TILE_SIZE: u32 = 8;

/// Everything the rasterizer and hit-tester need about one triangle (or one
/// tile of it), computed once during setup.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RenderRecord {
    pub mesh: MeshId,
    pub face: u32,
    pub clip_z: Vec3,
    pub bbox: Rect,
    pub inv_m: Mat3,
    /// Interpolates 1/w across the screen
    pub one_over_w: Vec3,
    /// Interpolates z/w across the screen
    pub z_over_w: Vec3,
    pub shade: Shade,
}

impl RenderRecord {
    /// Build from raster-space vertices `(x, y, z, w)` as produced by
    /// `Viewport::to_raster`. Returns None for back-facing or degenerate
    /// triangles (determinant not negative).
    pub fn from_raster(mesh: MeshId, face: u32, raster: &[Vec4; 3], shade: Shade) -> Option<Self> {
        let m = Mat3::from_cols(
            Vec3::new(raster[0].x, raster[0].y, raster[0].w),
            Vec3::new(raster[1].x, raster[1].y, raster[1].w),
            Vec3::new(raster[2].x, raster[2].y, raster[2].w),
        );
        let det = m.determinant();
        if !(det < 0.0) {
            return None;
        }

        let inv_m = m.inverse();
        let clip_z = Vec3::new(raster[0].z, raster[1].z, raster[2].z);
        Some(Self {
            mesh,
            face,
            clip_z,
            bbox: Rect::default(),
            inv_m,
            one_over_w: inv_m.row(0) + inv_m.row(1) + inv_m.row(2),
            z_over_w: inv_m.transpose() * clip_z,
            shade,
        })
    }

    /// Edge function `i` as (a, b, c): `a*x + b*y + c`
    #[inline(always)]
    pub fn edge(&self, i: usize) -> Vec3 {
        self.inv_m.row(i)
    }

    /// Interpolation vector for a per-vertex scalar attribute, evaluated like
    /// an edge function and divided by 1/w per pixel.
    #[inline]
    pub fn attribute_vector(&self, values: Vec3) -> Vec3 {
        self.inv_m.transpose() * values
    }

    /// U and V interpolation vectors for a face's texture coordinates
    #[inline]
    pub fn uv_vectors(&self, uvs: &[Vec2; 3]) -> (Vec3, Vec3) {
        (
            self.attribute_vector(Vec3::new(uvs[0].x, uvs[1].x, uvs[2].x)),
            self.attribute_vector(Vec3::new(uvs[0].y, uvs[1].y, uvs[2].y)),
        )
    }

    #[inline]
    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = bbox;
        self
    }

    #[inline]
    pub fn with_shade(mut self, shade: Shade) -> Self {
        self.shade = shade;
        self
    }
}

/// Per-frame setup state: one camera, one viewport, one lighting model.
pub struct TriangleSetup {
    pub viewport: Viewport,
    pub shading: ShadingConfig,
    view_proj: Mat4,
    eye: Vec3,
}

impl TriangleSetup {
    pub fn new(camera: &Camera, viewport: Viewport, shading: ShadingConfig) -> Self {
        Self {
            viewport,
            shading,
            view_proj: camera.view_projection_matrix(),
            eye: camera.eye,
        }
    }

    /// Set up every face listed in one chunk. Unknown or empty chunks are
    /// zero work. Returns the pixel workload estimate.
    pub fn setup_chunk(
        &self,
        mesh_id: MeshId,
        mesh: &Mesh,
        chunks: &ChunkGrid,
        chunk: usize,
        queues: &mut QueuePair,
    ) -> Result<u32, QueueFull> {
        let mut pixels = 0u32;
        for &face in chunks.faces(chunk) {
            pixels = pixels.saturating_add(self.setup_face(mesh_id, mesh, face as usize, queues)?);
        }
        Ok(pixels)
    }

    /// Transform, cull, shade, classify and enqueue one face. Back faces are
    /// dropped before any lighting work.
    pub fn setup_face(
        &self,
        mesh_id: MeshId,
        mesh: &Mesh,
        face: usize,
        queues: &mut QueuePair,
    ) -> Result<u32, QueueFull> {
        count_call!(triangles_submitted);

        let [v0, v1, v2] = mesh.face_vertices(face);
        let clip = [
            self.view_proj * v0.extend(1.0),
            self.view_proj * v1.extend(1.0),
            self.view_proj * v2.extend(1.0),
        ];
        let raster = [
            self.viewport.to_raster(clip[0]),
            self.viewport.to_raster(clip[1]),
            self.viewport.to_raster(clip[2]),
        ];

        let Some(record) = RenderRecord::from_raster(mesh_id, face as u32, &raster, Shade::default()) else {
            count_call!(triangles_culled);
            return Ok(0);
        };

        let roughness = roughness_of(mesh.material(face).rgb888);
        let record = record.with_shade(self.shading.face_shade(v0, v1, v2, self.eye, roughness));

        match classify(&clip, &self.viewport) {
            ClipOutcome::Reject => {
                count_call!(triangles_rejected);
                Ok(0)
            }
            ClipOutcome::Accept(bbox) => {
                count_call!(triangles_accepted);
                queues.push(QueueKind::EdgeChecked, record.with_bbox(bbox))
            }
            ClipOutcome::MustClip(rect) => {
                count_call!(triangles_must_clip);
                tile_triangle(&record, rect, &self.viewport, queues)
            }
        }
    }
}

/// Corner offsets within a tile: LL, LR, UL, UR
const TILE_CORNERS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(TILE_SIZE as f32, 0.0),
    Vec2::new(0.0, TILE_SIZE as f32),
    Vec2::new(TILE_SIZE as f32, TILE_SIZE as f32),
];

/// Corner where the edge function is largest; if it is negative there, the
/// whole tile is outside the edge.
#[inline]
fn reject_corner(edge: Vec3) -> usize {
    match (edge.x >= 0.0, edge.y >= 0.0) {
        (true, true) => 3,
        (false, true) => 2,
        (true, false) => 1,
        (false, false) => 0,
    }
}

/// Split a straddling triangle's box into tiles and queue the ones it touches.
pub fn tile_triangle(
    record: &RenderRecord,
    rect: Rect,
    viewport: &Viewport,
    queues: &mut QueuePair,
) -> Result<u32, QueueFull> {
    let tile = TILE_SIZE as f32;

    let mut edges = [record.edge(0), record.edge(1), record.edge(2)];
    for e in &mut edges {
        *e /= e.x.abs() + e.y.abs();
    }
    let reject = edges.map(|e| TILE_CORNERS[reject_corner(e)]);
    let accept = edges.map(|e| TILE_CORNERS[3 - reject_corner(e)]);

    let eval = |e: Vec3, corner: Vec2, origin: Vec2| -> f32 {
        e.z + e.x * (corner.x + origin.x) + e.y * (corner.y + origin.y)
    };

    let mut pixels = 0u32;
    let mut ty = 0u32;
    while (ty as f32) < rect.max_y / tile {
        let mut tx = 0u32;
        while (tx as f32) < rect.max_x / tile {
            let origin = Vec2::new((tx * TILE_SIZE) as f32, (ty * TILE_SIZE) as f32);
            tx += 1;

            let outside = (0..3).any(|i| eval(edges[i], reject[i], origin) < 0.0);
            if outside {
                count_call!(tiles_skipped);
                continue;
            }

            let bbox = Rect::new(
                origin.x,
                origin.y,
                (origin.x + tile).min(viewport.width as f32),
                (origin.y + tile).min(viewport.height as f32),
            );
            let covered = (0..3).all(|i| eval(edges[i], accept[i], origin) >= 0.0);
            if covered {
                count_call!(tiles_covered);
                queues.push(QueueKind::Covered, record.with_bbox(bbox))?;
                pixels = pixels.saturating_add(TILE_SIZE * TILE_SIZE);
            } else {
                count_call!(tiles_partial);
                pixels = pixels.saturating_add(queues.push(QueueKind::EdgeChecked, record.with_bbox(bbox))?);
            }
        }
        ty += 1;
    }
    Ok(pixels)
}
