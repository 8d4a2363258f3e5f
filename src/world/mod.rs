/// World model: immutable triangle meshes shared with the raster worker, and
/// per-frame chunk grids owned by the world loop.
pub mod chooser;
pub mod chunk;
pub mod terrain;

pub use chooser::{pick_indexed, ChunkChooser, ChunkPick};
pub use chunk::ChunkGrid;

use std::sync::Arc;
use std::time::Duration;

use glam::{Vec2, Vec3};

use crate::rendering::texture::Texture;

/// Palette entry
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Roughness byte in the top 8 bits, RGB below. For textured entries the
    /// RGB is the texture's average colour.
    pub rgb888: u32,
    pub texture: Option<Arc<Texture>>,
    /// Gameplay event raised when the viewer runs into a face using this entry
    pub event: u32,
}

impl Material {
    pub fn plain(rgb888: u32) -> Self {
        Self {
            rgb888,
            texture: None,
            event: 0,
        }
    }

    pub fn textured(texture: Arc<Texture>, roughness: u8) -> Self {
        Self {
            rgb888: ((roughness as u32) << 24) | texture.average_rgb(),
            texture: Some(texture),
            event: 0,
        }
    }

    pub fn with_event(mut self, event: u32) -> Self {
        self.event = event;
        self
    }
}

/// Index into `World::meshes`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Geometry and materials of one layout frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    /// 3 per face
    pub indices: Vec<u16>,
    pub uvs: Vec<Vec2>,
    /// 3 per face, independent of `indices`
    pub uv_indices: Vec<u16>,
    /// Palette entry per face
    pub attributes: Vec<u16>,
    pub materials: Vec<Material>,
}

impl Mesh {
    #[inline]
    pub fn face_count(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn face_vertices(&self, face: usize) -> [Vec3; 3] {
        let i = face * 3;
        [
            self.vertices[self.indices[i] as usize],
            self.vertices[self.indices[i + 1] as usize],
            self.vertices[self.indices[i + 2] as usize],
        ]
    }

    #[inline]
    pub fn face_uvs(&self, face: usize) -> [Vec2; 3] {
        let i = face * 3;
        [
            self.uvs[self.uv_indices[i] as usize],
            self.uvs[self.uv_indices[i + 1] as usize],
            self.uvs[self.uv_indices[i + 2] as usize],
        ]
    }

    #[inline]
    pub fn material(&self, face: usize) -> &Material {
        &self.materials[self.attributes[face] as usize]
    }
}

/// One animation frame of a layer
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutFrame {
    pub mesh: MeshId,
    pub chunks: ChunkGrid,
}

/// Overlaid layout with one or more animation frames
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub frames: Vec<LayoutFrame>,
}

impl Layer {
    /// Frame shown at `elapsed`, advancing every `period`
    pub fn frame_index(&self, elapsed: Duration, period: Duration) -> usize {
        if self.frames.len() <= 1 || period.is_zero() {
            return 0;
        }
        ((elapsed.as_millis() / period.as_millis().max(1)) % self.frames.len() as u128) as usize
    }
}

#[derive(Clone, Debug)]
pub struct World {
    meshes: Arc<[Mesh]>,
    pub layers: Vec<Layer>,
    pub start_eye: Vec3,
    pub start_direction: Vec3,
}

impl World {
    pub fn new(meshes: Vec<Mesh>, layers: Vec<Layer>, start_eye: Vec3, start_direction: Vec3) -> Self {
        Self {
            meshes: meshes.into(),
            layers,
            start_eye,
            start_direction,
        }
    }

    /// Shared handle for the raster worker
    pub fn meshes(&self) -> &Arc<[Mesh]> {
        &self.meshes
    }

    #[inline]
    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0 as usize]
    }

    /// Height of the ground under `eye`: the highest face of the base layer's
    /// eye chunk that lies below the eye. None if no face is under the eye.
    pub fn spot_height(&self, eye: Vec3) -> Option<f32> {
        let frame = self.layers.first()?.frames.first()?;
        let chunk = frame.chunks.chunk_at(eye)?;
        let mesh = self.mesh(frame.mesh);

        let mut best: Option<f32> = None;
        for &face in frame.chunks.faces(chunk) {
            let [v0, v1, v2] = mesh.face_vertices(face as usize);
            let Some(height) = height_under(v0, v1, v2, eye) else {
                continue;
            };
            if height < eye.y {
                best = Some(best.map_or(height, |b| b.max(height)));
            }
        }
        best
    }

    /// Drop every chunk reference to faces whose material carries `event`,
    /// across all layers and frames. Returns the number of entries removed.
    pub fn delete_faces_with_event(&mut self, event: u32) -> usize {
        let meshes = Arc::clone(&self.meshes);
        let mut removed = 0;
        for layer in &mut self.layers {
            for frame in &mut layer.frames {
                let mesh = &meshes[frame.mesh.0 as usize];
                removed += frame
                    .chunks
                    .remove_faces_where(|face| mesh.material(face as usize).event == event);
            }
        }
        if removed > 0 {
            log::info!("removed {} face entries tagged {:#010x}", removed, event);
        }
        removed
    }

    pub fn face_entries(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| l.frames.iter())
            .map(|f| f.chunks.total_entries())
            .sum()
    }
}

/// Edge function in the XZ plane
#[inline]
fn edge_xz(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.z - a.z) - (p.z - a.z) * (b.x - a.x)
}

#[inline]
fn tie_break(edge: Vec3, w: f32) -> bool {
    if w == 0.0 {
        (edge.y == 0.0 && edge.x > 0.0) || edge.y > 0.0
    } else {
        w > 0.0
    }
}

/// Interpolated y of the triangle at the eye's XZ position, if the eye is
/// over it.
fn height_under(v0: Vec3, v1: Vec3, v2: Vec3, eye: Vec3) -> Option<f32> {
    let w0 = edge_xz(v1, v2, eye);
    let w1 = edge_xz(v2, v0, eye);
    let w2 = edge_xz(v0, v1, eye);
    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
        return None;
    }
    if !(tie_break(v2 - v1, w0) && tie_break(v0 - v2, w1) && tie_break(v1 - v0, w2)) {
        return None;
    }
    let area = edge_xz(v0, v1, v2);
    if area == 0.0 {
        return None;
    }
    Some((w0 * v0.y + w1 * v1.y + w2 * v2.y) / area)
}
