//! Procedural demo world: a Perlin height field with scattered pillars and a
//! bobbing marker, emitted as world and texture blobs so it goes through the
//! same loader as any other asset.
use glam::{Vec2, Vec3};
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{ChunkGrid, World};
use crate::asset::{load_world, FrameData, PaletteEntry, TextureBlobBuilder, WorldBlobBuilder};
use crate::error::AssetError;
use crate::events::EventCode;
use crate::rendering::texture::Texture;

const GRASS: u16 = 0;
const ROCK: u16 = 1;
const SNOW: u16 = 2;
const CRYSTAL: u16 = 3;
const EMBER: u16 = 4;
const MARKER: u16 = 5;

#[derive(Clone, Debug)]
pub struct TerrainConfig {
    /// Cells per side; each cell is one world unit
    pub size: u32,
    /// Cells per chunk side
    pub chunk_size: u32,
    pub seed: u32,
    pub amplitude: f32,
    pub frequency: f64,
    pub pillars: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 48,
            chunk_size: 4,
            seed: 12345,
            amplitude: 3.0,
            frequency: 0.06,
            pillars: 16,
        }
    }
}

impl TerrainConfig {
    /// Keeps vertex and face counts inside u16 indices and the size a whole
    /// number of chunks.
    fn normalized(&self) -> Self {
        let chunk_size = self.chunk_size.clamp(1, 32);
        let size = self.size.clamp(chunk_size.max(4), 128);
        let size = size - size % chunk_size;
        Self {
            size,
            chunk_size,
            pillars: self.pillars.min(512),
            ..self.clone()
        }
    }
}

/// Sampled heights on the `(size + 1)^2` vertex lattice
struct HeightField {
    size: u32,
    heights: Vec<f32>,
}

impl HeightField {
    fn generate(config: &TerrainConfig) -> Self {
        let perlin = Perlin::new(config.seed);
        let n = config.size + 1;
        let mut heights = Vec::with_capacity((n * n) as usize);
        for z in 0..n {
            for x in 0..n {
                let sample = perlin.get([x as f64 * config.frequency, z as f64 * config.frequency]);
                heights.push(sample as f32 * config.amplitude);
            }
        }
        Self {
            size: config.size,
            heights,
        }
    }

    #[inline]
    fn at(&self, x: u32, z: u32) -> f32 {
        self.heights[(z * (self.size + 1) + x) as usize]
    }

    fn vertex(&self, x: u32, z: u32) -> Vec3 {
        Vec3::new(x as f32, self.at(x, z), z as f32)
    }
}

/// Accumulates faces of one frame mesh and registers them with chunks
struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<u16>,
    uv_indices: Vec<u16>,
    attributes: Vec<u16>,
    chunks: ChunkGrid,
}

impl MeshBuilder {
    fn new(chunks: ChunkGrid) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            uv_indices: Vec::new(),
            attributes: Vec::new(),
            chunks,
        }
    }

    /// Shares the height field lattice between ground quads. Must be called
    /// before any other vertices are added.
    fn lattice(&mut self, field: &HeightField) {
        debug_assert!(self.vertices.is_empty());
        for z in 0..=field.size {
            for x in 0..=field.size {
                self.vertices.push(field.vertex(x, z));
            }
        }
    }

    fn ground_cell(&mut self, field: &HeightField, x: u32, z: u32, material: u16) {
        let at = |x: u32, z: u32| (z * (field.size + 1) + x) as u16;
        let corners = [at(x, z + 1), at(x + 1, z + 1), at(x + 1, z), at(x, z)];
        self.quad_indexed(corners, material);
    }

    /// Quad `a b c d` going round the face; `(b - a) x (d - a)` is the
    /// outward normal.
    fn quad(&mut self, corners: [Vec3; 4], material: u16) {
        let base = self.vertices.len() as u16;
        self.vertices.extend_from_slice(&corners);
        self.quad_indexed([base, base + 1, base + 2, base + 3], material);
    }

    /// Two faces `a b d` and `b c d`, listed in every chunk the quad's
    /// footprint touches
    fn quad_indexed(&mut self, corners: [u16; 4], material: u16) {
        let points = corners.map(|i| self.vertices[i as usize]);
        // Quad UV corners live at 0..4 in the shared uv table
        for tri in [[0, 1, 3], [1, 2, 3]] {
            let face = self.attributes.len() as u16;
            self.indices.extend(tri.iter().map(|&i| corners[i]));
            self.uv_indices.extend(tri.iter().map(|&i| i as u16));
            self.attributes.push(material);
            self.register(face, &points);
        }
    }

    fn register(&mut self, face: u16, corners: &[Vec3; 4]) {
        let (mut lo, mut hi) = (corners[0], corners[0]);
        for c in corners {
            lo = lo.min(*c);
            hi = hi.max(*c);
        }
        // Shrink so faces on a chunk boundary land on one side only
        let eps = 1e-3;
        let first = self.chunks.chunk_coords(lo + Vec3::splat(eps));
        let last = self.chunks.chunk_coords(hi - Vec3::splat(eps));
        for cz in first.y..=last.y {
            for cx in first.x..=last.x {
                if let Some(index) = self.chunks.index_of(glam::IVec2::new(cx, cz)) {
                    self.chunks.push_face(index, face);
                }
            }
        }
    }

    fn axis_box(&mut self, lo: Vec3, hi: Vec3, side: u16, top: u16) {
        let (x0, y0, z0) = (lo.x, lo.y, lo.z);
        let (x1, y1, z1) = (hi.x, hi.y, hi.z);
        let v = Vec3::new;
        self.quad([v(x0, y1, z1), v(x1, y1, z1), v(x1, y1, z0), v(x0, y1, z0)], top);
        self.quad([v(x1, y0, z1), v(x1, y0, z0), v(x1, y1, z0), v(x1, y1, z1)], side);
        self.quad([v(x0, y0, z0), v(x0, y0, z1), v(x0, y1, z1), v(x0, y1, z0)], side);
        self.quad([v(x0, y0, z1), v(x1, y0, z1), v(x1, y1, z1), v(x0, y1, z1)], side);
        self.quad([v(x1, y0, z0), v(x0, y0, z0), v(x0, y1, z0), v(x1, y1, z0)], side);
    }

    fn finish(self, palette: Vec<PaletteEntry>) -> FrameData {
        FrameData {
            vertices: self.vertices,
            indices: self.indices,
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            uv_indices: self.uv_indices,
            attributes: self.attributes,
            palette,
            chunks: self.chunks,
        }
    }
}

fn palette(rock_texture: Option<u32>) -> Vec<PaletteEntry> {
    let rock = match rock_texture {
        Some(offset) => PaletteEntry::Texture {
            roughness: 0x60,
            offset,
            event: 0,
        },
        None => PaletteEntry::Plain {
            rgb888: 0x60_5C_58_52,
            event: 0,
        },
    };
    vec![
        PaletteEntry::Plain {
            rgb888: 0x20_4C_8C_3C,
            event: 0,
        },
        rock,
        PaletteEntry::Plain {
            rgb888: 0x10_E0_E0_E8,
            event: 0,
        },
        PaletteEntry::Plain {
            rgb888: 0xC0_40_C0_FF,
            event: EventCode::delete_faces(1).0,
        },
        PaletteEntry::Plain {
            rgb888: 0x40_D0_40_20,
            event: EventCode::energy(EventCode::CHANGE | EventCode::DISPLAY, -8).0,
        },
        PaletteEntry::Plain {
            rgb888: 0x80_F0_D0_30,
            event: EventCode::energy(EventCode::SCORE, 10).0,
        },
    ]
}

/// Build the world and texture blobs for `config`.
pub fn generate_blobs(config: &TerrainConfig) -> (Vec<u8>, Vec<u8>) {
    let config = config.normalized();
    let field = HeightField::generate(&config);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed as u64);

    let mut textures = TextureBlobBuilder::new();
    let rock = Texture::checkerboard(16, 16, 4, 0x6E6A64, 0x4A4640).map(|tex| textures.push(&tex));
    let palette = palette(rock);

    let chunk_count = (config.size / config.chunk_size) as i32;
    let grid = ChunkGrid::new(0, 0, chunk_count, chunk_count, config.chunk_size as i32);

    // Base layer: ground plus pillars
    let mut ground = MeshBuilder::new(grid.clone());
    ground.lattice(&field);
    for z in 0..config.size {
        for x in 0..config.size {
            let peak = [(x, z), (x + 1, z), (x, z + 1), (x + 1, z + 1)]
                .iter()
                .map(|&(x, z)| field.at(x, z))
                .fold(f32::MIN, f32::max);
            let material = if peak > config.amplitude * 0.6 {
                SNOW
            } else if peak > config.amplitude * 0.25 {
                ROCK
            } else {
                GRASS
            };
            ground.ground_cell(&field, x, z, material);
        }
    }

    let centre = config.size as f32 * 0.5;
    for _ in 0..config.pillars {
        let x = rng.gen_range(1..config.size - 1) as f32;
        let z = rng.gen_range(1..config.size - 1) as f32;
        // Keep the spawn point clear
        if (x - centre).abs() < 2.0 && (z - centre).abs() < 2.0 {
            continue;
        }
        let top = if rng.gen_bool(0.5) { CRYSTAL } else { EMBER };
        let base = field.at(x as u32, z as u32) - 1.0;
        let height = rng.gen_range(1.5..4.0);
        ground.axis_box(
            Vec3::new(x + 0.2, base, z + 0.2),
            Vec3::new(x + 0.8, base + 1.0 + height, z + 0.8),
            top,
            top,
        );
    }

    // Second layer: a marker bobbing between two frames
    let mx = (centre - 3.0).max(0.0);
    let mz = (centre - 3.0).max(0.0);
    let floor = field.at(mx as u32, mz as u32);
    let marker_frames = [0.0f32, 0.4]
        .iter()
        .map(|&lift| {
            let mut marker = MeshBuilder::new(grid.clone());
            let lo = Vec3::new(mx + 0.3, floor + 1.0 + lift, mz + 0.3);
            marker.axis_box(lo, lo + Vec3::splat(0.4), MARKER, MARKER);
            marker.finish(palette.clone())
        })
        .collect();

    let eye = Vec3::new(centre + 0.5, field.at(centre as u32, centre as u32) + 1.0, centre + 0.5);
    let world = WorldBlobBuilder::new(eye, Vec3::NEG_Z)
        .layer(vec![ground.finish(palette)])
        .layer(marker_frames)
        .build();

    let textures = textures.build();
    log::debug!(
        "terrain {}x{} (seed {}): {} byte world, {} byte textures",
        config.size,
        config.size,
        config.seed,
        world.len(),
        textures.len()
    );
    (world, textures)
}

/// Generate and load the demo world.
pub fn build_world(config: &TerrainConfig) -> Result<World, AssetError> {
    let (world, textures) = generate_blobs(config);
    load_world(&world, &textures)
}
