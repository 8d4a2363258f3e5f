//! Blob builders producing the layout `reader` consumes. Used for the
//! procedural demo world and for tests.
use glam::{Vec2, Vec3};

use super::{
    CHUNK_HEADER_SIZE, FRAME_HEADER_SIZE, LAYOUT_FLAG, PALETTE_ENTRY_SIZE, PAL_PLAIN, PAL_TEXOFF,
    TEXTURE_HEADER_SIZE, WORLD_HEADER_SIZE,
};
use crate::rendering::texture::Texture;
use crate::world::ChunkGrid;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaletteEntry {
    /// Roughness in the top byte, RGB below
    Plain { rgb888: u32, event: u32 },
    /// `offset` as returned by `TextureBlobBuilder::push`
    Texture { roughness: u8, offset: u32, event: u32 },
}

impl PaletteEntry {
    fn encode(&self) -> [u32; 3] {
        match *self {
            PaletteEntry::Plain { rgb888, event } => [PAL_PLAIN, rgb888, event],
            PaletteEntry::Texture { roughness, offset, event } => {
                [PAL_TEXOFF, ((roughness as u32) << 24) | (offset & 0x00FF_FFFF), event]
            }
        }
    }
}

/// Source data for one layout frame
#[derive(Clone, Debug)]
pub struct FrameData {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u16>,
    pub uvs: Vec<Vec2>,
    pub uv_indices: Vec<u16>,
    pub attributes: Vec<u16>,
    pub palette: Vec<PaletteEntry>,
    pub chunks: ChunkGrid,
}

#[derive(Default)]
pub struct TextureBlobBuilder {
    bytes: Vec<u8>,
}

impl TextureBlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a texture and return its offset for palette entries
    pub fn push(&mut self, texture: &Texture) -> u32 {
        let offset = self.bytes.len() as u32;
        put_u32(&mut self.bytes, TEXTURE_HEADER_SIZE as u32);
        put_u16(&mut self.bytes, texture.width as u16);
        put_u16(&mut self.bytes, 0);
        put_u16(&mut self.bytes, texture.height as u16);
        put_u16(&mut self.bytes, 0);
        for &texel in &texture.texels {
            put_u32(&mut self.bytes, texel);
        }
        offset
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub struct WorldBlobBuilder {
    eye: Vec3,
    direction: Vec3,
    layers: Vec<Vec<FrameData>>,
}

impl WorldBlobBuilder {
    pub fn new(eye: Vec3, direction: Vec3) -> Self {
        Self {
            eye,
            direction,
            layers: Vec::new(),
        }
    }

    /// Add a layer with one or more animation frames
    pub fn layer(mut self, frames: Vec<FrameData>) -> Self {
        self.layers.push(frames);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_vec3(&mut out, self.eye);
        put_vec3(&mut out, self.direction);
        debug_assert_eq!(out.len(), WORLD_HEADER_SIZE);

        // Descriptor table first, frame offsets patched once frames are placed
        let mut patch_sites = Vec::new();
        for frames in &self.layers {
            put_u32(&mut out, LAYOUT_FLAG | ((frames.len() as u32 & 0xFF) << 16));
            for _ in frames {
                patch_sites.push(out.len());
                put_u32(&mut out, 0);
            }
        }
        put_u32(&mut out, 0);

        for (site, frame) in patch_sites.into_iter().zip(self.layers.iter().flatten()) {
            align4(&mut out);
            let offset = out.len() as u32;
            out[site..site + 4].copy_from_slice(&offset.to_le_bytes());
            write_frame(&mut out, frame);
        }
        out
    }
}

fn write_frame(out: &mut Vec<u8>, frame: &FrameData) {
    let base = out.len();
    out.resize(base + FRAME_HEADER_SIZE, 0);
    let mut fields = [0u32; FRAME_HEADER_SIZE / 4];

    fields[0] = (out.len() - base) as u32;
    for &v in &frame.vertices {
        put_vec3(out, v);
    }

    fields[1] = (out.len() - base) as u32;
    frame.indices.iter().for_each(|&i| put_u16(out, i));
    align4(out);

    fields[2] = (out.len() - base) as u32;
    for &uv in &frame.uvs {
        put_f32(out, uv.x);
        put_f32(out, uv.y);
    }

    fields[3] = (out.len() - base) as u32;
    frame.uv_indices.iter().for_each(|&i| put_u16(out, i));
    align4(out);

    fields[4] = (out.len() - base) as u32;
    frame.attributes.iter().for_each(|&a| put_u16(out, a));
    align4(out);

    fields[5] = (out.len() - base) as u32;
    put_u32(out, frame.palette.len() as u32);
    for entry in &frame.palette {
        entry.encode().iter().for_each(|&w| put_u32(out, w));
    }
    debug_assert_eq!(
        out.len() - base - fields[5] as usize,
        4 + frame.palette.len() * PALETTE_ENTRY_SIZE
    );

    fields[6] = (out.len() - base) as u32;
    write_chunks(out, &frame.chunks);

    for (i, field) in fields.iter().enumerate() {
        out[base + i * 4..base + i * 4 + 4].copy_from_slice(&field.to_le_bytes());
    }
}

fn write_chunks(out: &mut Vec<u8>, grid: &ChunkGrid) {
    let header = out.len();
    for value in [grid.xmin, grid.zmin, grid.xcount, grid.zcount, grid.size, 0] {
        put_u16(out, value as i16 as u16);
    }
    debug_assert_eq!(out.len() - header, CHUNK_HEADER_SIZE);

    let table = out.len();
    out.resize(table + grid.cell_count() * 8, 0);
    for (cell, faces) in grid.cells().iter().enumerate() {
        let list_offset = (out.len() - header) as u32;
        faces.iter().for_each(|&f| put_u16(out, f));
        let entry = table + cell * 8;
        out[entry..entry + 4].copy_from_slice(&list_offset.to_le_bytes());
        out[entry + 4..entry + 8].copy_from_slice(&(faces.len() as u32).to_le_bytes());
    }
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_vec3(out: &mut Vec<u8>, v: Vec3) {
    put_f32(out, v.x);
    put_f32(out, v.y);
    put_f32(out, v.z);
}
