use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::{
    CHUNK_HEADER_SIZE, FRAME_HEADER_SIZE, LAYOUT_FLAG, PALETTE_ENTRY_SIZE, PAL_PLAIN, PAL_TEXOFF,
    WORLD_HEADER_SIZE,
};
use crate::error::AssetError;
use crate::rendering::texture::Texture;
use crate::world::{ChunkGrid, Layer, LayoutFrame, Material, Mesh, MeshId, World};

/// Bounds-checked little-endian view over a blob
#[derive(Copy, Clone)]
struct Blob<'a> {
    bytes: &'a [u8],
}

impl<'a> Blob<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], AssetError> {
        let out_of_bounds = AssetError::OutOfBounds {
            offset,
            len,
            size: self.bytes.len(),
        };
        let end = offset.checked_add(len).ok_or(out_of_bounds.clone())?;
        self.bytes.get(offset..end).ok_or(out_of_bounds)
    }

    fn read<const N: usize>(&self, offset: usize) -> Result<[u8; N], AssetError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    fn u16(&self, offset: usize) -> Result<u16, AssetError> {
        self.read(offset).map(u16::from_le_bytes)
    }

    fn i16(&self, offset: usize) -> Result<i16, AssetError> {
        self.read(offset).map(i16::from_le_bytes)
    }

    fn u32(&self, offset: usize) -> Result<u32, AssetError> {
        self.read(offset).map(u32::from_le_bytes)
    }

    fn f32(&self, offset: usize) -> Result<f32, AssetError> {
        self.read(offset).map(f32::from_le_bytes)
    }

    fn vec3(&self, offset: usize) -> Result<Vec3, AssetError> {
        Ok(Vec3::new(self.f32(offset)?, self.f32(offset + 4)?, self.f32(offset + 8)?))
    }

    fn vec2(&self, offset: usize) -> Result<Vec2, AssetError> {
        Ok(Vec2::new(self.f32(offset)?, self.f32(offset + 4)?))
    }

    fn u16_array(&self, offset: usize, count: usize) -> Result<Vec<u16>, AssetError> {
        let bytes = self.slice(offset, count * 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect())
    }

    fn u32_array(&self, offset: usize, count: usize) -> Result<Vec<u32>, AssetError> {
        let bytes = self.slice(offset, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

/// Number of elements implied by the largest index referencing them
fn implied_len(indices: &[u16]) -> usize {
    indices.iter().max().map_or(0, |&m| m as usize + 1)
}

/// Parse and validate a world blob together with its texture blob.
///
/// Every offset and index is checked here, so the rest of the renderer can
/// index meshes without further bounds handling.
pub fn load_world(world: &[u8], textures: &[u8]) -> Result<World, AssetError> {
    let blob = Blob::new(world);
    let texture_blob = Blob::new(textures);
    let mut texture_cache: HashMap<u32, Arc<Texture>> = HashMap::new();

    let start_eye = blob.vec3(0)?;
    let start_direction = blob.vec3(12)?;

    let mut meshes = Vec::new();
    let mut layers = Vec::new();
    let mut cursor = WORLD_HEADER_SIZE;
    loop {
        let descriptor = blob.u32(cursor)?;
        if descriptor == 0 {
            break;
        }
        if descriptor & LAYOUT_FLAG == 0 {
            return Err(AssetError::BadDescriptor {
                descriptor,
                offset: cursor,
            });
        }
        let frame_count = ((descriptor >> 16) & 0xFF) as usize;
        if frame_count == 0 {
            return Err(AssetError::NoFrames { offset: cursor });
        }
        cursor += 4;

        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let frame_offset = blob.u32(cursor)? as usize;
            cursor += 4;
            let (mesh, chunks) = read_frame(blob, frame_offset, texture_blob, &mut texture_cache)?;
            frames.push(LayoutFrame {
                mesh: MeshId(meshes.len() as u32),
                chunks,
            });
            meshes.push(mesh);
        }
        layers.push(Layer { frames });
    }

    if layers.is_empty() {
        return Err(AssetError::NoLayouts);
    }
    log::info!(
        "loaded world: {} layers, {} meshes, {} shared textures",
        layers.len(),
        meshes.len(),
        texture_cache.len()
    );
    Ok(World::new(meshes, layers, start_eye, start_direction))
}

fn read_frame(
    blob: Blob,
    base: usize,
    textures: Blob,
    cache: &mut HashMap<u32, Arc<Texture>>,
) -> Result<(Mesh, ChunkGrid), AssetError> {
    let header = blob.u32_array(base, FRAME_HEADER_SIZE / 4)?;
    let at = |field: usize| base + header[field] as usize;
    let (vertices_at, indices_at, uvs_at, uv_indices_at, attributes_at, palette_at, chunks_at) =
        (at(0), at(1), at(2), at(3), at(4), at(5), at(6));

    let materials = read_palette(blob, palette_at, textures, cache)?;
    let chunks = read_chunks(blob, chunks_at)?;

    let faces = chunks.max_face().map_or(0, |m| m as usize + 1);
    let attributes = blob.u16_array(attributes_at, faces)?;
    let indices = blob.u16_array(indices_at, faces * 3)?;
    let uv_indices = blob.u16_array(uv_indices_at, faces * 3)?;

    if let Some((face, &entry)) = attributes
        .iter()
        .enumerate()
        .find(|&(_, &a)| a as usize >= materials.len())
    {
        log::error!("face {} references palette entry {}", face, entry);
        return Err(AssetError::IndexOutOfRange {
            what: "palette",
            index: entry as usize,
            len: materials.len(),
        });
    }

    let vertices = (0..implied_len(&indices))
        .map(|i| blob.vec3(vertices_at + i * 12))
        .collect::<Result<Vec<_>, _>>()?;
    let uvs = (0..implied_len(&uv_indices))
        .map(|i| blob.vec2(uvs_at + i * 8))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "frame at {:#x}: {} faces, {} vertices, {} uvs, {} materials, {}x{} chunks",
        base,
        faces,
        vertices.len(),
        uvs.len(),
        materials.len(),
        chunks.xcount,
        chunks.zcount
    );

    let mesh = Mesh {
        vertices,
        indices,
        uvs,
        uv_indices,
        attributes,
        materials,
    };
    Ok((mesh, chunks))
}

fn read_palette(
    blob: Blob,
    offset: usize,
    textures: Blob,
    cache: &mut HashMap<u32, Arc<Texture>>,
) -> Result<Vec<Material>, AssetError> {
    let count = blob.u32(offset)? as usize;
    // Reject absurd counts before allocating
    blob.slice(offset + 4, count * PALETTE_ENTRY_SIZE)?;

    let mut materials = Vec::with_capacity(count);
    for entry in 0..count {
        let [kind, parameter, event] = {
            let fields = blob.u32_array(offset + 4 + entry * PALETTE_ENTRY_SIZE, 3)?;
            [fields[0], fields[1], fields[2]]
        };
        let material = match kind {
            PAL_PLAIN => Material::plain(parameter),
            PAL_TEXOFF => {
                let roughness = (parameter >> 24) as u8;
                let texture_offset = parameter & 0x00FF_FFFF;
                let texture = match cache.get(&texture_offset) {
                    Some(t) => Arc::clone(t),
                    None => {
                        let t = Arc::new(read_texture(textures, texture_offset as usize)?);
                        cache.insert(texture_offset, Arc::clone(&t));
                        t
                    }
                };
                Material::textured(texture, roughness)
            }
            kind => return Err(AssetError::UnknownPaletteType { entry, kind }),
        };
        log::trace!("palette {}: colour {:#010x} event {:#010x}", entry, material.rgb888, event);
        materials.push(material.with_event(event));
    }
    Ok(materials)
}

fn read_texture(textures: Blob, offset: usize) -> Result<Texture, AssetError> {
    let pixel_offset = textures.u32(offset)? as usize;
    let width = textures.u16(offset + 4)? as u32;
    let height = textures.u16(offset + 8)? as u32;
    let empty = AssetError::EmptyTexture { offset, width, height };
    if width == 0 || height == 0 {
        return Err(empty);
    }
    let texels = textures.u32_array(offset + pixel_offset, (width * height) as usize)?;
    Texture::new(width, height, texels).ok_or(empty)
}

fn read_chunks(blob: Blob, offset: usize) -> Result<ChunkGrid, AssetError> {
    let xmin = blob.i16(offset)?;
    let zmin = blob.i16(offset + 2)?;
    let xcount = blob.i16(offset + 4)?;
    let zcount = blob.i16(offset + 6)?;
    let size = blob.i16(offset + 8)?;
    if xcount <= 0 || zcount <= 0 || size <= 0 {
        return Err(AssetError::BadChunkGrid { xcount, zcount, size });
    }

    let cell_count = xcount as usize * zcount as usize;
    let mut cells = Vec::with_capacity(cell_count);
    for cell in 0..cell_count {
        let entry = offset + CHUNK_HEADER_SIZE + cell * 8;
        let list_offset = blob.u32(entry)? as usize;
        let count = blob.u32(entry + 4)? as usize;
        cells.push(blob.u16_array(offset + list_offset, count)?);
    }

    ChunkGrid::from_cells(
        xmin as i32,
        zmin as i32,
        xcount as i32,
        zcount as i32,
        size as i32,
        cells,
    )
    .ok_or(AssetError::BadChunkGrid { xcount, zcount, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_header_is_out_of_bounds() {
        let err = load_world(&[0u8; 10], &[]).unwrap_err();
        assert!(matches!(err, AssetError::OutOfBounds { offset: 0, .. }));
    }

    #[test]
    fn empty_descriptor_list_has_no_layouts() {
        let blob = vec![0u8; WORLD_HEADER_SIZE + 4];
        assert_eq!(load_world(&blob, &[]).unwrap_err(), AssetError::NoLayouts);
    }

    #[test]
    fn descriptor_without_flag_is_rejected() {
        let mut blob = vec![0u8; WORLD_HEADER_SIZE + 8];
        blob[WORLD_HEADER_SIZE..WORLD_HEADER_SIZE + 4].copy_from_slice(&0x0001_0000u32.to_le_bytes());
        assert_eq!(
            load_world(&blob, &[]).unwrap_err(),
            AssetError::BadDescriptor {
                descriptor: 0x0001_0000,
                offset: WORLD_HEADER_SIZE
            }
        );
    }

    #[test]
    fn implied_length_follows_max_index() {
        assert_eq!(implied_len(&[]), 0);
        assert_eq!(implied_len(&[0, 4, 2]), 5);
    }
}
