/// Scan conversion of queued render records into the pixel and depth buffers.
///
/// Edge functions, 1/w and z/w are evaluated once at the first pixel centre
/// of the record's box and then stepped by their x/y coefficients. Two paths
/// share one loop: the edge-checked path for whole triangles and partial
/// tiles, and the covered path for tiles known to lie inside the triangle.
use glam::Vec3;

use super::fog::Fog;
use super::framebuffer::RasterTarget;
use super::queue::{QueueKind, QueuePair};
use super::setup::RenderRecord;
use super::shading::Shade;
use super::texture::Texture;
use crate::geometry::edge_passes;
use crate::world::Mesh;
use crate::{count_add, count_call};

/// Beyond this depth textured faces use their average colour
pub const TEXTURE_DEPTH_LIMIT: f32 = 22.0;

/// What a record paints with, resolved once per record.
enum Surface<'a> {
    /// Palette colour with the face shade already applied
    Flat(u32),
    Textured {
        texture: &'a Texture,
        /// Palette colour, used past the texture depth limit
        average: u32,
        u: Vec3,
        v: Vec3,
        shade: Shade,
    },
}

#[derive(Clone, Debug)]
pub struct Rasterizer {
    pub fog: Fog,
    pub texture_depth_limit: f32,
    /// Minimum box extent (both axes, exclusive) before a record on the
    /// edge-checked path is textured
    pub min_textured_extent_edge: f32,
    /// Same for covered tiles
    pub min_textured_extent_covered: f32,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            fog: Fog::default(),
            texture_depth_limit: TEXTURE_DEPTH_LIMIT,
            min_textured_extent_edge: 6.0,
            min_textured_extent_covered: 3.0,
        }
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize every record of a generation. Processing order only matters
    /// for exact depth ties.
    pub fn drain(&self, queues: &QueuePair, meshes: &[Mesh], target: &mut RasterTarget) -> usize {
        for record in queues.queue(QueueKind::EdgeChecked).iter() {
            self.rasterize_edge_checked(record, &meshes[record.mesh.0 as usize], target);
        }
        for record in queues.queue(QueueKind::Covered).iter() {
            self.rasterize_covered(record, &meshes[record.mesh.0 as usize], target);
        }
        count_add!(records_rasterized, queues.len());
        queues.len()
    }

    /// Rasterize a whole triangle or partial tile, testing all three edges
    /// per pixel with the shared tie-break rule.
    pub fn rasterize_edge_checked(&self, record: &RenderRecord, mesh: &Mesh, target: &mut RasterTarget) {
        let surface = self.surface(record, mesh, self.min_textured_extent_edge);
        self.scan::<true>(record, &surface, target);
    }

    /// Rasterize a tile the triangle covers completely. No edge tests.
    pub fn rasterize_covered(&self, record: &RenderRecord, mesh: &Mesh, target: &mut RasterTarget) {
        let surface = self.surface(record, mesh, self.min_textured_extent_covered);
        self.scan::<false>(record, &surface, target);
    }

    fn surface<'a>(&self, record: &RenderRecord, mesh: &'a Mesh, min_extent: f32) -> Surface<'a> {
        let face = record.face as usize;
        let material = mesh.material(face);
        match material.texture.as_deref() {
            Some(texture) if record.bbox.width() > min_extent && record.bbox.height() > min_extent => {
                let (u, v) = record.uv_vectors(&mesh.face_uvs(face));
                Surface::Textured {
                    texture,
                    average: material.rgb888,
                    u,
                    v,
                    shade: record.shade,
                }
            }
            _ => Surface::Flat(record.shade.apply(material.rgb888)),
        }
    }

    #[inline(always)]
    fn texel(&self, surface: &Surface, sample: Vec3, w: f32, z: f32) -> u32 {
        match *surface {
            Surface::Flat(colour) => colour,
            Surface::Textured {
                texture,
                average,
                u,
                v,
                shade,
            } => {
                if z < self.texture_depth_limit {
                    let s = u.dot(sample).abs() * w;
                    let t = v.dot(sample).abs() * w;
                    shade.apply(texture.sample(s, t))
                } else {
                    shade.apply(average)
                }
            }
        }
    }

    fn scan<const EDGES: bool>(&self, record: &RenderRecord, surface: &Surface, target: &mut RasterTarget) {
        let width = target.width();
        let height = target.pixels.height;
        let bbox = record.bbox;
        let x_end = bbox.max_x.min(width as f32);
        let y_end = bbox.max_y.min(height as f32);
        let x0 = bbox.min_x.max(0.0) as u32;
        let y0 = bbox.min_y.max(0.0) as u32;

        let edges = [record.edge(0), record.edge(1), record.edge(2)];
        let c = record.one_over_w;
        let zv = record.z_over_w;

        let start = Vec3::new(x0 as f32 + 0.5, y0 as f32 + 0.5, 1.0);
        let mut edge_row = edges.map(|e| e.dot(start));
        let mut one_over_w_row = c.dot(start);
        let mut z_over_w_row = zv.dot(start);

        let mut y = y0;
        while (y as f32) < y_end {
            let mut edge = edge_row;
            let mut one_over_w = one_over_w_row;
            let mut z_over_w = z_over_w_row;
            let mut entered = false;

            let mut x = x0;
            while (x as f32) < x_end {
                let inside = !EDGES
                    || (edge_passes(edges[0], edge[0])
                        && edge_passes(edges[1], edge[1])
                        && edge_passes(edges[2], edge[2]));

                if inside {
                    entered = true;
                    count_call!(pixels_tested);
                    let w = 1.0 / one_over_w;
                    let z = z_over_w * w;
                    let index = y as usize * width + x as usize;
                    if target.depth.test_and_set(index, z) {
                        count_call!(depth_passed);
                        let sample = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 1.0);
                        let colour = self.texel(surface, sample, w, z);
                        target.write(index, self.fog.blend_rgb565(colour, z));
                    } else {
                        count_call!(depth_failed);
                    }
                } else if entered {
                    // Convex: once a scanline leaves the triangle it stays out
                    break;
                }

                for i in 0..3 {
                    edge[i] += edges[i].x;
                }
                one_over_w += c.x;
                z_over_w += zv.x;
                x += 1;
            }

            for i in 0..3 {
                edge_row[i] += edges[i].y;
            }
            one_over_w_row += c.y;
            z_over_w_row += zv.y;
            y += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::rendering::framebuffer::{DepthBuffer, PixelBuffer};
    use crate::rendering::queue::Generation;
    use crate::world::{Material, MeshId};
    use glam::{Vec2, Vec4};
    use std::sync::Arc;

    fn flat_mesh(material: Material) -> Mesh {
        Mesh {
            vertices: vec![glam::Vec3::ZERO; 3],
            indices: vec![0, 1, 2],
            uvs: vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0)],
            uv_indices: vec![0, 1, 2],
            attributes: vec![0],
            materials: vec![material],
        }
    }

    fn record(points: [(f32, f32); 3], z: f32, bbox: Rect) -> RenderRecord {
        let raster = points.map(|(x, y)| Vec4::new(x, y, z, 1.0));
        RenderRecord::from_raster(MeshId(0), 0, &raster, Shade::UNLIT)
            .expect("front facing")
            .with_bbox(bbox)
    }

    #[test]
    fn covered_tile_fills_every_pixel() {
        let mesh = flat_mesh(Material::plain(0xFFFFFF));
        let rec = record([(0.0, 0.0), (0.0, 64.0), (64.0, 0.0)], 1.0, Rect::new(8.0, 8.0, 16.0, 16.0));
        let mut pixels = PixelBuffer::new(32, 32);
        let mut depth = DepthBuffer::new(32, 32, 100.0);
        let mut target = RasterTarget::new(&mut pixels, &mut depth);

        Rasterizer::new().rasterize_covered(&rec, &mesh, &mut target);

        assert_eq!(pixels.count_not(0), 64);
        assert!((depth.at(8, 8) - 1.0).abs() < 1e-5);
        assert_eq!(depth.at(7, 8), 100.0);
    }

    #[test]
    fn nearer_record_wins_regardless_of_order() {
        let mesh = flat_mesh(Material::plain(0xFFFFFF));
        let bbox = Rect::new(0.0, 0.0, 16.0, 16.0);
        let near = record([(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 2.0, bbox);
        let far = record([(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 40.0, bbox);

        let mut results = Vec::new();
        for order in [[near, far], [far, near]] {
            let mut pixels = PixelBuffer::new(16, 16);
            let mut depth = DepthBuffer::new(16, 16, 100.0);
            let mut target = RasterTarget::new(&mut pixels, &mut depth);
            let raster = Rasterizer::new();
            for r in &order {
                raster.rasterize_edge_checked(r, &mesh, &mut target);
            }
            results.push(pixels.pixels.clone());
        }
        assert_eq!(results[0], results[1]);
        // Near white is unfogged
        assert_eq!(results[0][16 + 1], 0xFFFF);
    }

    #[test]
    fn textured_face_samples_texture_when_near() {
        let tex = Arc::new(Texture::checkerboard(2, 2, 1, 0xFF0000, 0x0000FF).expect("non-empty"));
        let mesh = flat_mesh(Material::textured(tex, 0));
        let rec = record([(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 1.0, Rect::new(0.0, 0.0, 16.0, 16.0));
        let mut pixels = PixelBuffer::new(16, 16);
        let mut depth = DepthBuffer::new(16, 16, 100.0);
        let mut target = RasterTarget::new(&mut pixels, &mut depth);

        Rasterizer::new().rasterize_edge_checked(&rec, &mesh, &mut target);

        let lit: Vec<u16> = pixels.pixels.iter().copied().filter(|&p| p != 0).collect();
        assert!(lit.iter().any(|&p| p & 0xF800 != 0), "expected red texels");
        assert!(lit.iter().any(|&p| p & 0x001F != 0), "expected blue texels");
    }

    #[test]
    fn drain_processes_both_queues() {
        let meshes = vec![flat_mesh(Material::plain(0x00FF00))];
        let tri = [(0.0, 0.0), (0.0, 32.0), (32.0, 0.0)];
        let mut queues = QueuePair::new(Generation::A, 4, 4);
        queues
            .push(QueueKind::EdgeChecked, record(tri, 1.0, Rect::new(8.0, 8.0, 16.0, 16.0)))
            .unwrap();
        queues
            .push(QueueKind::Covered, record(tri, 1.0, Rect::new(0.0, 0.0, 8.0, 8.0)))
            .unwrap();

        let mut pixels = PixelBuffer::new(32, 32);
        let mut depth = DepthBuffer::new(32, 32, 100.0);
        let mut target = RasterTarget::new(&mut pixels, &mut depth);
        let drawn = Rasterizer::new().drain(&queues, &meshes, &mut target);

        assert_eq!(drawn, 2);
        assert_eq!(pixels.count_not(0), 128);
    }
}
