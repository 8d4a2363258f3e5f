/// Benchmark suite for the rendering hot paths
/// Setup, tiling, rasterization and the depth scan used for collision.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec4;

use chunk_raster::camera::Camera;
use chunk_raster::geometry::Viewport;
use chunk_raster::rendering::framebuffer::{DepthBuffer, PixelBuffer, RasterTarget};
use chunk_raster::rendering::hit_test::check_collide;
use chunk_raster::rendering::queue::{Generation, QueuePair};
use chunk_raster::rendering::setup::tile_triangle;
use chunk_raster::rendering::{Rasterizer, RenderRecord, Shade, ShadingConfig, TriangleSetup};
use chunk_raster::world::terrain::{build_world, TerrainConfig};
use chunk_raster::world::{pick_indexed, ChunkPick, World};

fn bench_world() -> World {
    build_world(&TerrainConfig::default()).expect("terrain loads")
}

/// Fill `queues` the way one idle frame would
fn setup_frame(world: &World, setup: &TriangleSetup, camera: &Camera, queues: &mut QueuePair) -> u32 {
    let mut pixels = 0;
    for n in 0.. {
        for layer in &world.layers {
            let frame = &layer.frames[0];
            match pick_indexed(&frame.chunks, camera.eye, camera.direction, n) {
                ChunkPick::Exhausted => return pixels,
                ChunkPick::Invalid => {}
                ChunkPick::Chunk(i) => {
                    pixels += setup
                        .setup_chunk(frame.mesh, world.mesh(frame.mesh), &frame.chunks, i, queues)
                        .expect("bench frame fits the queues");
                }
            }
        }
    }
    pixels
}

fn bench_setup_frame(c: &mut Criterion) {
    let world = bench_world();
    let viewport = Viewport::default();
    let camera = Camera::for_viewport(world.start_eye, world.start_direction, &viewport);
    let setup = TriangleSetup::new(&camera, viewport, ShadingConfig::default());
    let mut queues = QueuePair::with_default_capacity(Generation::A);

    c.bench_function("setup_frame", |b| {
        b.iter(|| {
            queues.reset();
            black_box(setup_frame(&world, &setup, &camera, &mut queues))
        });
    });
}

fn bench_drain_frame(c: &mut Criterion) {
    let world = bench_world();
    let viewport = Viewport::default();
    let camera = Camera::for_viewport(world.start_eye, world.start_direction, &viewport);
    let setup = TriangleSetup::new(&camera, viewport, ShadingConfig::default());
    let mut queues = QueuePair::with_default_capacity(Generation::A);
    setup_frame(&world, &setup, &camera, &mut queues);

    let rasterizer = Rasterizer::new();
    let mut pixels = PixelBuffer::new(viewport.width, viewport.height);
    let mut depth = DepthBuffer::new(viewport.width, viewport.height, 100.0);

    c.bench_function("drain_frame", |b| {
        b.iter(|| {
            pixels.clear(rasterizer.fog.background_rgb565());
            depth.clear(100.0);
            let mut target = RasterTarget::new(&mut pixels, &mut depth);
            black_box(rasterizer.drain(&queues, world.meshes(), &mut target))
        });
    });
}

fn bench_tile_triangle(c: &mut Criterion) {
    let viewport = Viewport::default();
    let mut group = c.benchmark_group("tile_triangle");
    for size in [32.0f32, 128.0, 512.0] {
        let raster = [(0.0, 0.0), (0.0, size), (size, 0.0)].map(|(x, y)| Vec4::new(x, y, 0.5, 1.0));
        let record = RenderRecord::from_raster(Default::default(), 0, &raster, Shade::UNLIT).expect("front facing");
        let mut queues = QueuePair::with_default_capacity(Generation::A);
        group.bench_with_input(BenchmarkId::from_parameter(size as u32), &record, |b, record| {
            b.iter(|| {
                queues.reset();
                black_box(tile_triangle(record, viewport.full_rect(), &viewport, &mut queues).expect("room"))
            });
        });
    }
    group.finish();
}

fn bench_check_collide(c: &mut Criterion) {
    let viewport = Viewport::default();
    let mut depth = DepthBuffer::new(viewport.width, viewport.height, 100.0);
    for (i, d) in depth.depth.iter_mut().enumerate() {
        *d = 5.0 + (i % 97) as f32 * 0.5;
    }
    c.bench_function("check_collide", |b| {
        b.iter(|| black_box(check_collide(&depth, &viewport, 100.0)));
    });
}

fn bench_pixel_clear(c: &mut Criterion) {
    let mut pixels = PixelBuffer::new(128, 128);
    c.bench_function("pixel_clear", |b| {
        b.iter(|| pixels.clear(black_box(0x3186)));
    });
}

criterion_group!(
    benches,
    bench_setup_frame,
    bench_drain_frame,
    bench_tile_triangle,
    bench_check_collide,
    bench_pixel_clear
);
criterion_main!(benches);
