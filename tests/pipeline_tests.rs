//! Threaded pipeline runs over a small generated world
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chunk_raster::camera::Controls;
use chunk_raster::error::PipelineError;
use chunk_raster::pipeline::{NullSink, Pipeline, PipelineConfig, ScriptedControls};
use chunk_raster::rendering::fog::Fog;
use chunk_raster::rendering::PixelBuffer;
use chunk_raster::world::terrain::{build_world, TerrainConfig};
use chunk_raster::world::World;

fn small_world() -> World {
    build_world(&TerrainConfig {
        size: 16,
        pillars: 6,
        ..TerrainConfig::default()
    })
    .expect("terrain loads")
}

fn fixed_time() -> PipelineConfig {
    PipelineConfig {
        fixed_frame_ms: Some(50.0),
        ..PipelineConfig::default()
    }
}

#[test]
fn frames_flow_through_worker_and_display() {
    let background = Fog::default().background_rgb565();
    let best = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&best);
    let sink = move |frame: &PixelBuffer| {
        let drawn = frame.pixels.iter().filter(|&&p| p != 0 && p != background).count();
        seen.fetch_max(drawn, Ordering::Relaxed);
    };

    let mut reports = Vec::new();
    let summary = Pipeline::new(small_world(), fixed_time(), Box::new(Controls::idle()), Box::new(sink))
        .run_with(Some(6), |r| reports.push(*r))
        .expect("pipeline runs");

    assert_eq!(summary.frames, 6);
    assert_eq!(reports.len(), 6);
    for pair in reports.windows(2) {
        assert_ne!(pair[0].generation, pair[1].generation, "generations must alternate");
    }
    assert!(reports.iter().all(|r| r.queued > 0), "every frame should set up geometry");
    // The first job drains empty queues; later ones draw what was set up
    assert_eq!(reports[0].rasterized, 0);
    assert!(reports[1].rasterized > 0);
    assert!(best.load(Ordering::Relaxed) > 1000, "terrain should fill much of the screen");

    let game = summary.game.expect("event manager enabled");
    assert!(game.health > 0 && game.health <= 128);
}

#[test]
fn idle_viewer_stays_put() {
    let world = small_world();
    let start = world.start_eye;
    let summary = Pipeline::new(world, fixed_time(), Box::new(Controls::idle()), Box::new(NullSink::default()))
        .run(Some(4))
        .expect("pipeline runs");
    assert_eq!(summary.camera.eye.x, start.x);
    assert_eq!(summary.camera.eye.z, start.z);
}

#[test]
fn walking_changes_position_or_stops_at_a_wall() {
    let world = small_world();
    let start = world.start_eye;
    let mut nearest = Vec::new();
    let summary = Pipeline::new(
        world,
        fixed_time(),
        Box::new(ScriptedControls::new(vec![(10, Controls::forward())])),
        Box::new(NullSink::default()),
    )
    .run_with(Some(10), |r| nearest.push(r.nearest.depth))
    .expect("pipeline runs");

    let moved = (summary.camera.eye.z - start.z).abs() > 0.0;
    let blocked = nearest.iter().any(|&d| d < 1.5);
    assert!(moved || blocked, "forward input neither moved the eye nor met a surface");
}

#[test]
fn queue_overflow_stops_the_run_cleanly() {
    let config = PipelineConfig {
        edge_capacity: 1,
        covered_capacity: 1,
        events: false,
        ..fixed_time()
    };
    let result = Pipeline::new(small_world(), config, Box::new(Controls::idle()), Box::new(NullSink::default())).run(Some(3));
    match result {
        Err(PipelineError::QueueOverflow(full)) => assert_eq!(full.capacity, 1),
        Err(other) => panic!("expected queue overflow, got {}", other),
        Ok(_) => panic!("expected queue overflow"),
    }
}

#[test]
fn scripted_controls_cycle() {
    use chunk_raster::pipeline::ControlSource;
    let right = Controls {
        right_pressed: true,
        ..Controls::idle()
    };
    let mut script = ScriptedControls::new(vec![(2, Controls::forward()), (1, right)]);
    let polled: Vec<Controls> = (0..6).map(|f| script.poll(f)).collect();
    assert_eq!(
        polled,
        vec![Controls::forward(), Controls::forward(), right, Controls::forward(), Controls::forward(), right]
    );
}
