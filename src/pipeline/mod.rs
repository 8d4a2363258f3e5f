//! Threaded frame pipeline.
//!
//! The caller's thread runs the world loop: it picks chunks, sets up
//! triangles into one queue generation and moves the viewer. A raster worker
//! drains the other generation into a pixel buffer while a display link
//! presents the buffer finished the frame before. Buffers change hands only
//! through bounded channels, so every buffer has exactly one writer.
pub mod display;
pub mod handoff;
pub mod movement;

pub use display::{DisplayLink, FrameSink, NullSink};
pub use handoff::{Handoff, HandoffState};
pub use movement::{apply_move, plan_move, FallTracker, LodBudget, MotionConfig, MovePlan};

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use parking_lot::RwLock;

use crate::camera::{Camera, Controls, FAR_PLANE};
use crate::error::PipelineError;
use crate::events::{event_channel, EventCode, EventManager, EventSink, GameState, WorldCommand};
use crate::geometry::Viewport;
use crate::perf::{FrameStats, PerfTimer};
use crate::rendering::framebuffer::{DepthBuffer, PixelBuffer, RasterTarget};
use crate::rendering::hit_test::{check_collide, find_nearest, NearestSample};
use crate::rendering::queue::{Generation, Generations, QueuePair, COVERED_CAPACITY, EDGE_CHECKED_CAPACITY};
use crate::rendering::rasterizer::Rasterizer;
use crate::rendering::setup::TriangleSetup;
use crate::rendering::shading::ShadingConfig;
use crate::world::{ChunkChooser, ChunkPick, World};
use crate::count_call;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub viewport: Viewport,
    pub edge_capacity: usize,
    pub covered_capacity: usize,
    pub shading: ShadingConfig,
    pub rasterizer: Rasterizer,
    pub motion: MotionConfig,
    /// Eye height above the ground under it
    pub eye_level: f32,
    /// Time each animation frame of a layer stays up
    pub animation_period: Duration,
    /// Value the depth buffer is reset to every frame
    pub depth_clear: f32,
    /// Feed movement a constant frame time instead of the measured one
    pub fixed_frame_ms: Option<f32>,
    /// Run the event manager thread
    pub events: bool,
    /// Frames between info-level timing summaries
    pub report_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            edge_capacity: EDGE_CHECKED_CAPACITY,
            covered_capacity: COVERED_CAPACITY,
            shading: ShadingConfig::default(),
            rasterizer: Rasterizer::default(),
            motion: MotionConfig::default(),
            eye_level: 1.0,
            animation_period: Duration::from_millis(100),
            depth_clear: FAR_PLANE,
            fixed_frame_ms: None,
            events: true,
            report_every: 100,
        }
    }
}

/// Per-frame input
pub trait ControlSource: Send {
    fn poll(&mut self, frame: u64) -> Controls;
}

impl ControlSource for Controls {
    fn poll(&mut self, _frame: u64) -> Controls {
        *self
    }
}

/// Repeats a list of `(frames, controls)` steps
#[derive(Clone, Debug)]
pub struct ScriptedControls {
    steps: Vec<(u64, Controls)>,
    period: u64,
}

impl ScriptedControls {
    pub fn new(steps: Vec<(u64, Controls)>) -> Self {
        let period = steps.iter().map(|&(n, _)| n).sum();
        Self { steps, period }
    }

    /// Walk forward, turn right for a while, repeat
    pub fn wander() -> Self {
        let right = Controls {
            right_pressed: true,
            ..Controls::idle()
        };
        Self::new(vec![(40, Controls::forward()), (12, right), (8, Controls::idle())])
    }
}

impl ControlSource for ScriptedControls {
    fn poll(&mut self, frame: u64) -> Controls {
        if self.period == 0 {
            return Controls::idle();
        }
        let mut t = frame % self.period;
        for &(n, controls) in &self.steps {
            if t < n {
                return controls;
            }
            t -= n;
        }
        Controls::idle()
    }
}

/// Everything the raster worker needs for one frame. Owned by exactly one
/// thread at a time.
pub struct RasterJob {
    pub generation: Generation,
    pub queues: QueuePair,
    pub pixels: PixelBuffer,
    pub depth: DepthBuffer,
    /// Records drained, filled in by the worker
    pub rasterized: usize,
    pub raster_time: Duration,
}

/// Summary of one world-loop iteration
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub generation: Generation,
    pub frame_ms: f32,
    pub budget: u32,
    pub pixel_estimate: u32,
    /// Records set up this frame
    pub queued: usize,
    /// Records drained by the worker for the previous generation
    pub rasterized: usize,
    pub nearest: NearestSample,
    pub controls: Controls,
    pub eye: Vec3,
    pub direction: Vec3,
}

/// Result of a finished run
pub struct RunSummary {
    pub frames: u64,
    pub camera: Camera,
    pub game: Option<GameState>,
    pub world: World,
    pub sink: Box<dyn FrameSink>,
    pub stats: FrameStats,
}

/// Buffers and motion state owned by the world loop between handoffs.
/// An empty slot means another thread holds that buffer right now.
pub struct FrameContext {
    pub camera: Camera,
    pub generation: Generation,
    pub queues: Generations<Option<QueuePair>>,
    pub pixels: Generations<Option<PixelBuffer>>,
    pub depth: Option<DepthBuffer>,
    pub choosers: Vec<ChunkChooser>,
    pub lod: LodBudget,
    pub fall: FallTracker,
    pub ground: f32,
    pub last_step: f32,
    pub last_impact: EventCode,
    pub handoff: Handoff,
    /// Simulated time driving layer animation
    pub clock: Duration,
}

impl FrameContext {
    pub fn new(world: &World, config: &PipelineConfig) -> Self {
        let viewport = config.viewport;
        let camera = Camera::for_viewport(world.start_eye, world.start_direction, &viewport);
        let ground = world
            .spot_height(camera.eye)
            .unwrap_or(camera.eye.y - config.eye_level);
        Self {
            camera,
            generation: Generation::A,
            queues: Generations::from_fn(|g| Some(QueuePair::new(g, config.edge_capacity, config.covered_capacity))),
            pixels: Generations::from_fn(|_| Some(PixelBuffer::new(viewport.width, viewport.height))),
            depth: Some(DepthBuffer::new(viewport.width, viewport.height, config.depth_clear)),
            choosers: vec![ChunkChooser::new(); world.layers.len()],
            lod: LodBudget::for_pixels(viewport.pixel_count()),
            fall: FallTracker::default(),
            ground,
            last_step: 0.0,
            last_impact: EventCode::NONE,
            handoff: Handoff::new(),
            clock: Duration::ZERO,
        }
    }

    fn missing(&self, event: &'static str) -> PipelineError {
        PipelineError::Handoff {
            state: self.handoff.state(),
            event,
        }
    }

    /// Follow the ground under the eye. A missing height keeps the last one.
    pub fn follow_ground(&mut self, world: &World, eye_level: f32, motion: &MotionConfig) -> Option<EventCode> {
        let Some(height) = world.spot_height(self.camera.eye) else {
            self.camera.eye.y = self.ground + eye_level;
            return None;
        };
        let drop = height - self.ground;
        self.ground = height;
        self.camera.eye.y = height + eye_level;
        self.fall.update(drop, self.last_step, motion)
    }
}

/// Drains jobs until the start channel closes
fn spawn_raster_worker(
    meshes: Arc<[crate::world::Mesh]>,
    rasterizer: Rasterizer,
    jobs: Receiver<RasterJob>,
    done: Sender<RasterJob>,
) -> Result<JoinHandle<()>, PipelineError> {
    std::thread::Builder::new()
        .name("raster".into())
        .spawn(move || {
            let background = rasterizer.fog.background_rgb565();
            for mut job in jobs.iter() {
                let timer = PerfTimer::new("raster");
                job.pixels.clear(background);
                let mut target = RasterTarget::new(&mut job.pixels, &mut job.depth);
                job.rasterized = rasterizer.drain(&job.queues, &meshes, &mut target);
                job.raster_time = timer.elapsed();
                if done.send(job).is_err() {
                    break;
                }
            }
            log::debug!("raster worker stopped");
        })
        .map_err(|source| PipelineError::Spawn { name: "raster", source })
}

struct Links {
    start: Sender<RasterJob>,
    done: Receiver<RasterJob>,
    display: Sender<PixelBuffer>,
    free: Receiver<PixelBuffer>,
    events: Option<EventSink>,
    commands: Option<Receiver<WorldCommand>>,
    game: Option<Arc<RwLock<GameState>>>,
}

pub struct Pipeline {
    world: World,
    config: PipelineConfig,
    controls: Box<dyn ControlSource>,
    sink: Box<dyn FrameSink>,
}

impl Pipeline {
    pub fn new(
        world: World,
        config: PipelineConfig,
        controls: Box<dyn ControlSource>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            world,
            config,
            controls,
            sink,
        }
    }

    /// Run `frames` frames, or until the game ends when `None`.
    pub fn run(self, frames: Option<u64>) -> Result<RunSummary, PipelineError> {
        self.run_with(frames, |_| {})
    }

    /// Like `run`, handing every frame report to `observe`.
    pub fn run_with(
        self,
        frames: Option<u64>,
        mut observe: impl FnMut(&FrameReport),
    ) -> Result<RunSummary, PipelineError> {
        let Pipeline {
            mut world,
            config,
            mut controls,
            sink,
        } = self;

        let (start_tx, start_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let (display_tx, display_rx) = crossbeam_channel::bounded(1);
        let (free_tx, free_rx) = crossbeam_channel::bounded(1);

        let worker = spawn_raster_worker(Arc::clone(world.meshes()), config.rasterizer.clone(), start_rx, done_tx)?;
        let display = DisplayLink::spawn(sink, display_rx, free_tx)?;

        let (manager, events, commands) = if config.events {
            let (sink, event_rx) = event_channel();
            let (command_tx, command_rx) = crossbeam_channel::unbounded();
            let manager = EventManager::spawn(event_rx, command_tx)?;
            (Some(manager), Some(sink), Some(command_rx))
        } else {
            (None, None, None)
        };

        let links = Links {
            start: start_tx,
            done: done_rx,
            display: display_tx,
            free: free_rx,
            events,
            commands,
            game: manager.as_ref().map(EventManager::state),
        };
        if let Some(events) = &links.events {
            events.emit(EventCode::startup());
        }

        let mut ctx = FrameContext::new(&world, &config);
        let mut stats = FrameStats::new(config.report_every);
        let outcome = world_loop(
            &mut world,
            &config,
            controls.as_mut(),
            &mut ctx,
            &links,
            &mut stats,
            frames,
            &mut observe,
        );

        // Closing the channels lets every thread fall out of its loop
        let game = links.game.clone();
        drop(links);
        let worker_joined = worker.join().map_err(|_| PipelineError::WorkerStopped("raster"));
        let sink = display.join();
        if let Some(manager) = manager {
            manager.join()?;
        }

        let frames = outcome?;
        worker_joined?;
        stats.log_summary();
        Ok(RunSummary {
            frames,
            camera: ctx.camera,
            game: game.map(|g| g.read().clone()),
            world,
            sink: sink?,
            stats,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn world_loop(
    world: &mut World,
    config: &PipelineConfig,
    controls: &mut dyn ControlSource,
    ctx: &mut FrameContext,
    links: &Links,
    stats: &mut FrameStats,
    frames: Option<u64>,
    observe: &mut dyn FnMut(&FrameReport),
) -> Result<u64, PipelineError> {
    let mut frame = 0u64;
    let mut frame_ms = config.fixed_frame_ms.unwrap_or(0.0);
    let mut frame_start = Instant::now();

    while frames.map_or(true, |n| frame < n) {
        if let Some(game) = &links.game {
            if game.read().game_over {
                log::warn!("game over, stopping after {} frames", frame);
                break;
            }
        }

        // 1. flip, hand the previous generation to the worker and display
        ctx.generation.flip();
        let g = ctx.generation;
        let mut depth = ctx.depth.take().ok_or_else(|| ctx.missing("take depth"))?;
        depth.clear(config.depth_clear);
        count_call!(depth_clear_calls);
        let job = RasterJob {
            generation: g.other(),
            queues: ctx.queues.take(g.other()).ok_or_else(|| ctx.missing("take queues"))?,
            pixels: ctx.pixels.take(g.other()).ok_or_else(|| ctx.missing("take pixels"))?,
            depth,
            rasterized: 0,
            raster_time: Duration::ZERO,
        };
        ctx.handoff.start()?;
        links
            .start
            .send(job)
            .map_err(|_| PipelineError::WorkerStopped("raster"))?;
        let shown = ctx.pixels.take(g).ok_or_else(|| ctx.missing("take display buffer"))?;
        links
            .display
            .send(shown)
            .map_err(|_| PipelineError::WorkerStopped("display"))?;

        // 2. set up the current generation
        let setup_timer = PerfTimer::new("setup");
        let mut queues = ctx.queues.take(g).ok_or_else(|| ctx.missing("take setup queues"))?;
        queues.reset();

        // 3. ground follow, then the adaptive budget
        if let Some(damage) = ctx.follow_ground(world, config.eye_level, &config.motion) {
            if let Some(events) = &links.events {
                events.emit(damage);
            }
        }
        let budget = ctx.lod.update(frame_ms);
        let input = controls.poll(frame);

        let setup = TriangleSetup::new(&ctx.camera, config.viewport, config.shading);
        let pixel_estimate = setup_visible(world, &setup, ctx, &mut queues, budget, input, config.animation_period);
        let queued = queues.len();
        ctx.queues.restore(g, queues);
        let pixel_estimate = pixel_estimate?;
        let setup_time = setup_timer.elapsed();

        // 4. wait for both buffers to come back
        let wait_timer = Instant::now();
        let job = links
            .done
            .recv()
            .map_err(|_| PipelineError::WorkerStopped("raster"))?;
        ctx.handoff.finish()?;
        let shown = links
            .free
            .recv()
            .map_err(|_| PipelineError::WorkerStopped("display"))?;
        ctx.pixels.restore(g, shown);
        ctx.handoff.swap()?;
        let wait_time = wait_timer.elapsed();

        let RasterJob {
            generation,
            queues: drained,
            pixels,
            depth,
            rasterized,
            raster_time,
        } = job;
        log::trace!("raster of {:?} took {}μs", generation, raster_time.as_micros());

        // 5. collision and movement against what was just drawn
        let nearest = check_collide(&depth, &config.viewport, config.depth_clear);
        let plan = plan_move(input, ctx.camera.direction, frame_ms, nearest.depth, &config.motion);
        if plan.impact {
            match find_nearest(&drained, nearest.x, nearest.y) {
                Some(hit) => {
                    let code = EventCode(world.mesh(hit.mesh).material(hit.face as usize).event);
                    if !code.is_none() && code != ctx.last_impact {
                        ctx.last_impact = code;
                        if let Some(events) = &links.events {
                            events.emit(code);
                        }
                    }
                }
                None => log::debug!("impact at ({}, {}) but no face found", nearest.x, nearest.y),
            }
        }
        if !input.forward_pressed {
            ctx.last_impact = EventCode::NONE;
        }
        apply_move(&mut ctx.camera, &plan);
        ctx.last_step = plan.step.length();

        ctx.queues.restore(generation, drained);
        ctx.pixels.restore(generation, pixels);
        ctx.depth = Some(depth);

        // 6. world changes requested by the event thread
        if let Some(commands) = &links.commands {
            for command in commands.try_iter() {
                match command {
                    WorldCommand::DeleteFaces(code) => {
                        world.delete_faces_with_event(code.0);
                    }
                }
            }
        }

        let report = FrameReport {
            frame,
            generation: g,
            frame_ms,
            budget,
            pixel_estimate,
            queued,
            rasterized,
            nearest,
            controls: input,
            eye: ctx.camera.eye,
            direction: ctx.camera.direction,
        };
        log::debug!("{:?}", report);
        observe(&report);

        let total = frame_start.elapsed();
        stats.record(setup_time, wait_time, total, pixel_estimate, queued);
        frame_ms = config
            .fixed_frame_ms
            .unwrap_or(total.as_secs_f32() * 1000.0);
        ctx.clock += Duration::from_secs_f32(frame_ms.max(0.0) / 1000.0);
        frame_start = Instant::now();
        frame += 1;
    }
    Ok(frame)
}

/// Walk chunks nearest-first across all layers until the sequence runs out,
/// or the budget is spent while the viewer is moving.
fn setup_visible(
    world: &World,
    setup: &TriangleSetup,
    ctx: &mut FrameContext,
    queues: &mut QueuePair,
    budget: u32,
    input: Controls,
    animation_period: Duration,
) -> Result<u32, PipelineError> {
    let mut count = 0u32;
    let eye = ctx.camera.eye;
    let direction = ctx.camera.direction;

    for n in 0.. {
        for (layer, chooser) in world.layers.iter().zip(ctx.choosers.iter_mut()) {
            let frame = &layer.frames[layer.frame_index(ctx.clock, animation_period)];
            match chooser.next(&frame.chunks, eye, direction, n == 0) {
                ChunkPick::Exhausted => return Ok(count),
                ChunkPick::Invalid => {}
                ChunkPick::Chunk(index) => {
                    let mesh = world.mesh(frame.mesh);
                    count = count.saturating_add(setup.setup_chunk(frame.mesh, mesh, &frame.chunks, index, queues)?);
                }
            }
        }
        if count >= budget && input.any_pressed() {
            break;
        }
    }
    Ok(count)
}
