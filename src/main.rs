/// Headless demo: generates a terrain world, walks a scripted route through it
/// and writes the last presented frame to a PNG.
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use chunk_raster::pipeline::{FrameSink, Pipeline, PipelineConfig, ScriptedControls};
use chunk_raster::rendering::PixelBuffer;
use chunk_raster::world::terrain::{build_world, TerrainConfig};
use chunk_raster::FUNCTION_COUNTERS;

/// Software rasterizer demo over a procedural chunked world
#[derive(Debug, Clone, FromArgs)]
struct CliOptions {
    /// number of frames to render; runs until game over when omitted
    #[argh(option, short = 'n')]
    frames: Option<u64>,
    /// write the last presented frame here
    #[argh(option, short = 'o', default = "PathBuf::from(\"frame.png\")")]
    output: PathBuf,
    /// terrain seed
    #[argh(option, default = "12345")]
    seed: u32,
    /// terrain size in cells per side
    #[argh(option, default = "48")]
    size: u32,
    /// disable the event manager
    #[argh(switch)]
    no_events: bool,
}

/// Keeps the most recent frame and writes it out when dropped
struct PngSink {
    path: PathBuf,
    last: Option<PixelBuffer>,
    presented: u64,
}

impl PngSink {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            last: None,
            presented: 0,
        }
    }

    fn save(&self, frame: &PixelBuffer) -> Result<(), image::ImageError> {
        let rgb = frame.to_rgb8();
        let Some(img) = image::RgbImage::from_raw(frame.width as u32, frame.height as u32, rgb) else {
            log::error!("frame buffer does not match {}x{}", frame.width, frame.height);
            return Ok(());
        };
        img.save(&self.path)
    }
}

impl FrameSink for PngSink {
    fn present(&mut self, frame: &PixelBuffer) {
        self.presented += 1;
        match &mut self.last {
            Some(last) => last.pixels.copy_from_slice(&frame.pixels),
            None => self.last = Some(frame.clone()),
        }
    }
}

impl Drop for PngSink {
    fn drop(&mut self) {
        let Some(frame) = self.last.take() else {
            return;
        };
        match self.save(&frame) {
            Ok(()) => log::info!("wrote frame {} to {}", self.presented, self.path.display()),
            Err(e) => log::error!("failed to write {}: {}", self.path.display(), e),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options: CliOptions = argh::from_env();

    let terrain = TerrainConfig {
        size: options.size,
        seed: options.seed,
        ..TerrainConfig::default()
    };
    let world = match build_world(&terrain) {
        Ok(world) => world,
        Err(e) => {
            log::error!("world generation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = PipelineConfig {
        events: !options.no_events,
        ..PipelineConfig::default()
    };
    log::info!(
        "{}x{} viewport, {} layers, start at {:?}",
        config.viewport.width,
        config.viewport.height,
        world.layers.len(),
        world.start_eye
    );

    FUNCTION_COUNTERS.reset();
    let pipeline = Pipeline::new(
        world,
        config,
        Box::new(ScriptedControls::wander()),
        Box::new(PngSink::new(options.output)),
    );

    match pipeline.run(options.frames) {
        Ok(summary) => {
            if let Some(game) = &summary.game {
                log::info!(
                    "{} frames, health {}, score {}{}",
                    summary.frames,
                    game.health,
                    game.score,
                    if game.game_over { " (game over)" } else { "" }
                );
            }
            if cfg!(feature = "profiling") {
                FUNCTION_COUNTERS.snapshot().log_report();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("pipeline stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
