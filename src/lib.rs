pub mod asset;
pub mod camera;
pub mod error;
pub mod events;
pub mod geometry;
pub mod perf;
pub mod pipeline;
/// Chunk Raster - software rasterizer for chunked triangle worlds
/// Homogeneous 2D rasterization into RGB565, fed chunk by chunk from the eye outwards
pub mod rendering;
pub mod world;

pub use asset::load_world;
pub use camera::{Camera, Controls};
pub use error::{AssetError, PipelineError, QueueFull};
pub use events::{EventCode, EventManager, EventSink, GameState, WorldCommand};
pub use geometry::{Rect, Viewport};
pub use perf::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};
pub use pipeline::{ControlSource, FrameReport, FrameSink, NullSink, Pipeline, PipelineConfig, ScriptedControls};
pub use rendering::{PixelBuffer, Rasterizer, ShadingConfig, TriangleSetup};
pub use world::{ChunkGrid, World};
