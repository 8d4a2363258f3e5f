/// Software rasterization pipeline: clip classification, triangle setup and
/// tiling, double-buffered work queues, scan conversion and hit-testing.
pub mod clip;
pub mod fog;
pub mod framebuffer;
pub mod queue;
pub mod rasterizer;
pub mod setup;
pub mod shading;
pub mod texture;

pub use clip::{classify, ClipOutcome};
pub use fog::Fog;
pub use framebuffer::{DepthBuffer, PixelBuffer, RasterTarget};
pub use hit_test::{check_collide, check_hit_face, check_hit_tile, find_nearest, FaceHit, NearestSample};
pub use queue::{Generation, Generations, QueueKind, QueuePair, TriangleQueue};
pub use rasterizer::Rasterizer;
pub use setup::{RenderRecord, TriangleSetup, TILE_SIZE};
pub use shading::{Shade, ShadingConfig};
pub use texture::Texture;
