/// Error types for asset loading, queueing and the render pipeline
use crate::rendering::queue::QueueKind;
use thiserror::Error;

/// Problems found while validating a world or texture blob.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("read of {len} bytes at offset {offset:#x} runs past the end of a {size} byte blob")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("layout descriptor {descriptor:#010x} at offset {offset:#x} is missing the layout flag")]
    BadDescriptor { descriptor: u32, offset: usize },

    #[error("layout descriptor at offset {offset:#x} declares zero frames")]
    NoFrames { offset: usize },

    #[error("palette entry {entry} has unknown type {kind}")]
    UnknownPaletteType { entry: usize, kind: u32 },

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },

    #[error("texture at offset {offset:#x} has zero size ({width}x{height})")]
    EmptyTexture { offset: usize, width: u32, height: u32 },

    #[error("chunk grid has invalid dimensions {xcount}x{zcount} with cell size {size}")]
    BadChunkGrid { xcount: i16, zcount: i16, size: i16 },

    #[error("world blob declares no layouts")]
    NoLayouts,
}

/// A fixed-capacity triangle queue had no room left.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind:?} queue full at capacity {capacity}")]
pub struct QueueFull {
    pub kind: QueueKind,
    pub capacity: usize,
}

/// Fatal conditions of the running pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("triangle queue overflow: {0}")]
    QueueOverflow(#[from] QueueFull),

    #[error("{0} thread stopped unexpectedly")]
    WorkerStopped(&'static str),

    #[error("handoff violation: cannot {event} while {state:?}")]
    Handoff {
        state: crate::pipeline::HandoffState,
        event: &'static str,
    },

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
