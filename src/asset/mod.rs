//! Binary world and texture blobs.
//!
//! Both blobs are little-endian and position independent: every pointer is a
//! byte offset. The world blob starts with the viewer's start pose followed by
//! a zero-terminated list of layout descriptors:
//!
//! | Offset | Type       | Content                                              |
//! |--------|------------|------------------------------------------------------|
//! | 0x00   | `[f32; 3]` | Start eye position                                   |
//! | 0x0c   | `[f32; 3]` | Start view direction                                 |
//! | 0x18   | `u32`      | Descriptor: `LAYOUT_FLAG` set, frame count in bits 16..24 |
//! | ...    | `u32` × n  | Frame offsets from the blob start                    |
//! | ...    | `u32`      | Next descriptor, or `0` to end the list              |
//!
//! Each frame begins with seven `u32` offsets from the frame start:
//!
//! | Field       | Points at                                                  |
//! |-------------|------------------------------------------------------------|
//! | vertices    | `[f32; 3]` per vertex                                      |
//! | indices     | `u16` × 3 per face                                         |
//! | uvs         | `[f32; 2]` per texture vertex                              |
//! | uv indices  | `u16` × 3 per face                                         |
//! | attributes  | `u16` palette entry per face                               |
//! | palette     | `u32` count, then `{ type, parameter, event }` as `u32`s   |
//! | chunks      | `i16` xmin, zmin, xcount, zcount, size, pad; then `{ u32 offset, u32 count }` per cell, offsets from the chunk header |
//!
//! Array lengths are not stored; they follow from the largest index in use.
//!
//! A texture blob entry holds a `u32` pixel offset (relative to the entry) at
//! `+0`, a `u16` width at `+4` and a `u16` height at `+8`; pixels are `u32`
//! `0x00RRGGBB`, row-major.
pub mod reader;
pub mod writer;

pub use reader::load_world;
pub use writer::{FrameData, PaletteEntry, TextureBlobBuilder, WorldBlobBuilder};

/// Set in every layout descriptor
pub const LAYOUT_FLAG: u32 = 0x1000_0000;
/// Palette entry type: plain colour
pub const PAL_PLAIN: u32 = 1;
/// Palette entry type: texture offset
pub const PAL_TEXOFF: u32 = 2;

pub(crate) const WORLD_HEADER_SIZE: usize = 24;
pub(crate) const FRAME_HEADER_SIZE: usize = 28;
pub(crate) const CHUNK_HEADER_SIZE: usize = 12;
pub(crate) const PALETTE_ENTRY_SIZE: usize = 12;
pub(crate) const TEXTURE_HEADER_SIZE: usize = 12;
