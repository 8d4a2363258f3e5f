/// Chunk visiting order: nearest cells first, biased towards where the eye
/// is looking.
///
/// The flattened view direction selects one of eight 45° sectors; each sector
/// has a hand-tuned list of 32 cell offsets relative to the eye's cell.
use std::f32::consts::PI;

use glam::{IVec2, Vec3};

use super::chunk::ChunkGrid;

pub const SECTORS: usize = 8;
pub const SEQUENCE_LEN: usize = 32;

/// Result of asking for the next chunk to process
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkPick {
    Chunk(usize),
    /// Offset falls outside the grid; nothing to draw there
    Invalid,
    /// Sequence used up; stop asking
    Exhausted,
}

impl ChunkPick {
    pub fn index(self) -> Option<usize> {
        match self {
            ChunkPick::Chunk(i) => Some(i),
            _ => None,
        }
    }
}

#[rustfmt::skip]
static CHUNK_SEQUENCE: [[(i8, i8); SEQUENCE_LEN]; SECTORS] = [
    [(0,0),(0,1),(-1,1),(-1,0),(1,0),(0,2),(-1,2),(1,1),(-2,1),(-2,0),(1,2),(-2,2),(2,3),(-3,1),(0,3),(1,3),
     (-1,3),(2,3),(-2,3),(-3,2),(0,4),(-1,4),(1,4),(-2,4),(2,4),(-3,3),(-4,2),(3,4),(-3,4),(-4,3),(0,5),(-1,5)],
    [(0,0),(-1,0),(-1,1),(0,1),(0,-1),(-2,0),(-2,1),(-1,-1),(-1,2),(0,2),(-2,-1),(-2,2),(-3,-2),(-1,3),(-3,0),(-3,-1),
     (-3,1),(-3,-2),(-3,2),(-2,3),(-4,0),(-4,1),(-4,-1),(-4,2),(-4,-2),(-3,3),(-2,4),(-4,-3),(-4,3),(-3,4),(-5,0),(-5,1)],
    [(0,0),(-1,0),(-1,-1),(0,-1),(0,1),(-2,0),(-2,-1),(-1,1),(-1,-2),(0,-2),(-2,1),(-2,-2),(-3,2),(-1,-3),(-3,0),(-3,1),
     (-3,-1),(-3,2),(-3,-2),(-2,-3),(-4,0),(-4,-1),(-4,1),(-4,-2),(-4,2),(-3,-3),(-2,-4),(-4,3),(-4,-3),(-3,-4),(-5,0),(-5,-1)],
    [(0,0),(0,-1),(-1,-1),(-1,0),(1,0),(0,-2),(-1,-2),(1,-1),(-2,-1),(-2,0),(1,-2),(-2,-2),(2,-3),(-3,-1),(0,-3),(1,-3),
     (-1,-3),(2,-3),(-2,-3),(-3,-2),(0,-4),(-1,-4),(1,-4),(-2,-4),(2,-4),(-3,-3),(-4,-2),(3,-4),(-3,-4),(-4,-3),(0,-5),(-1,-5)],
    [(0,0),(0,-1),(1,-1),(1,0),(-1,0),(0,-2),(1,-2),(-1,-1),(2,-1),(2,0),(-1,-2),(2,-2),(-2,-3),(3,-1),(0,-3),(-1,-3),
     (1,-3),(-2,-3),(2,-3),(3,-2),(0,-4),(1,-4),(-1,-4),(2,-4),(-2,-4),(3,-3),(4,-2),(-3,-4),(3,-4),(4,-3),(0,-5),(1,-5)],
    [(0,0),(1,0),(1,-1),(0,-1),(0,1),(2,0),(2,-1),(1,1),(1,-2),(0,-2),(2,1),(2,-2),(3,2),(1,-3),(3,0),(3,1),
     (3,-1),(3,2),(3,-2),(2,-3),(4,0),(4,-1),(4,1),(4,-2),(4,2),(3,-3),(2,-4),(4,3),(4,-3),(3,-4),(5,0),(5,-1)],
    [(0,0),(1,0),(1,1),(0,1),(0,-1),(2,0),(2,1),(1,-1),(1,2),(0,2),(2,-1),(2,2),(3,-2),(1,3),(3,0),(3,-1),
     (3,1),(3,-2),(3,2),(2,3),(4,0),(4,1),(4,-1),(4,2),(4,-2),(3,3),(2,4),(4,-3),(4,3),(3,4),(5,0),(5,1)],
    [(0,0),(0,1),(1,1),(1,0),(-1,0),(0,2),(1,2),(-1,1),(2,1),(2,0),(-1,2),(2,2),(-2,3),(3,1),(0,3),(-1,3),
     (1,3),(-2,3),(2,3),(3,2),(0,4),(1,4),(-1,4),(2,4),(-2,4),(3,3),(4,2),(-3,4),(3,4),(4,3),(0,5),(1,5)],
];

/// Which of the eight sectors the view direction points into.
///
/// Angle is measured from the reference axis (0, -1) in XZ, on the direction
/// flattened to y = 0.
pub fn sector_for(direction: Vec3) -> usize {
    let d = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
    let dot = -d.z;
    let det = d.x;
    let angle = det.atan2(dot) + PI; // 0..2π
    let sector = (angle * SECTORS as f32 / (2.0 * PI)).floor() as usize;
    sector % SECTORS
}

#[inline]
fn resolve(grid: &ChunkGrid, origin: IVec2, sector: usize, n: usize) -> ChunkPick {
    let Some(&(dx, dz)) = CHUNK_SEQUENCE[sector].get(n) else {
        return ChunkPick::Exhausted;
    };
    let target = origin + IVec2::new(dx as i32, dz as i32);
    match grid.index_of(target) {
        Some(index) => ChunkPick::Chunk(index),
        None => ChunkPick::Invalid,
    }
}

/// Stateless pick of the `n`th chunk for an eye and view direction.
pub fn pick_indexed(grid: &ChunkGrid, eye: Vec3, direction: Vec3, n: usize) -> ChunkPick {
    resolve(grid, grid.chunk_coords(eye), sector_for(direction), n)
}

/// Cached chooser state: sector and origin cell are recomputed only when the
/// caller reports movement, then successive calls walk the sequence.
#[derive(Clone, Debug, Default)]
pub struct ChunkChooser {
    sector: usize,
    origin: IVec2,
    cursor: usize,
    primed: bool,
}

impl ChunkChooser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next chunk in the sequence. `moved` resamples eye and direction and
    /// rewinds to the start of the sequence.
    pub fn next(&mut self, grid: &ChunkGrid, eye: Vec3, direction: Vec3, moved: bool) -> ChunkPick {
        if moved || !self.primed {
            self.sector = sector_for(direction);
            self.origin = grid.chunk_coords(eye);
            self.cursor = 0;
            self.primed = true;
        }
        let pick = resolve(grid, self.origin, self.sector, self.cursor);
        if pick != ChunkPick::Exhausted {
            self.cursor += 1;
        }
        pick
    }

    pub fn sector(&self) -> usize {
        self.sector
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_down_negative_z_is_sector_four() {
        // atan2(0, 1) + π = π -> sector 4
        assert_eq!(sector_for(Vec3::NEG_Z), 4);
        assert_eq!(sector_for(Vec3::Z), 0);
    }

    #[test]
    fn every_sector_starts_at_the_eye_cell() {
        for sector in CHUNK_SEQUENCE.iter() {
            assert_eq!(sector[0], (0, 0));
        }
    }

    #[test]
    fn vertical_direction_still_yields_a_sector() {
        let s = sector_for(Vec3::Y);
        assert!(s < SECTORS);
    }
}
