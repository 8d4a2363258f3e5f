/// Chunk grid over the world's horizontal plane.
///
/// Each cell owns the list of faces that touch it. A face may sit in several
/// cells, the order inside a list carries no meaning, and removal swaps the
/// last entry into the hole so lists never have gaps.
use glam::{IVec2, Vec3};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkGrid {
    pub xmin: i32,
    pub zmin: i32,
    pub xcount: i32,
    pub zcount: i32,
    /// Cell edge length in world units
    pub size: i32,
    cells: Vec<Vec<u16>>,
}

impl ChunkGrid {
    /// Empty grid. Dimensions must be positive.
    pub fn new(xmin: i32, zmin: i32, xcount: i32, zcount: i32, size: i32) -> Self {
        debug_assert!(xcount > 0 && zcount > 0 && size > 0);
        let cells = vec![Vec::new(); (xcount.max(0) * zcount.max(0)) as usize];
        Self {
            xmin,
            zmin,
            xcount,
            zcount,
            size,
            cells,
        }
    }

    /// Grid with pre-built face lists in row-major (x fastest) order.
    /// Returns None if the list count does not match the dimensions.
    pub fn from_cells(
        xmin: i32,
        zmin: i32,
        xcount: i32,
        zcount: i32,
        size: i32,
        cells: Vec<Vec<u16>>,
    ) -> Option<Self> {
        if xcount <= 0 || zcount <= 0 || size <= 0 || cells.len() != (xcount * zcount) as usize {
            return None;
        }
        Some(Self {
            xmin,
            zmin,
            xcount,
            zcount,
            size,
            cells,
        })
    }

    /// Cell coordinates containing a world position (may be out of range)
    #[inline]
    pub fn chunk_coords(&self, pos: Vec3) -> IVec2 {
        let size = self.size as f32;
        IVec2::new(
            ((pos.x - self.xmin as f32) / size).floor() as i32,
            ((pos.z - self.zmin as f32) / size).floor() as i32,
        )
    }

    /// Linear index of a cell, or None outside the grid
    #[inline]
    pub fn index_of(&self, coords: IVec2) -> Option<usize> {
        if coords.x >= 0 && coords.x < self.xcount && coords.y >= 0 && coords.y < self.zcount {
            Some((coords.x + self.xcount * coords.y) as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn chunk_at(&self, pos: Vec3) -> Option<usize> {
        self.index_of(self.chunk_coords(pos))
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Faces of one cell; empty for an unknown index
    #[inline]
    pub fn faces(&self, index: usize) -> &[u16] {
        self.cells.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cells(&self) -> &[Vec<u16>] {
        &self.cells
    }

    pub fn push_face(&mut self, index: usize, face: u16) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.push(face);
        }
    }

    /// Remove every face matching `doomed` from every cell, swapping the last
    /// entry into each hole. Returns how many entries were removed.
    pub fn remove_faces_where(&mut self, mut doomed: impl FnMut(u16) -> bool) -> usize {
        let mut removed = 0;
        for cell in &mut self.cells {
            let mut i = 0;
            while i < cell.len() {
                if doomed(cell[i]) {
                    cell.swap_remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        }
        removed
    }

    pub fn total_entries(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Largest face index referenced by any cell
    pub fn max_face(&self) -> Option<u16> {
        self.cells.iter().flatten().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_maps_to_expected_cell() {
        let grid = ChunkGrid::new(0, 0, 4, 4, 10);
        let eye = Vec3::new(25.0, 0.0, 15.0);
        assert_eq!(grid.chunk_coords(eye), IVec2::new(2, 1));
        assert_eq!(grid.chunk_at(eye), Some(6));
    }

    #[test]
    fn negative_origin_and_out_of_range() {
        let grid = ChunkGrid::new(-20, -20, 4, 4, 10);
        assert_eq!(grid.chunk_at(Vec3::new(-20.0, 0.0, -20.0)), Some(0));
        assert_eq!(grid.chunk_at(Vec3::new(-20.5, 0.0, 0.0)), None);
        assert_eq!(grid.chunk_at(Vec3::new(20.0, 0.0, 0.0)), None);
        assert!(grid.faces(99).is_empty());
    }

    #[test]
    fn removal_swaps_last_into_hole() {
        let mut grid = ChunkGrid::from_cells(0, 0, 1, 1, 1, vec![vec![1, 2, 3, 2, 4]])
            .expect("valid grid");
        let removed = grid.remove_faces_where(|f| f == 2);
        assert_eq!(removed, 2);
        assert_eq!(grid.faces(0), &[1, 4, 3]);
    }
}
