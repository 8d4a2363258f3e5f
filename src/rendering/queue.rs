/// Fixed-capacity work queues between triangle setup and rasterization.
///
/// Two queue kinds per generation, two generations: while the raster worker
/// drains one generation's pair, the world loop fills the other. Storage is
/// allocated once; a reset only rewinds the length.
use std::ops::{Index, IndexMut};

use crate::error::QueueFull;
use crate::rendering::setup::RenderRecord;

pub const EDGE_CHECKED_CAPACITY: usize = 6000;
pub const COVERED_CAPACITY: usize = 5000;

/// Which rasterizer path a record needs
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Whole accepted triangles and partially covered tiles
    EdgeChecked,
    /// Tiles the triangle covers completely
    Covered,
}

/// Ping-pong flag selecting a framebuffer/queue generation
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Generation {
    #[default]
    A,
    B,
}

impl Generation {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Generation::A => Generation::B,
            Generation::B => Generation::A,
        }
    }

    #[inline]
    pub fn flip(&mut self) {
        *self = self.other();
    }

    #[inline]
    fn slot(self) -> usize {
        match self {
            Generation::A => 0,
            Generation::B => 1,
        }
    }
}

/// Two values, one per generation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generations<T>([T; 2]);

impl<T> Generations<T> {
    pub fn new(a: T, b: T) -> Self {
        Self([a, b])
    }

    pub fn from_fn(mut f: impl FnMut(Generation) -> T) -> Self {
        Self([f(Generation::A), f(Generation::B)])
    }
}

impl<T> Generations<Option<T>> {
    /// Take ownership of one generation's value, leaving the slot empty
    pub fn take(&mut self, generation: Generation) -> Option<T> {
        self[generation].take()
    }

    /// Return a value to its slot. Returns the previous occupant, if any.
    pub fn restore(&mut self, generation: Generation, value: T) -> Option<T> {
        self[generation].replace(value)
    }
}

impl<T> Index<Generation> for Generations<T> {
    type Output = T;

    fn index(&self, generation: Generation) -> &T {
        &self.0[generation.slot()]
    }
}

impl<T> IndexMut<Generation> for Generations<T> {
    fn index_mut(&mut self, generation: Generation) -> &mut T {
        &mut self.0[generation.slot()]
    }
}

/// Bounded, reusable list of render records
pub struct TriangleQueue {
    kind: QueueKind,
    records: Vec<RenderRecord>,
    capacity: usize,
}

impl TriangleQueue {
    pub fn new(kind: QueueKind, capacity: usize) -> Self {
        Self {
            kind,
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, returning its bounding-box pixel estimate.
    pub fn push(&mut self, record: RenderRecord) -> Result<u32, QueueFull> {
        if self.records.len() >= self.capacity {
            return Err(QueueFull {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        let estimate = record.bbox.area();
        self.records.push(record);
        Ok(estimate)
    }

    /// O(1): records are plain data, so clearing only rewinds the length
    #[inline]
    pub fn reset(&mut self) {
        self.records.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[RenderRecord] {
        &self.records
    }
}

/// The two queues belonging to one generation
pub struct QueuePair {
    pub generation: Generation,
    pub edge_checked: TriangleQueue,
    pub covered: TriangleQueue,
}

impl QueuePair {
    pub fn new(generation: Generation, edge_capacity: usize, covered_capacity: usize) -> Self {
        Self {
            generation,
            edge_checked: TriangleQueue::new(QueueKind::EdgeChecked, edge_capacity),
            covered: TriangleQueue::new(QueueKind::Covered, covered_capacity),
        }
    }

    pub fn with_default_capacity(generation: Generation) -> Self {
        Self::new(generation, EDGE_CHECKED_CAPACITY, COVERED_CAPACITY)
    }

    #[inline]
    pub fn push(&mut self, kind: QueueKind, record: RenderRecord) -> Result<u32, QueueFull> {
        self.queue_mut(kind).push(record)
    }

    #[inline]
    pub fn queue(&self, kind: QueueKind) -> &TriangleQueue {
        match kind {
            QueueKind::EdgeChecked => &self.edge_checked,
            QueueKind::Covered => &self.covered,
        }
    }

    #[inline]
    pub fn queue_mut(&mut self, kind: QueueKind) -> &mut TriangleQueue {
        match kind {
            QueueKind::EdgeChecked => &mut self.edge_checked,
            QueueKind::Covered => &mut self.covered,
        }
    }

    pub fn reset(&mut self) {
        self.edge_checked.reset();
        self.covered.reset();
    }

    pub fn len(&self) -> usize {
        self.edge_checked.len() + self.covered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_checked.is_empty() && self.covered.is_empty()
    }
}
