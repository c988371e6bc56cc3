//! Contiguous runs of chunks on the ring.
//!
//! A run that crosses the 0/N seam is stored as one circular interval but exposed as (at most)
//! two plain ascending spans, because that is what storage backends can actually scan.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;

use super::coords::{ChunkIndex, ChunkKey, Floor};
use super::space::RingSpace;

/// An inclusive, non-wrapping run of chunk indices, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSpan {
    /// First chunk
    pub start: ChunkIndex,
    /// Last chunk, inclusive
    pub end: ChunkIndex,
}

impl ChunkSpan {
    /// Number of chunks in the span
    pub fn len(&self) -> usize {
        (self.end.get() - self.start.get()) as usize + 1
    }
    /// Spans always hold at least one chunk
    pub fn is_empty(&self) -> bool {
        false
    }
    /// Whether the span holds an index
    pub fn contains(&self, index: ChunkIndex) -> bool {
        self.start <= index && index <= self.end
    }
    /// Indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = ChunkIndex> + Clone {
        (self.start.get()..=self.end.get()).map(ChunkIndex::new_unchecked)
    }
}

/// A circular run of chunks on one floor, anchored at a center chunk inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    /// The floor every chunk is on
    floor: Floor,
    /// Lowest chunk, walking upwards (wrapping) from here covers the range
    first: ChunkIndex,
    /// Number of chunks, between 1 and N
    len: u32,
    /// Where iteration starts
    center: ChunkIndex,
    /// `N`
    chunk_count: u32,
}

/* =========================================
 *           Construction
 * ========================================= */
impl ChunkRange {
    /// The inclusive run `first ..= last`, wrapping past `N - 1` when `last < first`.
    /// `center` must lie inside the run, otherwise iteration starts at `first`.
    pub fn between(
        space: &RingSpace,
        first: ChunkIndex,
        last: ChunkIndex,
        center: ChunkIndex,
        floor: Floor,
    ) -> Self {
        let n = space.chunk_count();
        let len = ((last.as_i64() - first.as_i64()).rem_euclid(n as i64) + 1) as u32;
        let mut range = Self {
            floor,
            first,
            len,
            center: first,
            chunk_count: n,
        };
        if range.contains(center) {
            range.center = center;
        }
        range
    }

    /// Every chunk on the ring, iterated starting from `center`
    pub fn full(space: &RingSpace, center: ChunkIndex, floor: Floor) -> Self {
        Self {
            floor,
            first: ChunkIndex::ZERO,
            len: space.chunk_count(),
            center,
            chunk_count: space.chunk_count(),
        }
    }
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl ChunkRange {
    /// The floor
    pub fn floor(&self) -> Floor {
        self.floor
    }
    /// The chunk iteration starts from
    pub fn center(&self) -> ChunkIndex {
        self.center
    }
    /// Lowest chunk of the run, the `lo` of `[lo, hi]`
    pub fn first(&self) -> ChunkIndex {
        self.first
    }
    /// Highest chunk of the run, the `hi` of `[lo, hi]`
    pub fn last(&self) -> ChunkIndex {
        self.index_at(self.len - 1)
    }
    /// Number of chunks
    pub fn len(&self) -> usize {
        self.len as usize
    }
    /// Ranges always hold at least one chunk
    pub fn is_empty(&self) -> bool {
        false
    }
    /// Whether the range is the whole ring
    pub fn is_full_ring(&self) -> bool {
        self.len == self.chunk_count
    }
    /// Whether the range crosses the 0/N seam
    pub fn wraps(&self) -> bool {
        !self.is_full_ring() && self.first.get() as u64 + self.len as u64 > self.chunk_count as u64
    }
}

/* =========================================
 *           Membership and Iteration
 * ========================================= */
impl ChunkRange {
    /// How far `index` is above `first`, walking upwards
    fn offset_of(&self, index: ChunkIndex) -> u32 {
        (index.as_i64() - self.first.as_i64()).rem_euclid(self.chunk_count as i64) as u32
    }

    /// The chunk `offset` steps above `first`
    fn index_at(&self, offset: u32) -> ChunkIndex {
        let raw = (self.first.get() as u64 + offset as u64) % self.chunk_count as u64;
        ChunkIndex::new_unchecked(raw as u32)
    }

    /// Whether the range holds a chunk
    pub fn contains(&self, index: ChunkIndex) -> bool {
        index.get() < self.chunk_count && self.offset_of(index) < self.len
    }

    /// The non-wrapping spans that make up the range, in ascending index order.
    /// One span normally, two when the range crosses the seam.
    pub fn spans(&self) -> Vec<ChunkSpan> {
        if !self.wraps() {
            return vec![ChunkSpan {
                start: self.first,
                end: self.last(),
            }];
        }
        vec![
            ChunkSpan {
                start: ChunkIndex::ZERO,
                end: self.last(),
            },
            ChunkSpan {
                start: self.first,
                end: ChunkIndex::new_unchecked(self.chunk_count - 1),
            },
        ]
    }

    /// Chunks in ascending wrapped order starting at the center: up to the top of the range,
    /// then from the bottom of the range back up to just below the center
    pub fn iter(&self) -> impl Iterator<Item = ChunkIndex> + '_ {
        let c = self.offset_of(self.center);
        (c..self.len).chain(0..c).map(move |o| self.index_at(o))
    }

    /// Chunks nearest first: center, +1, -1, +2, -2, ...
    pub fn iter_outward(&self) -> impl Iterator<Item = ChunkIndex> + '_ {
        let c = self.offset_of(self.center);
        std::iter::once(c)
            .chain((c + 1..self.len).interleave((0..c).rev()))
            .map(move |o| self.index_at(o))
    }

    /// Like [`ChunkRange::iter`] but paired with the floor
    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.iter().map(move |index| ChunkKey::new(index, self.floor))
    }
}
