//! The coordinate types of the ring.
//! None of these do arithmetic on their own, that all lives in [`super::space::RingSpace`]
//! so there is exactly one place that knows about the wrap.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// A canonical position along the ring in meters, always in `[0, C)`.
///
/// There is deliberately no public constructor and no `Add`/`Sub`: get one from
/// [`RingSpace::wrap_position`](super::space::RingSpace::wrap_position) and compare two of
/// them with [`RingSpace::distance_between`](super::space::RingSpace::distance_between).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize)]
#[serde(transparent)]
pub struct RingPosition(f64);

impl RingPosition {
    /// The start of the ring
    pub const ZERO: Self = Self(0.0);

    /// Wraps an already canonical value. Callers must guarantee `0 <= meters < C`.
    pub(crate) fn new_unchecked(meters: f64) -> Self {
        Self(meters)
    }

    /// The position in meters
    pub fn meters(self) -> f64 {
        self.0
    }
}

/// The index of a chunk, always in `[0, N)`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ChunkIndex(u32);

impl ChunkIndex {
    /// The first chunk, which starts at ring position 0
    pub const ZERO: Self = Self(0);

    /// Wraps an already canonical index. Callers must guarantee `index < N`.
    pub(crate) fn new_unchecked(index: u32) -> Self {
        Self(index)
    }

    /// The raw index
    pub fn get(self) -> u32 {
        self.0
    }

    /// The raw index, for slicing and arithmetic
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

/// A vertical level. Floor 0 is the primary level, negative floors are below it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Floor(pub i32);

impl Floor {
    /// The primary level
    pub const PRIMARY: Self = Self(0);
}

/// Addresses one chunk on one floor, the unit of storage and streaming.
/// Renders as `"{floor}_{index}"`, the id format streaming clients use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[display(fmt = "{}_{}", floor, index)]
pub struct ChunkKey {
    /// Which floor
    pub floor: Floor,
    /// Which chunk around the ring
    pub index: ChunkIndex,
}

impl ChunkKey {
    /// Pairs a chunk with a floor
    pub fn new(index: ChunkIndex, floor: Floor) -> Self {
        Self { floor, index }
    }
}
