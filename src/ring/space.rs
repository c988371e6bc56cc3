//! Wraparound arithmetic for the ring.
//!
//! Every modulo and every subtraction of two ring positions in the crate happens in here.
//! A naive `a - b` is wrong near the 0/C seam, so nothing outside this module compares raw
//! coordinates.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use num_traits::ToPrimitive;

use super::coords::{ChunkIndex, ChunkKey, Floor, RingPosition};
use crate::config::RingConfig;
use crate::error::{ensure_finite, RingError, Result};

/// The circular coordinate space: circumference `C` split into `N` chunks of length `L`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSpace {
    /// `C`, in meters
    circumference: f64,
    /// `L`, in meters
    chunk_length: f64,
    /// `N = C / L`
    chunk_count: u32,
}

impl Default for RingSpace {
    fn default() -> Self {
        Self {
            circumference: crate::config::DEFAULT_CIRCUMFERENCE,
            chunk_length: crate::config::DEFAULT_CHUNK_LENGTH,
            chunk_count: (crate::config::DEFAULT_CIRCUMFERENCE
                / crate::config::DEFAULT_CHUNK_LENGTH) as u32,
        }
    }
}

/* =========================================
 *           Construction
 * ========================================= */
impl RingSpace {
    /// Builds the space from a circumference and a chunk length that tiles it exactly
    pub fn new(circumference: f64, chunk_length: f64) -> Result<Self> {
        if !circumference.is_finite() || circumference <= 0.0 {
            return Err(RingError::invalid_argument(
                "circumference",
                format!("must be finite and positive, got {}", circumference),
            ));
        }
        if !chunk_length.is_finite() || chunk_length <= 0.0 || chunk_length > circumference {
            return Err(RingError::invalid_argument(
                "chunk_length",
                format!(
                    "must be positive and at most the circumference, got {}",
                    chunk_length
                ),
            ));
        }
        let chunks = circumference / chunk_length;
        if (chunks - chunks.round()).abs() > 1e-9 {
            return Err(RingError::invalid_argument(
                "chunk_length",
                format!("{} does not tile a ring of {}", chunk_length, circumference),
            ));
        }
        let chunk_count = chunks.round().to_u32().ok_or_else(|| {
            RingError::invalid_argument("chunk_length", format!("{} chunks is too many", chunks))
        })?;
        Ok(Self {
            circumference,
            chunk_length,
            chunk_count,
        })
    }

    /// Builds the space described by a deployment config
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        Self::new(config.circumference, config.chunk_length)
    }
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl RingSpace {
    /// `C`, the ring circumference in meters
    pub fn circumference(&self) -> f64 {
        self.circumference
    }
    /// `L`, the chunk length in meters
    pub fn chunk_length(&self) -> f64 {
        self.chunk_length
    }
    /// `N`, the number of chunks around the ring
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }
    /// `C / 2`, the furthest two positions can ever be apart
    pub fn half_circumference(&self) -> f64 {
        self.circumference / 2.0
    }
}

/* =========================================
 *           Wrapping
 * ========================================= */
impl RingSpace {
    /// Maps any finite position into `[0, C)`. `-1000` on the default ring is `263,999,000`.
    pub fn wrap_position(&self, position: f64) -> Result<RingPosition> {
        let position = ensure_finite(position)?;
        let mut wrapped = position.rem_euclid(self.circumference);
        // rem_euclid rounds tiny negatives up to exactly C, and keeps the sign of -0.0
        if wrapped >= self.circumference || wrapped == 0.0 {
            wrapped = 0.0;
        }
        Ok(RingPosition::new_unchecked(wrapped))
    }

    /// Maps any chunk index into `[0, N)`. `-1` is the last chunk.
    pub fn wrap_chunk_index(&self, index: i64) -> ChunkIndex {
        let wrapped = index.rem_euclid(self.chunk_count as i64);
        ChunkIndex::new_unchecked(wrapped as u32)
    }

    /// The chunk that owns a position
    pub fn position_to_chunk_index(&self, position: f64) -> Result<ChunkIndex> {
        let wrapped = self.wrap_position(position)?;
        Ok(self.chunk_of(wrapped))
    }

    /// The chunk that owns an already canonical position
    pub fn chunk_of(&self, position: RingPosition) -> ChunkIndex {
        let raw = (position.meters() / self.chunk_length).floor();
        // `raw` is bounded by N, the float can only land exactly on N, which wraps to 0
        let raw = raw.to_i64().unwrap_or_default();
        self.wrap_chunk_index(raw)
    }

    /// The owning chunk of a position and how far into that chunk it sits, in `[0, L)`
    pub fn locate(&self, position: f64) -> Result<(ChunkIndex, f64)> {
        let wrapped = self.wrap_position(position)?;
        let index = self.chunk_of(wrapped);
        let offset = (wrapped.meters() - self.chunk_start(index).meters())
            .clamp(0.0, self.chunk_length);
        Ok((index, offset))
    }

    /// Wraps an inbound chunk index, refusing anything more than one lap away from `[0, N)`.
    /// Ids that far out are almost always a client bug rather than a wrap.
    pub fn validate_chunk_index(&self, index: i64) -> Result<ChunkIndex> {
        let n = self.chunk_count as i64;
        if index < -n || index >= 2 * n {
            return Err(RingError::invalid_argument(
                "chunk_index",
                format!("{} is too far from the valid range 0..{}", index, n),
            ));
        }
        Ok(self.wrap_chunk_index(index))
    }

    /// Parses a `"{floor}_{index}"` chunk id, wrapping the index
    pub fn parse_chunk_id(&self, id: &str) -> Result<ChunkKey> {
        let malformed =
            || RingError::invalid_argument("chunk_id", format!("`{}` is not floor_index", id));
        let (floor, index) = id.split_once('_').ok_or_else(malformed)?;
        let floor: i32 = floor.trim().parse().map_err(|_| malformed())?;
        let index: i64 = index.trim().parse().map_err(|_| malformed())?;
        Ok(ChunkKey::new(self.validate_chunk_index(index)?, Floor(floor)))
    }
}

/* =========================================
 *           Distance
 * ========================================= */
impl RingSpace {
    /// Shortest distance between two raw positions, going either way around the ring.
    /// This is the only sanctioned proximity comparison.
    pub fn distance(&self, a: f64, b: f64) -> Result<f64> {
        let a = self.wrap_position(a)?;
        let b = self.wrap_position(b)?;
        Ok(self.distance_between(a, b))
    }

    /// Shortest distance between two canonical positions, always in `[0, C/2]`
    pub fn distance_between(&self, a: RingPosition, b: RingPosition) -> f64 {
        let direct = (a.meters() - b.meters()).abs();
        direct.min(self.circumference - direct)
    }

    /// Shortest signed displacement from `from` to `to`, in `(-C/2, C/2]`.
    /// Positive means travelling in the direction of increasing position.
    pub fn signed_offset(&self, from: RingPosition, to: RingPosition) -> f64 {
        let half = self.half_circumference();
        let mut delta = to.meters() - from.meters();
        if delta > half {
            delta -= self.circumference;
        } else if delta <= -half {
            delta += self.circumference;
        }
        delta
    }

    /// Moves a position along the ring, wrapping the result
    pub fn offset_position(&self, position: RingPosition, delta: f64) -> Result<RingPosition> {
        self.wrap_position(position.meters() + ensure_finite(delta)?)
    }
}

/* =========================================
 *           Chunk Extents
 * ========================================= */
impl RingSpace {
    /// The unwrapped `[start, end)` span of a chunk. `end` of the last chunk is `C`.
    pub fn chunk_position_range(&self, index: ChunkIndex) -> (f64, f64) {
        let start = index.get() as f64 * self.chunk_length;
        (start, start + self.chunk_length)
    }

    /// Where a chunk starts
    pub fn chunk_start(&self, index: ChunkIndex) -> RingPosition {
        RingPosition::new_unchecked(index.get() as f64 * self.chunk_length)
    }

    /// The middle of a chunk
    pub fn chunk_center(&self, index: ChunkIndex) -> RingPosition {
        RingPosition::new_unchecked((index.get() as f64 + 0.5) * self.chunk_length)
    }

    /// Where a chunk ends. This is the start of the next chunk, so the last chunk ends at 0.
    pub fn chunk_end(&self, index: ChunkIndex) -> RingPosition {
        self.chunk_start(self.next_chunk(index))
    }

    /// The chunk after this one, wrapping
    pub fn next_chunk(&self, index: ChunkIndex) -> ChunkIndex {
        self.wrap_chunk_index(index.as_i64() + 1)
    }

    /// The chunk before this one, wrapping
    pub fn previous_chunk(&self, index: ChunkIndex) -> ChunkIndex {
        self.wrap_chunk_index(index.as_i64() - 1)
    }
}
