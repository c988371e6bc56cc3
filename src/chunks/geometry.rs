//! The per-chunk geometry record.
//!
//! A record samples the flare law at three points of its chunk (start, center, end) and
//! interpolates linearly between them. With `L = 1 km` and the standard station classes the
//! three-sample approximation stays well under 1% of the hub's maximum width.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, RingError, Result};
use crate::ring::{ChunkKey, Floor};
use crate::stations::flare::round_levels;
use crate::stations::{FlareProfile, HubId};

/// The geometry of one chunk on one floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkGeometry {
    /// Which chunk this describes
    key: ChunkKey,
    /// Chunk length the samples were taken over
    chunk_length: f64,
    /// Full widths at start, center and end
    widths: [f64; 3],
    /// Continuous level counts at start, center and end
    level_samples: [f64; 3],
    /// Level counts as stored, the rounded samples
    levels: [u32; 3],
    /// Hub governing the chunk, if any
    associated_hub: Option<HubId>,
    /// Distance from the chunk center to that hub
    distance_from_hub: Option<f64>,
    /// Fingerprint of the flare model the samples came from
    #[serde(default)]
    fingerprint: u64,
}

/* =========================================
 *           Construction
 * ========================================= */
impl ChunkGeometry {
    /// Builds a record from the flare profiles at the chunk's start, center and end.
    /// The hub is the one governing the center, or failing that whichever end is governed.
    pub fn from_profiles(
        key: ChunkKey,
        chunk_length: f64,
        start: &FlareProfile,
        center: &FlareProfile,
        end: &FlareProfile,
    ) -> Self {
        let governing = [center, start, end]
            .into_iter()
            .find(|profile| profile.hub.is_some())
            .unwrap_or(center);
        let level_samples = [start.levels, center.levels, end.levels];
        Self {
            key,
            chunk_length,
            widths: [start.width(), center.width(), end.width()],
            levels: level_samples.map(round_levels),
            level_samples,
            associated_hub: governing.hub,
            distance_from_hub: governing.distance_from_hub,
            fingerprint: 0,
        }
    }

    /// Stamps the record with the fingerprint of the flare model that produced it
    pub fn with_fingerprint(mut self, fingerprint: u64) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl ChunkGeometry {
    /// The chunk and floor
    pub fn key(&self) -> ChunkKey {
        self.key
    }
    /// The chunk length the record was sampled over
    pub fn chunk_length(&self) -> f64 {
        self.chunk_length
    }
    /// Full width where the chunk starts
    pub fn start_width(&self) -> f64 {
        self.widths[0]
    }
    /// Full width at the middle of the chunk
    pub fn center_width(&self) -> f64 {
        self.widths[1]
    }
    /// Full width where the chunk ends
    pub fn end_width(&self) -> f64 {
        self.widths[2]
    }
    /// Stored level count at the start
    pub fn start_levels(&self) -> u32 {
        self.levels[0]
    }
    /// Stored level count at the middle
    pub fn center_levels(&self) -> u32 {
        self.levels[1]
    }
    /// Stored level count at the end
    pub fn end_levels(&self) -> u32 {
        self.levels[2]
    }
    /// The most levels anywhere in the chunk
    pub fn max_levels(&self) -> u32 {
        self.levels.iter().copied().max().unwrap_or_default()
    }
    /// Hub governing the chunk
    pub fn associated_hub(&self) -> Option<HubId> {
        self.associated_hub
    }
    /// Distance to the governing hub
    pub fn distance_from_hub(&self) -> Option<f64> {
        self.distance_from_hub
    }
    /// Fingerprint of the flare model the record was computed from
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/* =========================================
 *           Interpolation
 * ========================================= */
impl ChunkGeometry {
    /// Linear interpolation through `(0, s[0])`, `(L/2, s[1])`, `(L, s[2])`
    fn interpolate(&self, samples: &[f64; 3], offset: f64) -> Result<f64> {
        let offset = ensure_finite(offset)?;
        if !(0.0..=self.chunk_length).contains(&offset) {
            return Err(RingError::invalid_argument(
                "offset",
                format!("{} is outside the chunk [0, {}]", offset, self.chunk_length),
            ));
        }
        let half = self.chunk_length / 2.0;
        let value = if offset <= half {
            samples[0] + (samples[1] - samples[0]) * (offset / half)
        } else {
            samples[1] + (samples[2] - samples[1]) * ((offset - half) / half)
        };
        Ok(value)
    }

    /// Full width at an offset into the chunk
    pub fn width_at(&self, offset: f64) -> Result<f64> {
        self.interpolate(&self.widths, offset)
    }

    /// Continuous level count at an offset into the chunk
    pub fn continuous_levels_at(&self, offset: f64) -> Result<f64> {
        self.interpolate(&self.level_samples, offset)
    }

    /// Level count at an offset into the chunk, rounded to the nearest whole level
    pub fn levels_at(&self, offset: f64) -> Result<u32> {
        self.continuous_levels_at(offset).map(round_levels)
    }
}

/* =========================================
 *           Floors and Seams
 * ========================================= */

/// The floors a stack of `levels` levels occupies, centered on floor 0.
/// An even count puts the extra floor on top.
pub fn floors_for_levels(levels: u32) -> RangeInclusive<i32> {
    if levels == 0 {
        return RangeInclusive::new(1, 0);
    }
    let levels = levels.min(i32::MAX as u32) as i32;
    let low = -((levels - 1) / 2);
    low..=low + levels - 1
}

impl ChunkGeometry {
    /// Floors present anywhere in the chunk
    pub fn floor_range(&self) -> RangeInclusive<i32> {
        floors_for_levels(self.max_levels())
    }

    /// Whether a floor exists anywhere in the chunk
    pub fn contains_floor(&self, floor: Floor) -> bool {
        self.floor_range().contains(&floor.0)
    }

    /// Checks this chunk's end against the start of the chunk after it.
    /// Widths must agree within `tolerance`, levels exactly.
    pub fn check_seam(&self, next: &ChunkGeometry, tolerance: f64) -> Result<()> {
        let delta = (self.end_width() - next.start_width()).abs();
        if delta <= tolerance && self.end_levels() == next.start_levels() {
            return Ok(());
        }
        Err(RingError::SeamMismatch {
            floor: self.key.floor,
            chunk: self.key.index,
            next: next.key.index,
            end_width: self.end_width(),
            start_width: next.start_width(),
            delta,
            end_levels: self.end_levels(),
            start_levels: next.start_levels(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{ChunkIndex, RingPosition};

    fn profile(half_width: f64, levels: f64) -> FlareProfile {
        FlareProfile {
            position: RingPosition::ZERO,
            half_width,
            levels,
            hub: None,
            distance_from_hub: None,
        }
    }

    fn record(index: u32, widths: [f64; 3], levels: [f64; 3]) -> ChunkGeometry {
        ChunkGeometry::from_profiles(
            ChunkKey::new(ChunkIndex::new_unchecked(index), Floor(0)),
            1_000.0,
            &profile(widths[0] / 2.0, levels[0]),
            &profile(widths[1] / 2.0, levels[1]),
            &profile(widths[2] / 2.0, levels[2]),
        )
    }

    #[test]
    fn test_piecewise_linear_width() {
        let geometry = record(0, [400.0, 600.0, 1_000.0], [5.0, 5.0, 5.0]);
        assert_eq!(geometry.width_at(0.0).unwrap(), 400.0);
        assert_eq!(geometry.width_at(250.0).unwrap(), 500.0);
        assert_eq!(geometry.width_at(500.0).unwrap(), 600.0);
        assert_eq!(geometry.width_at(750.0).unwrap(), 800.0);
        assert_eq!(geometry.width_at(1_000.0).unwrap(), 1_000.0);
    }

    #[test]
    fn test_levels_interpolate_then_round() {
        let geometry = record(0, [400.0; 3], [5.0, 6.0, 7.4]);
        assert_eq!(geometry.start_levels(), 5);
        assert_eq!(geometry.end_levels(), 7);
        assert_eq!(geometry.levels_at(200.0).unwrap(), 5);
        assert_eq!(geometry.levels_at(300.0).unwrap(), 6);
        assert_eq!(geometry.levels_at(1_000.0).unwrap(), 7);
        assert!((geometry.continuous_levels_at(750.0).unwrap() - 6.7).abs() < 1e-9);
    }

    #[test]
    fn test_offsets_outside_the_chunk() {
        let geometry = record(0, [400.0; 3], [5.0; 3]);
        assert!(matches!(
            geometry.width_at(-0.5),
            Err(RingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            geometry.levels_at(1_000.5),
            Err(RingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            geometry.width_at(f64::NAN),
            Err(RingError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_floor_ranges() {
        assert_eq!(floors_for_levels(5), -2..=2);
        assert_eq!(floors_for_levels(15), -7..=7);
        assert_eq!(floors_for_levels(1), 0..=0);
        assert_eq!(floors_for_levels(6), -2..=3);
        assert!(floors_for_levels(0).is_empty());
        let geometry = record(0, [400.0; 3], [5.0, 7.0, 5.0]);
        assert_eq!(geometry.floor_range(), -3..=3);
        assert!(geometry.contains_floor(Floor(-3)));
        assert!(!geometry.contains_floor(Floor(4)));
    }

    #[test]
    fn test_seams() {
        let a = record(0, [400.0, 500.0, 600.0], [5.0, 5.0, 6.0]);
        let b = record(1, [600.05, 700.0, 800.0], [6.0, 6.0, 6.0]);
        assert!(a.check_seam(&b, 0.1).is_ok());
        let c = record(1, [601.0, 700.0, 800.0], [6.0, 6.0, 6.0]);
        match a.check_seam(&c, 0.1) {
            Err(RingError::SeamMismatch { chunk, next, delta, .. }) => {
                assert_eq!(chunk.get(), 0);
                assert_eq!(next.get(), 1);
                assert!((delta - 1.0).abs() < 1e-9);
            }
            other => panic!("expected a seam mismatch, got {:?}", other),
        }
        let d = record(1, [600.0, 700.0, 800.0], [5.0, 6.0, 6.0]);
        assert!(a.check_seam(&d, 0.1).is_err());
    }

    #[test]
    fn test_serde_keeps_every_field() {
        let geometry = record(3, [400.0, 500.0, 600.0], [5.0, 5.5, 6.0]);
        let bytes = serde_json::to_vec(&geometry).unwrap();
        let back: ChunkGeometry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, geometry);
    }
}
