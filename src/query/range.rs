//! Which chunks a radius around a position touches.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use tracing::warn;

use crate::error::{ensure_finite, RingError, Result};
use crate::ring::{ChunkRange, Floor, RingSpace};

/// Rejects negative and non-finite radii
pub(crate) fn check_radius(radius: f64) -> Result<f64> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(RingError::invalid_argument(
            "radius",
            format!("must be finite and non-negative, got {}", radius),
        ));
    }
    Ok(radius)
}

/// Every chunk within `radius` of `center` on one floor, as the inclusive run
/// `[chunk(center - radius), chunk(center + radius)]` around the ring.
/// A run that would reach `N` chunks or more before wrapping covers the whole ring.
pub fn chunks_in_range(
    space: &RingSpace,
    center: f64,
    radius: f64,
    floor: Floor,
) -> Result<ChunkRange> {
    let center = ensure_finite(center)?;
    let radius = check_radius(radius)?;
    let center_index = space.position_to_chunk_index(center)?;
    // Counted on the unwrapped axis, wrapping first would fold an over-long run back on itself
    let local = space.wrap_position(center)?.meters();
    let length = space.chunk_length();
    let unwrapped = ((local + radius) / length).floor() - ((local - radius) / length).floor() + 1.0;
    if radius >= space.half_circumference() || unwrapped >= f64::from(space.chunk_count()) {
        warn!(
            center,
            radius,
            chunks = space.chunk_count(),
            "query radius covers the whole ring"
        );
        return Ok(ChunkRange::full(space, center_index, floor));
    }
    let first = space.position_to_chunk_index(center - radius)?;
    let last = space.position_to_chunk_index(center + radius)?;
    Ok(ChunkRange::between(space, first, last, center_index, floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::ChunkIndex;
    use hashbrown::HashSet;

    fn indices(range: &ChunkRange) -> Vec<u32> {
        range.iter().map(ChunkIndex::get).collect()
    }

    #[test]
    fn test_simple_range() {
        let space = RingSpace::default();
        let range = chunks_in_range(&space, 10_500.0, 1_200.0, Floor(0)).unwrap();
        assert_eq!(indices(&range), vec![10, 11, 9]);
        assert_eq!(range.spans().len(), 1);
    }

    #[test]
    fn test_range_across_the_seam() {
        let space = RingSpace::default();
        let range = chunks_in_range(&space, 500.0, 2_000.0, Floor(1)).unwrap();
        assert_eq!(indices(&range), vec![0, 1, 2, 263_998, 263_999]);
        let spans = range.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start.get(), spans[0].end.get()), (0, 2));
        assert_eq!((spans[1].start.get(), spans[1].end.get()), (263_998, 263_999));
        assert!(range.keys().all(|key| key.floor == Floor(1)));
    }

    #[test]
    fn test_wrap_split_equals_manual_union() {
        let space = RingSpace::default();
        let c = space.circumference();
        let wrapped: HashSet<u32> = chunks_in_range(&space, 0.0, 3_000.0, Floor(0))
            .unwrap()
            .iter()
            .map(ChunkIndex::get)
            .collect();
        // The same window seen from each side of the seam, neither of which wraps
        let below = chunks_in_range(&space, c - 1_500.0, 1_499.0, Floor(0)).unwrap();
        let above = chunks_in_range(&space, 1_500.0, 1_500.0, Floor(0)).unwrap();
        assert!(!below.wraps() && !above.wraps());
        let manual: HashSet<u32> = below.iter().chain(above.iter()).map(ChunkIndex::get).collect();
        assert_eq!(wrapped, manual);
        assert_eq!(wrapped.len(), 7);
    }

    #[test]
    fn test_huge_radius_is_the_whole_ring() {
        let space = RingSpace::new(10_000.0, 1_000.0).unwrap();
        let range = chunks_in_range(&space, 3_500.0, 5_000.0, Floor(0)).unwrap();
        assert!(range.is_full_ring());
        assert_eq!(indices(&range), vec![3, 4, 5, 6, 7, 8, 9, 0, 1, 2]);
    }

    #[test]
    fn test_just_under_half_the_ring_is_the_whole_ring() {
        let space = RingSpace::default();
        let half = space.half_circumference();
        let center_index = space.position_to_chunk_index(500.0).unwrap();
        for radius in [half - 400.0, half - 1.0, half - 500.0] {
            let range = chunks_in_range(&space, 500.0, radius, Floor(0)).unwrap();
            assert!(range.is_full_ring(), "radius {}", radius);
            assert!(range.contains(center_index));
            assert_eq!(range.center(), center_index);
        }
        let range = chunks_in_range(&space, 0.0, half - 1.0, Floor(0)).unwrap();
        assert!(range.is_full_ring());
    }

    #[test]
    fn test_radius_sweep_up_to_half_the_ring() {
        let space = RingSpace::new(10_000.0, 1_000.0).unwrap();
        for center in [0.0, 3_500.0, 9_999.0, -250.0] {
            let center_index = space.position_to_chunk_index(center).unwrap();
            let mut previous = 0;
            let mut radius = 0.0;
            while radius <= space.half_circumference() {
                let range = chunks_in_range(&space, center, radius, Floor(0)).unwrap();
                assert!(range.contains(center_index), "center {} radius {}", center, radius);
                assert!(range.len() >= previous, "center {} radius {}", center, radius);
                assert!(range.len() <= 10);
                previous = range.len();
                radius += 50.0;
            }
            assert_eq!(previous, 10);
        }
    }

    #[test]
    fn test_zero_radius_is_one_chunk() {
        let space = RingSpace::default();
        let range = chunks_in_range(&space, -1.0, 0.0, Floor(0)).unwrap();
        assert_eq!(indices(&range), vec![263_999]);
    }

    #[test]
    fn test_bad_arguments() {
        let space = RingSpace::default();
        assert!(matches!(
            chunks_in_range(&space, 0.0, -1.0, Floor(0)),
            Err(RingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            chunks_in_range(&space, 0.0, f64::NAN, Floor(0)),
            Err(RingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            chunks_in_range(&space, f64::INFINITY, 1.0, Floor(0)),
            Err(RingError::InvalidCoordinate { .. })
        ));
    }
}
