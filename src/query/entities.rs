//! Entity proximity queries.
//!
//! Entities are owned elsewhere, this module only needs to read their position and floor.
//! Proximity always goes through [`RingSpace::distance`], never raw coordinate comparison,
//! so entities parked just either side of the seam are found together.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::range::check_radius;
use crate::error::{ensure_finite, Result};
use crate::ring::{Floor, RingSpace};

/// Anything that lives somewhere on the ring
pub trait RingEntity {
    /// Raw position in meters, wrapped before any comparison
    fn position(&self) -> f64;
    /// The floor it is on
    fn floor(&self) -> Floor;
}

/// Something that can list entities for a query
pub trait EntitySource {
    /// The entity type
    type Entity: RingEntity;
    /// Every entity, in the source's own order
    fn entities(&self) -> Box<dyn Iterator<Item = &Self::Entity> + '_>;
}

impl<E: RingEntity> EntitySource for [E] {
    type Entity = E;
    fn entities(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

impl<E: RingEntity> EntitySource for Vec<E> {
    type Entity = E;
    fn entities(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

/// A plain positioned entity, for collaborators that just need ids on the ring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedEntity {
    /// Caller-defined id
    pub id: u64,
    /// Raw position in meters
    pub position: f64,
    /// Floor
    pub floor: Floor,
}

impl RingEntity for PlacedEntity {
    fn position(&self) -> f64 {
        self.position
    }
    fn floor(&self) -> Floor {
        self.floor
    }
}

/// An entity found by a proximity query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby<'a, E> {
    /// The entity
    pub entity: &'a E,
    /// Shortest distance from the query center
    pub distance: f64,
}

/// Every entity on `floor` within `radius` of `center`, nearest first.
/// Ties keep the source's order. Entities with non-finite positions are skipped.
pub fn entities_near<'a, S>(
    space: &RingSpace,
    center: f64,
    radius: f64,
    floor: Floor,
    source: &'a S,
) -> Result<Vec<Nearby<'a, S::Entity>>>
where
    S: EntitySource + ?Sized,
{
    let center = ensure_finite(center)?;
    let radius = check_radius(radius)?;
    if radius >= space.half_circumference() {
        warn!(center, radius, "entity query radius covers the whole ring");
    }
    let mut found: Vec<Nearby<'a, S::Entity>> = source
        .entities()
        .filter(|entity| entity.floor() == floor)
        .filter_map(|entity| match space.distance(center, entity.position()) {
            Ok(distance) => Some(Nearby { entity, distance }),
            Err(e) => {
                warn!(error = %e, "skipping entity with an unusable position");
                None
            }
        })
        .filter(|nearby| nearby.distance <= radius)
        .collect();
    // Stable, so equal distances stay in source order
    found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RingError;

    fn placed(id: u64, position: f64, floor: i32) -> PlacedEntity {
        PlacedEntity {
            id,
            position,
            floor: Floor(floor),
        }
    }

    fn ids(found: &[Nearby<'_, PlacedEntity>]) -> Vec<u64> {
        found.iter().map(|n| n.entity.id).collect()
    }

    #[test]
    fn test_finds_entities_across_the_seam() {
        let space = RingSpace::default();
        let entities = vec![
            placed(1, 263_999_000.0, 0),
            placed(2, 1_000.0, 0),
            placed(3, 500.0, 0),
            placed(4, 50_000.0, 0),
            placed(5, -200.0, 0),
        ];
        let found = entities_near(&space, 0.0, 1_500.0, Floor(0), &entities).unwrap();
        assert_eq!(ids(&found), vec![5, 3, 1, 2]);
        assert_eq!(found[0].distance, 200.0);
        assert_eq!(found[2].distance, 1_000.0);
    }

    #[test]
    fn test_filters_by_floor() {
        let space = RingSpace::default();
        let entities = [placed(1, 10.0, 0), placed(2, 10.0, -1), placed(3, 20.0, -1)];
        let found = entities_near(&space, 0.0, 100.0, Floor(-1), &entities[..]).unwrap();
        assert_eq!(ids(&found), vec![2, 3]);
    }

    #[test]
    fn test_ties_keep_source_order() {
        let space = RingSpace::default();
        let entities = vec![placed(9, 100.0, 0), placed(4, -100.0, 0), placed(6, 100.0, 0)];
        let found = entities_near(&space, 0.0, 100.0, Floor(0), &entities).unwrap();
        assert_eq!(ids(&found), vec![9, 4, 6]);
    }

    #[test]
    fn test_skips_unusable_positions() {
        let space = RingSpace::default();
        let entities = vec![placed(1, f64::NAN, 0), placed(2, 5.0, 0)];
        let found = entities_near(&space, 0.0, 10.0, Floor(0), &entities).unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn test_whole_ring_radius() {
        let space = RingSpace::default();
        let entities = vec![placed(1, 132_000_000.0, 0), placed(2, 1.0, 0)];
        let found = entities_near(&space, 0.0, 200_000_000.0, Floor(0), &entities).unwrap();
        assert_eq!(ids(&found), vec![2, 1]);
    }

    #[test]
    fn test_bad_radius() {
        let space = RingSpace::default();
        let entities: Vec<PlacedEntity> = Vec::new();
        assert!(matches!(
            entities_near(&space, 0.0, -5.0, Floor(0), &entities),
            Err(RingError::InvalidArgument { .. })
        ));
    }
}
