//! # orbital_ring
//!
//! The spatial core of a ring-shaped world 264,000 km around. The ring is one wrap-around
//! axis cut into 1 km chunks; hub stations flare it out to many times its base width and
//! level count.
//!
//! * [`ring`] owns every bit of wrap arithmetic: canonical positions, chunk indices,
//!   shortest distances, and chunk ranges that cross the 0/N seam.
//! * [`stations`] holds the hub catalog and the cosine flare law.
//! * [`chunks`] caches per-chunk geometry computed from the flare law and keeps adjacent
//!   chunks agreeing at their shared seam.
//! * [`query`] answers "what is near here" for chunks and entities.
//!
//! ```
//! use std::sync::Arc;
//! use orbital_ring::{ChunkGeometryStore, Floor, HubCatalog, RingConfig, RingSpace};
//!
//! let space = RingSpace::default();
//! let catalog = Arc::new(HubCatalog::pillars(&space)?);
//! let store = ChunkGeometryStore::new(RingConfig::default(), catalog)?;
//! assert_eq!(store.width_at(-1, Floor::PRIMARY, 1_000.0)?, 25_000.0);
//! # Ok::<(), orbital_ring::RingError>(())
//! ```
#![warn(missing_docs)]

pub mod chunks;
pub mod config;
pub mod error;
pub mod query;
pub mod ring;
pub mod stations;
pub mod telemetry;

pub use chunks::{ChunkGeometry, ChunkGeometryStore, ChunkGeometryStoreBuilder, GeometryPersistence};
pub use config::{RingConfig, RingConfigBuilder};
pub use error::{RingError, Result};
pub use query::{chunks_in_range, entities_near, ChunkWindow, Nearby, RingEntity};
pub use ring::{ChunkIndex, ChunkKey, ChunkRange, Floor, RingPosition, RingSpace};
pub use stations::{FlareModel, HubCatalog, HubCatalogProvider, HubId, HubStation, StationClass};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chunks::InMemoryPersistence;
    use crate::query::PlacedEntity;
    use crate::stations::HubStationBuilder;

    /// A ring of the deployment size with a single pillar at 0
    fn kongo_store(persistence: Arc<InMemoryPersistence>) -> ChunkGeometryStore {
        let space = RingSpace::default();
        let hub = HubStationBuilder::new(HubId(0), StationClass::PillarHub)
            .name("Pillar of Kongo")
            .center(0.0)
            .build(&space)
            .unwrap();
        let catalog = HubCatalog::new(&space, vec![hub]).unwrap();
        ChunkGeometryStoreBuilder::new(RingConfig::default())
            .catalog(Arc::new(catalog))
            .persistence(persistence)
            .build()
            .unwrap()
    }

    #[test]
    fn test_end_to_end() {
        telemetry::init();
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = kongo_store(persistence.clone());
        let space = *store.space();

        assert_eq!(space.wrap_chunk_index(264_000), ChunkIndex::ZERO);
        assert_eq!(space.wrap_chunk_index(-1).get(), 263_999);
        assert_eq!(space.distance(1_000.0, 264_000_000.0 - 1_000.0).unwrap(), 2_000.0);

        let flare = store.flare_model();
        assert_eq!(flare.half_width_at(1_200.0).unwrap(), 12_500.0);
        let tapered = flare.half_width_at(15_000.0).unwrap();
        assert!(tapered > 200.0 && tapered < 12_500.0);
        assert_eq!(flare.half_width_at(30_000.0).unwrap(), 200.0);

        // Stream everything within 30 km of a player just behind the seam
        let range = chunks_in_range(&space, -2_000.0, 30_000.0, Floor::PRIMARY).unwrap();
        assert_eq!(range.spans().len(), 2);
        let report = store.generate(&range).unwrap();
        assert!(report.is_clean(), "{:?}", report.seam_errors);
        assert_eq!(report.computed, range.len());

        let records = store.geometries_in_range(&range).unwrap();
        assert_eq!(records.len(), range.len());
        assert_eq!(records[0].key().index, range.center());
        for pair in records.windows(2) {
            if space.next_chunk(pair[0].key().index) == pair[1].key().index {
                pair[0].check_seam(&pair[1], store.seam_tolerance()).unwrap();
            }
        }
        assert_eq!(store.width_at_position(1_200.0, Floor::PRIMARY).unwrap(), 25_000.0);

        let entities = vec![
            PlacedEntity { id: 1, position: 263_990_000.0, floor: Floor::PRIMARY },
            PlacedEntity { id: 2, position: 5_000.0, floor: Floor::PRIMARY },
            PlacedEntity { id: 3, position: 120_000_000.0, floor: Floor::PRIMARY },
        ];
        let nearby = entities_near(&space, -2_000.0, 30_000.0, Floor::PRIMARY, &entities).unwrap();
        let ids: Vec<u64> = nearby.iter().map(|n| n.entity.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(nearby[0].distance, 7_000.0);

        store.flush();
        assert_eq!(persistence.len(), range.len());
    }
}
