//! Per-chunk geometry: the record, the cache that serves it, and the persistence boundary.

pub mod geometry;
pub mod persistence;
pub mod store;

pub use geometry::{floors_for_levels, ChunkGeometry};
pub use persistence::{GeometryPersistence, InMemoryPersistence, WriteBehind};
pub use store::{ChunkGeometryStore, ChunkGeometryStoreBuilder, GenerationReport, SlotState};
