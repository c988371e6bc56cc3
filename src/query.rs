//! Spatial queries over the ring: chunk ranges, entity proximity, and streaming windows.

pub mod entities;
pub mod range;
pub mod window;

pub use entities::{entities_near, EntitySource, Nearby, PlacedEntity, RingEntity};
pub use range::chunks_in_range;
pub use window::{ChunkWindow, WindowDelta};
