//! The ring coordinate space.
//! Positions, chunk indices, floors, and the wrap-aware arithmetic between them.

pub mod coords;
pub mod range;
pub mod space;

pub use coords::{ChunkIndex, ChunkKey, Floor, RingPosition};
pub use range::{ChunkRange, ChunkSpan};
pub use space::RingSpace;
