pub mod chunks;
pub mod query;
pub mod ring;
pub mod stations;
