//! Hub stations and the flare law that widens the ring around them.

pub mod catalog;
pub mod flare;
pub mod hub;

pub use catalog::{DefaultPillarCatalog, HubCatalog, HubCatalogProvider, JsonCatalogProvider};
pub use flare::{FlareModel, FlareProfile, HubResolution};
pub use hub::{FlareParams, HubId, HubSpec, HubStation, HubStationBuilder, StationClass};
