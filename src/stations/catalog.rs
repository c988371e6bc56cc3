//! The hub catalog and the providers that produce one at startup.
//!
//! A catalog is an explicit read-only value handed to the flare model, never a global.
//! Tests build their own catalogs freely.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use hashbrown::HashSet;
use itertools::Itertools;
use tracing::{debug, warn};

use super::hub::{HubId, HubSpec, HubStation, HubStationBuilder, StationClass};
use crate::error::{RingError, Result};
use crate::ring::{RingPosition, RingSpace};

/// Names of the twelve pillar hubs, in order around the ring starting from position 0
pub const PILLAR_HUB_NAMES: [&str; 12] = [
    "Pillar of Kongo",
    "Pillar of Kilima",
    "Pillar of Laccadé",
    "Pillar of Nusantara",
    "Pillar of Makassar",
    "Pillar of Arafura",
    "Pillar of Kirana",
    "Pillar of Polynesya",
    "Pillar of Andenor",
    "Pillar of Quito Prime",
    "Pillar of Solamazon",
    "Pillar of Atlantica",
];

/// An immutable, id-ordered set of hubs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HubCatalog {
    /// Sorted by id, ids are unique
    hubs: Vec<HubStation>,
}

/* =========================================
 *           Construction
 * ========================================= */
impl HubCatalog {
    /// A catalog with no hubs, the ring keeps its base profile everywhere
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a catalog, refusing duplicate ids.
    /// Overlapping flares are allowed but logged, the flare model resolves them.
    pub fn new(space: &RingSpace, hubs: impl IntoIterator<Item = HubStation>) -> Result<Self> {
        let hubs: Vec<HubStation> = hubs.into_iter().sorted_by_key(|hub| hub.id()).collect();
        let mut seen = HashSet::with_capacity(hubs.len());
        for hub in &hubs {
            if !seen.insert(hub.id()) {
                return Err(RingError::invalid_argument(
                    "hubs",
                    format!("hub id {} appears more than once", hub.id()),
                ));
            }
        }
        let catalog = Self { hubs };
        for (a, b) in catalog.overlapping_flares(space) {
            warn!(first = %a, second = %b, "hub flares overlap, nearest hub will win");
        }
        debug!(hubs = catalog.len(), "hub catalog built");
        Ok(catalog)
    }

    /// The standard twelve pillar hubs, evenly spaced starting at position 0
    pub fn pillars(space: &RingSpace) -> Result<Self> {
        let spacing = space.circumference() / PILLAR_HUB_NAMES.len() as f64;
        let hubs = PILLAR_HUB_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                HubStationBuilder::new(HubId(i as u32), StationClass::PillarHub)
                    .name(*name)
                    .center(i as f64 * spacing)
                    .build(space)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(space, hubs)
    }

    /// Builds a catalog from serialized hub specs
    pub fn from_specs(space: &RingSpace, specs: &[HubSpec]) -> Result<Self> {
        let hubs = specs
            .iter()
            .map(|spec| spec.build(space))
            .collect::<Result<Vec<_>>>()?;
        Self::new(space, hubs)
    }
}

/* =========================================
 *           Lookups
 * ========================================= */
impl HubCatalog {
    /// Number of hubs
    pub fn len(&self) -> usize {
        self.hubs.len()
    }
    /// Whether there are no hubs at all
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
    /// All hubs in id order
    pub fn iter(&self) -> std::slice::Iter<'_, HubStation> {
        self.hubs.iter()
    }
    /// Looks a hub up by id
    pub fn get(&self, id: HubId) -> Option<&HubStation> {
        self.hubs
            .binary_search_by_key(&id, |hub| hub.id())
            .ok()
            .map(|i| &self.hubs[i])
    }

    /// Every hub whose flare range contains the position, nearest first, ties by lowest id
    pub fn hubs_containing(
        &self,
        space: &RingSpace,
        position: RingPosition,
    ) -> Vec<(&HubStation, f64)> {
        self.hubs
            .iter()
            .map(|hub| (hub, space.distance_between(position, hub.center())))
            .filter(|(hub, d)| *d <= hub.flare_half_range())
            .sorted_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id().cmp(&b.id())))
            .collect()
    }

    /// The nearest hub to a position whether or not its flare reaches it
    pub fn nearest_hub(
        &self,
        space: &RingSpace,
        position: RingPosition,
    ) -> Option<(&HubStation, f64)> {
        self.hubs
            .iter()
            .map(|hub| (hub, space.distance_between(position, hub.center())))
            .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id().cmp(&b.id())))
    }

    /// Pairs of hubs whose flare ranges overlap anywhere on the ring
    pub fn overlapping_flares(&self, space: &RingSpace) -> Vec<(HubId, HubId)> {
        self.hubs
            .iter()
            .tuple_combinations()
            .filter(|(a, b)| {
                space.distance_between(a.center(), b.center())
                    < a.flare_half_range() + b.flare_half_range()
            })
            .map(|(a, b)| (a.id(), b.id()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a HubCatalog {
    type Item = &'a HubStation;
    type IntoIter = std::slice::Iter<'a, HubStation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/* =========================================
 *           Providers
 * ========================================= */

/// Supplies the immutable hub catalog at startup
pub trait HubCatalogProvider {
    /// Produces the catalog for a ring
    fn load_catalog(&self, space: &RingSpace) -> Result<HubCatalog>;
}

/// Provides the twelve standard pillar hubs
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPillarCatalog;

impl HubCatalogProvider for DefaultPillarCatalog {
    fn load_catalog(&self, space: &RingSpace) -> Result<HubCatalog> {
        HubCatalog::pillars(space)
    }
}

/// Provides a catalog from a JSON array of [`HubSpec`]s
#[derive(Debug, Clone)]
pub struct JsonCatalogProvider {
    /// The raw JSON document
    json: String,
}

impl JsonCatalogProvider {
    /// Wraps an in-memory JSON document
    pub fn from_json_str(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }

    /// Reads a JSON document from disk
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RingError::Config(format!("reading {}: {}", path.display(), e)))?;
        Ok(Self { json })
    }
}

impl HubCatalogProvider for JsonCatalogProvider {
    fn load_catalog(&self, space: &RingSpace) -> Result<HubCatalog> {
        let specs: Vec<HubSpec> =
            serde_json::from_str(&self.json).map_err(|e| RingError::Config(e.to_string()))?;
        HubCatalog::from_specs(space, &specs)
    }
}

/// A ready-made catalog provides itself, handy for tests
impl HubCatalogProvider for HubCatalog {
    fn load_catalog(&self, _space: &RingSpace) -> Result<HubCatalog> {
        Ok(self.clone())
    }
}
