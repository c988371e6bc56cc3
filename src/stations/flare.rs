//! The station flare law.
//!
//! Near a hub the ring widens and gains levels along a cosine taper,
//! `taper(t) = (1 + cos(pi * t)) / 2`,
//! which is 1 at the hub (or at the edge of a pillar's plateau) and 0 at the flare edge,
//! with zero slope at both ends so the profile has no kinks.
//!
//! Everything here is pure and total over a valid catalog, so it is safe to call from any
//! number of threads at once.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::hash_map::DefaultHasher;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::warn;

use super::catalog::HubCatalog;
use super::hub::{HubId, HubStation};
use crate::config::RingConfig;
use crate::error::{RingError, Result};
use crate::ring::{RingPosition, RingSpace};

/// The smooth step used by every flare, 1 at `t = 0` and 0 at `t = 1`
pub fn cosine_taper(t: f64) -> f64 {
    (1.0 + (PI * t.clamp(0.0, 1.0)).cos()) / 2.0
}

/// Half-width a hub produces at distance `d` from its center
pub fn hub_half_width(hub: &HubStation, distance: f64, base_half_width: f64) -> f64 {
    let half_range = hub.flare_half_range();
    if distance > half_range {
        return base_half_width;
    }
    let plateau = hub.plateau_radius();
    if plateau > 0.0 && distance <= plateau {
        return hub.max_half_width();
    }
    let effective_range = half_range - plateau;
    let t = if effective_range <= 0.0 {
        1.0
    } else {
        (distance - plateau).max(0.0) / effective_range
    };
    base_half_width + (hub.max_half_width() - base_half_width) * cosine_taper(t)
}

/// Continuous level count a hub produces at distance `d`. Levels have no plateau.
pub fn hub_levels(hub: &HubStation, distance: f64, base_levels: f64) -> f64 {
    let half_range = hub.flare_half_range();
    if distance > half_range {
        return base_levels;
    }
    let t = if half_range <= 0.0 {
        1.0
    } else {
        distance / half_range
    };
    base_levels + (hub.max_level_count() as f64 - base_levels) * cosine_taper(t)
}

/// Rounds a continuous level count for storage
pub fn round_levels(levels: f64) -> u32 {
    levels.round().max(0.0) as u32
}

/// The hub that governs a position
#[derive(Debug, Clone, Copy)]
pub struct HubResolution<'a> {
    /// The winning hub
    pub hub: &'a HubStation,
    /// Wrap-aware distance from the position to the hub center
    pub distance: f64,
}

/// Everything the flare law says about one position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlareProfile {
    /// The position evaluated
    pub position: RingPosition,
    /// Half-width there
    pub half_width: f64,
    /// Continuous level count there
    pub levels: f64,
    /// Governing hub, if any
    pub hub: Option<HubId>,
    /// Distance to the governing hub
    pub distance_from_hub: Option<f64>,
}

impl FlareProfile {
    /// Full width, twice the half-width
    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }
    /// Level count as it would be stored
    pub fn rounded_levels(&self) -> u32 {
        round_levels(self.levels)
    }
}

/// Evaluates the flare law against a fixed catalog
#[derive(Debug, Clone)]
pub struct FlareModel {
    /// The ring the catalog lives on
    space: RingSpace,
    /// Half-width away from every hub
    base_half_width: f64,
    /// Level count away from every hub
    base_levels: u32,
    /// The hubs, shared and immutable
    catalog: Arc<HubCatalog>,
    /// Digest of everything the law depends on, see [`FlareModel::fingerprint`]
    fingerprint: u64,
}

/* =========================================
 *           Construction
 * ========================================= */
impl FlareModel {
    /// Builds a model over an explicit catalog
    pub fn new(
        space: RingSpace,
        base_half_width: f64,
        base_levels: u32,
        catalog: Arc<HubCatalog>,
    ) -> Result<Self> {
        if !base_half_width.is_finite() || base_half_width < 0.0 {
            return Err(RingError::invalid_argument(
                "base_half_width",
                format!("must be finite and non-negative, got {}", base_half_width),
            ));
        }
        let fingerprint = fingerprint(&space, base_half_width, base_levels, &catalog);
        Ok(Self {
            space,
            base_half_width,
            base_levels,
            catalog,
            fingerprint,
        })
    }

    /// Builds a model from the deployment config
    pub fn from_config(config: &RingConfig, catalog: Arc<HubCatalog>) -> Result<Self> {
        Self::new(
            RingSpace::from_config(config)?,
            config.base_half_width,
            config.base_levels,
            catalog,
        )
    }

    /// The same model over a different catalog
    pub fn with_catalog(&self, catalog: Arc<HubCatalog>) -> Self {
        Self {
            fingerprint: fingerprint(&self.space, self.base_half_width, self.base_levels, &catalog),
            catalog,
            ..self.clone()
        }
    }
}

/// Hashes the ring, the base profile and every hub definition.
/// Two models with the same fingerprint evaluate the same law.
fn fingerprint(
    space: &RingSpace,
    base_half_width: f64,
    base_levels: u32,
    catalog: &HubCatalog,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    space.circumference().to_bits().hash(&mut hasher);
    space.chunk_length().to_bits().hash(&mut hasher);
    base_half_width.to_bits().hash(&mut hasher);
    base_levels.hash(&mut hasher);
    for hub in catalog.iter() {
        let params = hub.params();
        hub.id().0.hash(&mut hasher);
        hub.center().meters().to_bits().hash(&mut hasher);
        hub.station_class().hash(&mut hasher);
        params.max_half_width.to_bits().hash(&mut hasher);
        params.max_level_count.hash(&mut hasher);
        params.flare_length.to_bits().hash(&mut hasher);
        params.plateau_radius.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl FlareModel {
    /// The ring
    pub fn space(&self) -> &RingSpace {
        &self.space
    }
    /// The hubs
    pub fn catalog(&self) -> &HubCatalog {
        &self.catalog
    }
    /// Half-width away from hubs
    pub fn base_half_width(&self) -> f64 {
        self.base_half_width
    }
    /// Level count away from hubs
    pub fn base_levels(&self) -> u32 {
        self.base_levels
    }
    /// Digest of the ring, base profile and hub definitions.
    /// Records computed under a different fingerprint are stale.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/* =========================================
 *           Evaluation
 * ========================================= */
impl FlareModel {
    /// Picks the hub governing a position: nearest wins, ties go to the lowest id.
    /// Several hubs claiming the same spot should not happen with real hub spacing, so it is
    /// logged when it does.
    pub fn resolve_hub(&self, position: RingPosition) -> Option<HubResolution<'_>> {
        let contenders = self.catalog.hubs_containing(&self.space, position);
        if contenders.len() > 1 {
            let ambiguity = RingError::HubResolutionAmbiguous {
                position: position.meters(),
                hubs: contenders.iter().map(|(hub, _)| hub.id()).collect(),
            };
            warn!(winner = %contenders[0].0.id(), "{}", ambiguity);
        }
        contenders
            .first()
            .map(|&(hub, distance)| HubResolution { hub, distance })
    }

    /// The full profile at a canonical position
    pub fn profile(&self, position: RingPosition) -> FlareProfile {
        match self.resolve_hub(position) {
            Some(HubResolution { hub, distance }) => FlareProfile {
                position,
                half_width: hub_half_width(hub, distance, self.base_half_width),
                levels: hub_levels(hub, distance, self.base_levels as f64),
                hub: Some(hub.id()),
                distance_from_hub: Some(distance),
            },
            None => FlareProfile {
                position,
                half_width: self.base_half_width,
                levels: self.base_levels as f64,
                hub: None,
                distance_from_hub: None,
            },
        }
    }

    /// The full profile at a raw position
    pub fn profile_at(&self, position: f64) -> Result<FlareProfile> {
        Ok(self.profile(self.space.wrap_position(position)?))
    }

    /// Half-width at a raw position
    pub fn half_width_at(&self, position: f64) -> Result<f64> {
        Ok(self.profile_at(position)?.half_width)
    }

    /// Full width at a raw position
    pub fn width_at(&self, position: f64) -> Result<f64> {
        Ok(self.profile_at(position)?.width())
    }

    /// Continuous level count at a raw position
    pub fn levels_at(&self, position: f64) -> Result<f64> {
        Ok(self.profile_at(position)?.levels)
    }

    /// Level count at a raw position, rounded the way it is stored
    pub fn rounded_levels_at(&self, position: f64) -> Result<u32> {
        Ok(self.profile_at(position)?.rounded_levels())
    }
}
