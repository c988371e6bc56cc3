//! Hub stations: the fixed points on the ring where it flares out.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::error::{RingError, Result};
use crate::ring::{RingPosition, RingSpace};

/// Identifies a hub. Lower ids win ties when two hubs are equally close.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct HubId(pub u32);

/// The closed set of station classes, largest first
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    AsRefStr,
    strum_macros::Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StationClass {
    /// Space elevator pillars. The only class with a flat plateau at the center.
    PillarHub,
    /// Regional transit hubs
    RegionalHub,
    /// Small local stations
    LocalStation,
}

/// The shape parameters of a flare
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlareParams {
    /// Half-width at the hub center
    pub max_half_width: f64,
    /// Level count at the hub center
    pub max_level_count: u32,
    /// Total length of the flare, it reaches `flare_length / 2` to each side
    pub flare_length: f64,
    /// Radius of the flat full-width region at the center. Only honoured for the top tier.
    pub plateau_radius: f64,
}

impl StationClass {
    /// Whether this is the top tier, the only class that gets a plateau
    pub fn is_top_tier(self) -> bool {
        matches!(self, StationClass::PillarHub)
    }

    /// The standard flare of each class
    pub fn default_params(self) -> FlareParams {
        match self {
            StationClass::PillarHub => FlareParams {
                max_half_width: 12_500.0,
                max_level_count: 15,
                flare_length: 50_000.0,
                plateau_radius: 2_500.0,
            },
            StationClass::RegionalHub => FlareParams {
                max_half_width: 8_000.0,
                max_level_count: 11,
                flare_length: 32_000.0,
                plateau_radius: 0.0,
            },
            StationClass::LocalStation => FlareParams {
                max_half_width: 2_500.0,
                max_level_count: 7,
                flare_length: 10_000.0,
                plateau_radius: 0.0,
            },
        }
    }
}

/// An immutable hub record. Hubs never move once a catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubStation {
    /// Stable identifier
    id: HubId,
    /// Display name, if it has one
    name: Option<String>,
    /// Where the hub sits on the ring
    center: RingPosition,
    /// What kind of station it is
    station_class: StationClass,
    /// Flare shape
    params: FlareParams,
}

/* =========================================
 *           Simple Getters
 * ========================================= */
impl HubStation {
    /// Stable identifier
    pub fn id(&self) -> HubId {
        self.id
    }
    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    /// Center of the hub
    pub fn center(&self) -> RingPosition {
        self.center
    }
    /// Class of the hub
    pub fn station_class(&self) -> StationClass {
        self.station_class
    }
    /// Half-width at the center
    pub fn max_half_width(&self) -> f64 {
        self.params.max_half_width
    }
    /// Level count at the center
    pub fn max_level_count(&self) -> u32 {
        self.params.max_level_count
    }
    /// Total flare length
    pub fn flare_length(&self) -> f64 {
        self.params.flare_length
    }
    /// How far the flare reaches on each side
    pub fn flare_half_range(&self) -> f64 {
        self.params.flare_length / 2.0
    }
    /// The plateau this hub actually gets, zero unless it is top tier
    pub fn plateau_radius(&self) -> f64 {
        if self.station_class.is_top_tier() {
            self.params.plateau_radius
        } else {
            0.0
        }
    }
    /// All flare parameters as configured
    pub fn params(&self) -> FlareParams {
        self.params
    }
}

/* =========================================
 *           Builder
 * ========================================= */

/// Builds a [`HubStation`], starting from its class defaults
pub struct HubStationBuilder {
    /// Identifier
    id: HubId,
    /// Name
    name: Option<String>,
    /// Raw, unwrapped center
    center: f64,
    /// Class
    station_class: StationClass,
    /// Shape, seeded from the class
    params: FlareParams,
}

impl HubStationBuilder {
    /// Start here. Flare parameters default to the class's standard flare.
    pub fn new(id: HubId, station_class: StationClass) -> Self {
        Self {
            id,
            name: None,
            center: 0.0,
            station_class,
            params: station_class.default_params(),
        }
    }
    /// Display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    /// Center position, any finite value, it gets wrapped
    pub fn center(mut self, center: f64) -> Self {
        self.center = center;
        self
    }
    /// Half-width at the center
    pub fn max_half_width(mut self, max_half_width: f64) -> Self {
        self.params.max_half_width = max_half_width;
        self
    }
    /// Level count at the center
    pub fn max_level_count(mut self, max_level_count: u32) -> Self {
        self.params.max_level_count = max_level_count;
        self
    }
    /// Total flare length
    pub fn flare_length(mut self, flare_length: f64) -> Self {
        self.params.flare_length = flare_length;
        self
    }
    /// Plateau radius, ignored unless the class is top tier
    pub fn plateau_radius(mut self, plateau_radius: f64) -> Self {
        self.params.plateau_radius = plateau_radius;
        self
    }
    /// Validates the parameters and wraps the center into the ring
    pub fn build(self, space: &RingSpace) -> Result<HubStation> {
        let center = space.wrap_position(self.center)?;
        non_negative("max_half_width", self.params.max_half_width)?;
        non_negative("flare_length", self.params.flare_length)?;
        non_negative("plateau_radius", self.params.plateau_radius)?;
        if self.params.flare_length > space.circumference() {
            return Err(RingError::invalid_argument(
                "flare_length",
                format!(
                    "{} is longer than the ring itself",
                    self.params.flare_length
                ),
            ));
        }
        if self.params.plateau_radius > self.params.flare_length / 2.0 {
            return Err(RingError::invalid_argument(
                "plateau_radius",
                format!(
                    "{} reaches past the flare edge at {}",
                    self.params.plateau_radius,
                    self.params.flare_length / 2.0
                ),
            ));
        }
        Ok(HubStation {
            id: self.id,
            name: self.name,
            center,
            station_class: self.station_class,
            params: self.params,
        })
    }
}

/// Lengths must be finite and not negative
fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(RingError::InvalidCoordinate { value });
    }
    if value < 0.0 {
        return Err(RingError::invalid_argument(
            name,
            format!("must not be negative, got {}", value),
        ));
    }
    Ok(())
}

/// The serialized form of a hub, as found in catalog files.
/// Any flare parameter left out falls back to the class default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubSpec {
    /// Identifier
    pub id: u32,
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
    /// Raw center position in meters
    pub center: f64,
    /// Station class
    pub class: StationClass,
    /// Override of the class half-width
    #[serde(default)]
    pub max_half_width: Option<f64>,
    /// Override of the class level count
    #[serde(default)]
    pub max_level_count: Option<u32>,
    /// Override of the class flare length
    #[serde(default)]
    pub flare_length: Option<f64>,
    /// Override of the class plateau
    #[serde(default)]
    pub plateau_radius: Option<f64>,
}

impl HubSpec {
    /// Turns the spec into a validated hub
    pub fn build(&self, space: &RingSpace) -> Result<HubStation> {
        let mut builder = HubStationBuilder::new(HubId(self.id), self.class).center(self.center);
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(max_half_width) = self.max_half_width {
            builder = builder.max_half_width(max_half_width);
        }
        if let Some(max_level_count) = self.max_level_count {
            builder = builder.max_level_count(max_level_count);
        }
        if let Some(flare_length) = self.flare_length {
            builder = builder.flare_length(flare_length);
        }
        if let Some(plateau_radius) = self.plateau_radius {
            builder = builder.plateau_radius(plateau_radius);
        }
        builder.build(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_only_pillars_get_a_plateau() {
        let space = RingSpace::default();
        for class in StationClass::iter() {
            let hub = HubStationBuilder::new(HubId(0), class)
                .plateau_radius(1_000.0)
                .build(&space)
                .unwrap();
            if class.is_top_tier() {
                assert_eq!(hub.plateau_radius(), 1_000.0);
            } else {
                assert_eq!(hub.plateau_radius(), 0.0);
            }
        }
    }

    #[test]
    fn test_class_names_round_trip_through_strum() {
        for class in StationClass::iter() {
            assert_eq!(StationClass::from_str(class.as_ref()).unwrap(), class);
        }
        assert_eq!(StationClass::PillarHub.to_string(), "pillar_hub");
    }

    #[test]
    fn test_center_is_wrapped() {
        let space = RingSpace::default();
        let hub = HubStationBuilder::new(HubId(3), StationClass::LocalStation)
            .center(-1_000.0)
            .build(&space)
            .unwrap();
        assert_eq!(hub.center().meters(), 263_999_000.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let space = RingSpace::default();
        let base = || HubStationBuilder::new(HubId(0), StationClass::RegionalHub);
        assert!(matches!(
            base().flare_length(-1.0).build(&space),
            Err(RingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            base().center(f64::NAN).build(&space),
            Err(RingError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            base().max_half_width(f64::INFINITY).build(&space),
            Err(RingError::InvalidCoordinate { .. })
        ));
        assert!(base().plateau_radius(20_000.0).build(&space).is_err());
    }

    #[test]
    fn test_spec_overrides_class_defaults() {
        let space = RingSpace::default();
        let spec: HubSpec = serde_json::from_str(
            r#"{ "id": 4, "center": 5000.0, "class": "regional_hub", "flare_length": 20000.0 }"#,
        )
        .unwrap();
        let hub = spec.build(&space).unwrap();
        assert_eq!(hub.flare_length(), 20_000.0);
        assert_eq!(hub.max_half_width(), 8_000.0);
        assert_eq!(hub.name(), None);
    }
}
