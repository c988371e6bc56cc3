//! Deployment constants for the ring.
//!
//! These are fixed for the lifetime of a process. Load them once with [`RingConfig::load`]
//! (or build one with [`RingConfigBuilder`] in tests) and hand them to the ring space, the
//! flare model, and the chunk store.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RingError, Result};

/// Environment variable naming a JSON file to load the configuration from
pub const CONFIG_ENV_VAR: &str = "ORBITAL_RING_CONFIG";

/// The circumference of the ring in meters (264,000 km)
pub const DEFAULT_CIRCUMFERENCE: f64 = 264_000_000.0;
/// The length of one chunk in meters (1 km)
pub const DEFAULT_CHUNK_LENGTH: f64 = 1_000.0;
/// Half of the 400m base width of the ring
pub const DEFAULT_BASE_HALF_WIDTH: f64 = 200.0;
/// Base level count: levels -2, -1, 0, +1, +2
pub const DEFAULT_BASE_LEVELS: u32 = 5;
/// How far apart two widths may be across a seam before it counts as a mismatch
pub const DEFAULT_SEAM_TOLERANCE: f64 = 0.1;
/// Number of lock shards in the geometry cache
pub const DEFAULT_CACHE_SHARDS: usize = 64;

/// Fixed-at-deployment constants of the ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Ring circumference `C` in meters
    pub circumference: f64,
    /// Chunk length `L` in meters, must divide `C`
    pub chunk_length: f64,
    /// Half-width of the ring away from any hub
    pub base_half_width: f64,
    /// Level count of the ring away from any hub
    pub base_levels: u32,
    /// Width tolerance when comparing chunk seams
    pub seam_tolerance: f64,
    /// Lock shards in the chunk geometry cache
    pub cache_shards: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            circumference: DEFAULT_CIRCUMFERENCE,
            chunk_length: DEFAULT_CHUNK_LENGTH,
            base_half_width: DEFAULT_BASE_HALF_WIDTH,
            base_levels: DEFAULT_BASE_LEVELS,
            seam_tolerance: DEFAULT_SEAM_TOLERANCE,
            cache_shards: DEFAULT_CACHE_SHARDS,
        }
    }
}

/* =========================================
 *              Loading
 * ========================================= */
impl RingConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RingConfig =
            serde_json::from_str(json).map_err(|e| RingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RingError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`] if it is set, otherwise the defaults
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => {
                debug!(path = %path, "loading ring configuration");
                Self::from_json_file(path)
            }
            _ => {
                debug!("using default ring configuration");
                Ok(Self::default())
            }
        }
    }

    /// Checks that every constant is usable.
    /// The chunk length has to tile the circumference exactly or the last chunk would be short.
    pub fn validate(&self) -> Result<()> {
        positive("circumference", self.circumference)?;
        positive("chunk_length", self.chunk_length)?;
        positive("seam_tolerance", self.seam_tolerance)?;
        if !self.base_half_width.is_finite() || self.base_half_width < 0.0 {
            return Err(RingError::Config(format!(
                "base_half_width must be finite and non-negative, got {}",
                self.base_half_width
            )));
        }
        if self.chunk_length > self.circumference {
            return Err(RingError::Config(format!(
                "chunk_length {} exceeds circumference {}",
                self.chunk_length, self.circumference
            )));
        }
        let chunks = self.circumference / self.chunk_length;
        if (chunks - chunks.round()).abs() > 1e-9 {
            return Err(RingError::Config(format!(
                "circumference {} is not a multiple of chunk_length {}",
                self.circumference, self.chunk_length
            )));
        }
        if chunks.round() > u32::MAX as f64 {
            return Err(RingError::Config(format!(
                "{} chunks do not fit a chunk index",
                chunks
            )));
        }
        if self.cache_shards == 0 {
            return Err(RingError::Config("cache_shards must be at least 1".into()));
        }
        Ok(())
    }

    /// Full base width of the ring
    pub fn base_width(&self) -> f64 {
        self.base_half_width * 2.0
    }
}

/// Shared check for the strictly positive constants
fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RingError::Config(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

/* =========================================
 *              Builder
 * ========================================= */

/// Builds a [`RingConfig`] one constant at a time
pub struct RingConfigBuilder {
    /// The config under construction
    config: RingConfig,
}

impl Default for RingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RingConfigBuilder {
    /// Start here, from the deployment defaults
    pub fn new() -> Self {
        Self {
            config: RingConfig::default(),
        }
    }
    /// Ring circumference in meters
    pub fn circumference(mut self, circumference: f64) -> Self {
        self.config.circumference = circumference;
        self
    }
    /// Chunk length in meters
    pub fn chunk_length(mut self, chunk_length: f64) -> Self {
        self.config.chunk_length = chunk_length;
        self
    }
    /// Half-width of the ring away from hubs
    pub fn base_half_width(mut self, base_half_width: f64) -> Self {
        self.config.base_half_width = base_half_width;
        self
    }
    /// Level count away from hubs
    pub fn base_levels(mut self, base_levels: u32) -> Self {
        self.config.base_levels = base_levels;
        self
    }
    /// Seam width tolerance
    pub fn seam_tolerance(mut self, seam_tolerance: f64) -> Self {
        self.config.seam_tolerance = seam_tolerance;
        self
    }
    /// Lock shards in the geometry cache
    pub fn cache_shards(mut self, cache_shards: usize) -> Self {
        self.config.cache_shards = cache_shards;
        self
    }
    /// Validates and returns the config
    pub fn build(self) -> Result<RingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
