//! The error taxonomy shared by every layer of the ring.
//!
//! Arithmetic on the ring is total, so most of these only show up on malformed input.
//! [`RingError::SeamMismatch`] is different: it means cached or persisted geometry disagrees
//! with its neighbour and is always surfaced, never patched over.
#![warn(missing_docs)]

use thiserror::Error;

use crate::ring::coords::{ChunkIndex, Floor};
use crate::stations::hub::HubId;

/// Everything that can go wrong in the ring core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RingError {
    /// A coordinate was NaN or infinite
    #[error("invalid coordinate {value}: ring coordinates must be finite")]
    InvalidCoordinate {
        /// The offending value
        value: f64,
    },

    /// A parameter was outside of its legal domain (negative radius, negative length, ...)
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the parameter
        name: &'static str,
        /// Human readable explanation
        reason: String,
    },

    /// Two adjacent chunks disagree about the geometry at their shared boundary
    #[error(
        "seam mismatch on floor {floor} between chunk {chunk} and chunk {next}: \
         end width {end_width} vs start width {start_width} (delta {delta}), \
         end levels {end_levels} vs start levels {start_levels}"
    )]
    SeamMismatch {
        /// Floor both chunks live on
        floor: Floor,
        /// The chunk whose end was compared
        chunk: ChunkIndex,
        /// The chunk whose start was compared, `chunk + 1` wrapped
        next: ChunkIndex,
        /// `end_width` of `chunk`
        end_width: f64,
        /// `start_width` of `next`
        start_width: f64,
        /// Absolute width difference
        delta: f64,
        /// `end_levels` of `chunk`
        end_levels: u32,
        /// `start_levels` of `next`
        start_levels: u32,
    },

    /// More than one hub claims a position. Resolved deterministically, but worth a log line.
    #[error("position {position} lies inside the flare of several hubs {hubs:?}")]
    HubResolutionAmbiguous {
        /// The wrapped position being resolved
        position: f64,
        /// Every hub whose flare contains the position, nearest first
        hubs: Vec<HubId>,
    },

    /// The persistence collaborator failed to encode, decode, or store a record
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The deployment configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand used across the crate
pub type Result<T> = std::result::Result<T, RingError>;

impl RingError {
    /// Shorthand for [`RingError::InvalidArgument`]
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        RingError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// Rejects NaN and infinities, the only inputs the ring arithmetic refuses
pub fn ensure_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RingError::InvalidCoordinate { value })
    }
}
