//! Typed errors for hotel search.
//!
//! `StoreError` is fatal for a whole search. `NoMatch` only ever removes one
//! hotel from the result and never leaves the per-hotel enrichment step.

use thiserror::Error;

/// Failure talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity, query or row decoding failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a single hotel was left out of the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoMatch {
    #[error("no room matches the filter")]
    NoQualifyingRoom,

    #[error("hotel is {distance_km:.2} km away, beyond the {max_km} km limit")]
    OutOfRange { distance_km: f64, max_km: f64 },

    #[error("hotel has no usable coordinates for a distance search")]
    MissingCoordinates,
}

impl NoMatch {
    /// Short stable label, used as a log field.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoQualifyingRoom => "no_room",
            Self::OutOfRange { .. } => "out_of_range",
            Self::MissingCoordinates => "no_coordinates",
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a per-hotel step that may exclude the hotel.
pub type Matched<T> = std::result::Result<T, NoMatch>;
