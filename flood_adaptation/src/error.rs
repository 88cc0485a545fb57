//! Error taxonomy for the adaptation model
//!
//! Configuration and lookup failures abort a run; data-quality failures are
//! collected while loading and the offending records are dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// Malformed or missing model-wide parameter
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No rate-table row for the requested zone and freeboard
    #[error("no rate-table entry for zone '{zone}' at freeboard {height} ft")]
    Lookup { zone: String, height: f64 },

    /// Structure record unusable for a decision
    #[error("structure {structure_id}: {reason}")]
    DataQuality { structure_id: String, reason: String },

    /// Household decision failed; carries the structure that caused it
    #[error("household {structure_id}: {source}")]
    Household {
        structure_id: String,
        #[source]
        source: Box<SimulationError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl SimulationError {
    pub fn data_quality(structure_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulationError::DataQuality {
            structure_id: structure_id.into(),
            reason: reason.into(),
        }
    }

    /// Attach the failing structure to an error raised inside a decision
    pub fn for_household(self, structure_id: impl Into<String>) -> Self {
        SimulationError::Household {
            structure_id: structure_id.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
