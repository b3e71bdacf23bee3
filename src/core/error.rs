use thiserror::Error;

use crate::core::types::PointId;

#[derive(Error, Debug)]
pub enum TownError {
    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("No route from {from:?} to {to:?}")]
    Routing { from: PointId, to: PointId },

    #[error("Cannot split patch between {a:?} and {b:?}")]
    Split { a: PointId, b: PointId },

    #[error("Generation failed after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<TownError> },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl TownError {
    /// Errors that only invalidate the current construction attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TownError::Geometry(_) | TownError::Routing { .. } | TownError::Split { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TownError>;
