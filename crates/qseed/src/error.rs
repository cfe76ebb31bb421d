//! Error types for the seeding pipeline.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while producing a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A requested register or circuit shape is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Circuit construction failed.
    #[error("Circuit error: {0}")]
    Circuit(#[from] qseed_ir::IrError),

    /// The backend (after any fallback) failed.
    #[error(transparent)]
    Backend(#[from] qseed_hal::HalError),

    /// IBM Quantum could not be reached.
    #[error(transparent)]
    Ibm(#[from] qseed_adapter_ibm::IbmError),

    /// Execution produced no measurement counts.
    #[error("Execution returned no measurement counts")]
    EmptyCounts,

    /// The concatenated counts did not parse as hexadecimal.
    #[error("Seed digits did not parse as hexadecimal: {0}")]
    Parse(#[from] num_bigint::ParseBigIntError),
}

/// Result type for seeding operations.
pub type SeedResult<T> = Result<T, SeedError>;
