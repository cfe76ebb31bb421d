//! Error types for QASM emission.

use thiserror::Error;

/// Errors that can occur while emitting QASM.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// A register name is not a valid OpenQASM identifier.
    #[error("Invalid OpenQASM identifier: '{0}'")]
    InvalidIdentifier(String),
}

/// Result type for emission.
pub type EmitResult<T> = Result<T, EmitError>;
