//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_context(.instruction))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Instruction name for context.
        instruction: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit{}", format_context(.instruction))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Instruction name for context.
        instruction: Option<String>,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Measurement operands do not pair up.
    #[error("Measurement maps {qubits} qubits onto {clbits} classical bits")]
    MeasureArity {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of target classical bits.
        clbits: usize,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_context(.instruction))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Instruction name for context.
        instruction: Option<String>,
    },

    /// A register with this name already exists.
    #[error("Register '{0}' already declared")]
    DuplicateRegister(String),
}

#[allow(clippy::ref_option)]
fn format_context(instruction: &Option<String>) -> String {
    match instruction {
        Some(name) => format!(" (instruction: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
