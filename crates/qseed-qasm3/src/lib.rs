//! OpenQASM 3 emission for qseed circuits.
//!
//! Remote providers accept circuits as OpenQASM source. This crate turns a
//! [`qseed_ir::Circuit`] into that text form.
//!
//! ```rust
//! use qseed_ir::Circuit;
//! use qseed_qasm3::emit;
//!
//! let circuit = Circuit::bell().unwrap();
//! let qasm = emit(&circuit).unwrap();
//! assert!(qasm.starts_with("OPENQASM 3.0;"));
//! assert!(qasm.contains("cx q[0], q[1];"));
//! ```

mod emitter;
mod error;

pub use emitter::{EmitOptions, emit, emit_with};
pub use error::{EmitError, EmitResult};
