//! qseed Circuit Representation
//!
//! The small circuit model used by qseed to describe the entanglement
//! circuit it sends to a backend. Circuits are stored as an ordered list of
//! instructions over named quantum and classical registers.
//!
//! # Example: Entangling a Register
//!
//! ```rust
//! use qseed_ir::{Circuit, ClbitId, QubitId};
//!
//! let mut circuit = Circuit::new("entangle");
//! let q = circuit.add_qreg("q", 3).unwrap();
//! let c = circuit.add_creg("c", 3).unwrap();
//!
//! for &qubit in &q {
//!     circuit.h(qubit).unwrap();
//! }
//! for pair in q.windows(2) {
//!     circuit.cx(pair[0], pair[1]).unwrap();
//! }
//! circuit.measure_register("q", "c").unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 3);
//! assert_eq!(c, vec![ClbitId(0), ClbitId(1), ClbitId(2)]);
//! assert_eq!(q[2], QubitId(2));
//! assert_eq!(circuit.depth(), 4);
//! println!("{}", circuit.draw());
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H` | 1 | Hadamard gate |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `S`, `Sdg`, `T`, `Tdg`, `SX` | 1 | Phase and sqrt(X) gates |
//! | `Rx`, `Ry`, `Rz` | 1 | Rotation gates |
//! | `CX` | 2 | Controlled-NOT (CNOT) |
//! | `CZ` | 2 | Controlled-Z |
//! | `Swap` | 2 | SWAP gate |

pub mod circuit;
pub mod draw;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::{Circuit, Register};
pub use draw::draw;
pub use error::{IrError, IrResult};
pub use gate::{Gate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
