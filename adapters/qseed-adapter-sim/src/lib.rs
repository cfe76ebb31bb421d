//! qseed Local Statevector Simulator
//!
//! The fallback backend used when no IBM device is reachable or eligible.
//! Exact statevector simulation, limited to about 20-25 qubits.
//!
//! # Performance
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 15 | ~512 KB |
//! | 20 | ~16 MB |
//! | 25 | ~512 MB |
//!
//! # Example
//!
//! ```ignore
//! use qseed_adapter_sim::SimulatorBackend;
//! use qseed_hal::Backend;
//! use qseed_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SimulatorBackend::new().with_seed(7);
//!
//!     let circuit = Circuit::bell()?;
//!     let job_id = backend.submit(&circuit, 1000).await?;
//!     let result = backend.wait(&job_id).await?;
//!
//!     // Expect ~50% "00" and ~50% "11"
//!     println!("Results: {:?}", result.counts);
//!     Ok(())
//! }
//! ```

mod simulator;
mod statevector;

pub use simulator::{DEFAULT_MAX_QUBITS, SimulatorBackend};
