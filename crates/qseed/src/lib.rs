//! Random seeds from entangled qubits.
//!
//! The workflow has four steps:
//!
//! 1. [`select`]: pick the IBM Quantum device with the shortest queue that
//!    has enough qubits, or fall back to the local simulator.
//! 2. [`entangle`]: put every qubit in superposition, chain neighbours with
//!    CX gates and measure.
//! 3. [`execute`]: run the circuit and summarize the histogram.
//! 4. [`seed`]: concatenate the decimal counts in bitstring order and read
//!    the digits as one hexadecimal integer.
//!
//! # Example
//!
//! ```ignore
//! use qseed::{QuantumSeeder, SeedConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SeedConfig::load(None)?;
//!     let report = QuantumSeeder::new(config).run().await?;
//!     println!("{} (from {})", report.seed, report.backend);
//!     let mut rng = report.seed.into_rng();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entangle;
pub mod error;
pub mod execute;
pub mod pipeline;
pub mod seed;
pub mod select;

pub use config::{ConfigError, SeedConfig};
pub use entangle::{EntangledCircuit, entangle, prepare_circuit, seed_circuit};
pub use error::{SeedError, SeedResult};
pub use execute::{Execution, execute_circuit, execute_with_fallback};
pub use pipeline::{QuantumSeeder, SeedReport, quantum_seed};
pub use seed::{Seed, fold_counts};
pub use select::{
    BackendChoice, DeviceDirectory, DeviceProbe, DeviceStatus, FallbackReason, SelectedBackend,
    acquire_backend, choose_backend, pick_lowest_queue,
};
