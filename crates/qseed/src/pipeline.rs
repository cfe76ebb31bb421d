//! The end-to-end seeding workflow.

use serde::Serialize;
use tracing::info;

use qseed_hal::Counts;

use crate::config::SeedConfig;
use crate::entangle::seed_circuit;
use crate::error::SeedResult;
use crate::execute::execute_with_fallback;
use crate::seed::{Seed, fold_counts};
use crate::select::{FallbackReason, SelectedBackend, acquire_backend};

/// Everything one seeding run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub seed: Seed,
    /// Backend that ran the circuit.
    pub backend: String,
    pub simulated: bool,
    /// Why the simulator was used, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    pub shots: u32,
    pub qubits: u32,
    pub most_probable: String,
    pub probability: f64,
    pub counts: Counts,
    /// ASCII drawing of the circuit that was run.
    #[serde(skip)]
    pub drawing: String,
}

/// Runs the seeding workflow for one configuration.
#[derive(Debug, Clone)]
pub struct QuantumSeeder {
    config: SeedConfig,
}

impl QuantumSeeder {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Select a backend against live IBM Quantum and run.
    pub async fn run(&self) -> SeedResult<SeedReport> {
        self.config.validate()?;
        let selected = acquire_backend(&self.config).await;
        self.run_on(selected).await
    }

    /// Run on an already selected backend.
    pub async fn run_on(&self, selected: SelectedBackend) -> SeedResult<SeedReport> {
        info!("using backend {}", selected.name());

        let entangled = seed_circuit(self.config.qubits, self.config.classical_bits())?;
        let (execution, ran_on) =
            execute_with_fallback(selected, &entangled.circuit, &self.config).await?;
        let seed = fold_counts(&execution.counts)?;
        info!("seed has {} bits", seed.bits());

        Ok(SeedReport {
            seed,
            backend: execution.backend,
            simulated: ran_on.is_simulated(),
            fallback: ran_on.fallback().cloned(),
            shots: self.config.shots,
            qubits: self.config.qubits,
            most_probable: execution.most_probable,
            probability: execution.probability,
            counts: execution.counts,
            drawing: entangled.drawing,
        })
    }
}

/// Produce a seed with `config` in one call.
pub async fn quantum_seed(config: SeedConfig) -> SeedResult<Seed> {
    Ok(QuantumSeeder::new(config).run().await?.seed)
}
