//! Helpers shared by several commands.

use std::path::Path;

use anyhow::Result;
use console::style;

use qseed::SeedConfig;
use qseed_hal::Counts;

/// Values given on the command line, applied over the loaded configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub qubits: Option<u32>,
    pub classical_bits: Option<u32>,
    pub max_qubits: Option<u32>,
    pub shots: Option<u32>,
    pub simulate: bool,
    pub sim_seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut SeedConfig) {
        if let Some(qubits) = self.qubits {
            config.qubits = qubits;
        }
        if let Some(bits) = self.classical_bits {
            config.classical_bits = Some(bits);
        }
        if let Some(max) = self.max_qubits {
            config.max_qubits = Some(max);
        }
        if let Some(shots) = self.shots {
            config.shots = shots;
        }
        if self.simulate {
            config.simulate = true;
        }
        if let Some(seed) = self.sim_seed {
            config.simulator.seed = Some(seed);
        }
    }
}

/// Load file and environment configuration, then apply `overrides`.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<SeedConfig> {
    let mut config = SeedConfig::layered(path)?;
    overrides.apply(&mut config);
    config.validate()?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Print a histogram, most frequent first.
pub fn print_counts(counts: &Counts, shots: u32) {
    let sorted = counts.sorted();

    for (bitstring, count) in sorted.iter().take(16) {
        let prob = *count as f64 / f64::from(shots) * 100.0;
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}
