//! Draw command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use qseed::seed_circuit;

use super::common::{ConfigOverrides, load_config};

/// Print the seed circuit for the configured register sizes.
pub fn execute(config_path: Option<&Path>, overrides: &ConfigOverrides, qasm: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let entangled = seed_circuit(config.qubits, config.classical_bits())?;
    let circuit = &entangled.circuit;

    println!(
        "{} {}: {} qubits, {} classical bits, depth {}",
        style("→").cyan().bold(),
        style(circuit.name()).green(),
        circuit.num_qubits(),
        circuit.num_clbits(),
        circuit.depth()
    );
    println!();
    println!("{}", entangled.drawing);

    if qasm {
        println!();
        print!("{}", qseed_qasm3::emit(circuit)?);
    }
    Ok(())
}
