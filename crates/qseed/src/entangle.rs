//! Building the seed circuit.
//!
//! ```text
//! q[0]: --[H]---*-----------[M:0]--
//! q[1]: --[H]--(+)--*-------[M:1]--
//! q[2]: --[H]------(+)--*---[M:2]--
//! ...
//! ```
//!
//! Every qubit gets a Hadamard, each neighbouring pair is chained with a CX,
//! and each qubit is measured into the classical bit with the same index.

use qseed_ir::{Circuit, Instruction};

use crate::error::{SeedError, SeedResult};

/// Name given to the seed circuit.
pub const CIRCUIT_NAME: &str = "quantumseed";

/// A fully built seed circuit and its drawing.
#[derive(Debug, Clone)]
pub struct EntangledCircuit {
    pub circuit: Circuit,
    /// ASCII rendering of `circuit`.
    pub drawing: String,
}

/// Create the empty seed circuit with registers `q` and `c`.
pub fn prepare_circuit(qubits: u32, classical_bits: u32) -> SeedResult<Circuit> {
    if qubits == 0 {
        return Err(SeedError::InvalidConfig(
            "the quantum register needs at least one qubit".into(),
        ));
    }
    if classical_bits == 0 {
        return Err(SeedError::InvalidConfig(
            "the classical register needs at least one bit".into(),
        ));
    }

    let mut circuit = Circuit::new(CIRCUIT_NAME);
    circuit.add_qreg("q", qubits)?;
    circuit.add_creg("c", classical_bits)?;
    Ok(circuit)
}

/// Apply the entangling layer and measurements to `circuit`.
///
/// Only the first `min(qubits, classical bits)` qubits are measured.
pub fn entangle(mut circuit: Circuit) -> SeedResult<EntangledCircuit> {
    let qubits: Vec<_> = circuit.qubits().iter().map(|q| q.id).collect();
    if qubits.is_empty() {
        return Err(SeedError::InvalidConfig(
            "cannot entangle a circuit without qubits".into(),
        ));
    }
    let clbits: Vec<_> = circuit.clbits().iter().map(|c| c.id).collect();

    for &q in &qubits {
        circuit.h(q)?;
    }
    for pair in qubits.windows(2) {
        circuit.cx(pair[0], pair[1])?;
    }

    let width = qubits.len().min(clbits.len());
    if width > 0 {
        circuit.apply(Instruction::measure_many(
            qubits.iter().copied().take(width),
            clbits.iter().copied().take(width),
        )?)?;
    }

    let drawing = circuit.draw();
    tracing::debug!(
        qubits = qubits.len(),
        measured = width,
        depth = circuit.depth(),
        "entangled circuit"
    );

    Ok(EntangledCircuit { circuit, drawing })
}

/// Prepare and entangle in one step.
pub fn seed_circuit(qubits: u32, classical_bits: u32) -> SeedResult<EntangledCircuit> {
    entangle(prepare_circuit(qubits, classical_bits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qseed_ir::{InstructionKind, QubitId};

    #[test]
    fn test_prepare_registers() {
        let circuit = prepare_circuit(3, 2).unwrap();
        assert_eq!(circuit.name(), "quantumseed");
        assert_eq!(circuit.num_qubits(), 3);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.qregs()[0].name, "q");
        assert_eq!(circuit.cregs()[0].name, "c");
        assert_eq!(circuit.num_ops(), 0);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            prepare_circuit(0, 3),
            Err(SeedError::InvalidConfig(_))
        ));
        assert!(matches!(
            prepare_circuit(3, 0),
            Err(SeedError::InvalidConfig(_))
        ));
        assert!(matches!(
            entangle(Circuit::new("empty")),
            Err(SeedError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_entangle_structure() {
        let entangled = seed_circuit(4, 4).unwrap();
        let ops = entangled.circuit.count_ops();
        assert_eq!(ops["h"], 4);
        assert_eq!(ops["cx"], 3);
        assert_eq!(ops["measure"], 1);
        assert_eq!(entangled.circuit.depth(), 5);

        let cx_pairs: Vec<_> = entangled
            .circuit
            .instructions()
            .iter()
            .filter(|i| i.name() == "cx")
            .map(|i| (i.qubits[0], i.qubits[1]))
            .collect();
        assert_eq!(
            cx_pairs,
            vec![
                (QubitId(0), QubitId(1)),
                (QubitId(1), QubitId(2)),
                (QubitId(2), QubitId(3))
            ]
        );
    }

    #[test]
    fn test_single_qubit_has_no_cx() {
        let entangled = seed_circuit(1, 1).unwrap();
        assert!(!entangled.circuit.count_ops().contains_key("cx"));
        assert_eq!(entangled.circuit.depth(), 2);
    }

    #[test]
    fn test_measures_overlapping_prefix() {
        let entangled = seed_circuit(5, 3).unwrap();
        let measure = entangled
            .circuit
            .instructions()
            .iter()
            .find(|i| matches!(i.kind, InstructionKind::Measure))
            .unwrap();
        assert_eq!(measure.qubits.len(), 3);
        assert_eq!(measure.clbits.len(), 3);

        let wide = seed_circuit(2, 6).unwrap();
        let measured: usize = wide
            .circuit
            .instructions()
            .iter()
            .filter(|i| i.is_measure())
            .map(|i| i.qubits.len())
            .sum();
        assert_eq!(measured, 2);
    }

    #[test]
    fn test_drawing_shows_every_qubit() {
        let entangled = seed_circuit(3, 3).unwrap();
        for q in 0..3 {
            assert!(entangled.drawing.contains(&format!("q[{q}]")));
        }
        assert!(entangled.drawing.contains("[H]"));
    }
}
