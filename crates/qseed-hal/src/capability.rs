//! Backend capability introspection.
//!
//! [`Capabilities`] describe what a backend can run: qubit count, the gate
//! names it accepts (OpenQASM 3 naming) and its shot limit. The seeding
//! pipeline only needs the qubit count and the simulator flag, but
//! `validate()` implementations check the gate set as well.

use serde::{Deserialize, Serialize};

/// Hardware capabilities of a quantum backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gate set.
    pub gate_set: GateSet,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
}

impl Capabilities {
    /// Create capabilities for the local simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: 100_000,
            is_simulator: true,
        }
    }

    /// Create capabilities for an IBM Quantum device.
    ///
    /// IBM accepts the standard library gates in submitted OpenQASM and maps
    /// them to the device's native set server side.
    pub fn ibm(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::ibm(),
            max_shots: 100_000,
            is_simulator: false,
        }
    }

    /// Override the shot limit.
    #[must_use]
    pub fn with_max_shots(mut self, max_shots: u32) -> Self {
        self.max_shots = max_shots;
        self
    }

    /// Mark as a simulator.
    #[must_use]
    pub fn with_simulator(mut self, is_simulator: bool) -> Self {
        self.is_simulator = is_simulator;
        self
    }
}

/// Gate names a backend accepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateSet {
    /// Supported single-qubit gates.
    pub single_qubit: Vec<String>,
    /// Supported two-qubit gates.
    pub two_qubit: Vec<String>,
    /// Gates the hardware executes without decomposition.
    pub native: Vec<String>,
}

impl GateSet {
    /// IBM gate set.
    ///
    /// Native gates are `ecr`/`cz`, `rz`, `sx`, `x`; `h` and `cx` are accepted
    /// through the standard library include.
    pub fn ibm() -> Self {
        Self {
            single_qubit: names(&["id", "x", "sx", "rz", "h", "y", "z", "s", "sdg", "t", "tdg", "rx", "ry"]),
            two_qubit: names(&["cx", "cz", "ecr", "swap"]),
            native: names(&["id", "x", "sx", "rz", "ecr", "cz"]),
        }
    }

    /// Every gate the circuit IR can express.
    pub fn universal() -> Self {
        let single = names(&[
            "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz",
        ]);
        let two = names(&["cx", "cz", "swap"]);
        let native = single.iter().chain(two.iter()).cloned().collect();
        Self {
            single_qubit: single,
            two_qubit: two,
            native,
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate) || self.two_qubit.iter().any(|g| g == gate)
    }

    /// Check if a gate is native.
    pub fn is_native(&self, gate: &str) -> bool {
        self.native.iter().any(|g| g == gate)
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_capabilities() {
        let caps = Capabilities::simulator(20);
        assert_eq!(caps.num_qubits, 20);
        assert!(caps.is_simulator);
        assert!(caps.gate_set.contains("h"));
        assert!(caps.gate_set.contains("cx"));
        assert!(caps.gate_set.is_native("swap"));
    }

    #[test]
    fn test_ibm_capabilities() {
        let caps = Capabilities::ibm("ibm_kyiv", 127).with_max_shots(8192);
        assert_eq!(caps.name, "ibm_kyiv");
        assert!(!caps.is_simulator);
        assert_eq!(caps.max_shots, 8192);
        assert!(caps.gate_set.contains("h"));
        assert!(!caps.gate_set.is_native("h"));
        assert!(caps.gate_set.is_native("ecr"));
        assert!(!caps.gate_set.contains("ccx"));
    }
}
