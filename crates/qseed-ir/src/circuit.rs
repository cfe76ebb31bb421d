//! High-level circuit builder API.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// A named register and the ids it owns, in register order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register<Id> {
    /// Register name.
    pub name: String,
    /// Members in index order.
    pub bits: Vec<Id>,
}

impl<Id> Register<Id> {
    /// Number of bits in the register.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the register is empty.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// A quantum circuit.
///
/// Instructions are kept in program order. Every appended instruction is
/// checked against the declared qubits and classical bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    qubits: Vec<Qubit>,
    clbits: Vec<Clbit>,
    qregs: Vec<Register<QubitId>>,
    cregs: Vec<Register<ClbitId>>,
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubits: vec![],
            clbits: vec![],
            qregs: vec![],
            cregs: vec![],
            instructions: vec![],
        }
    }

    /// Create a circuit with a quantum register `q` and a classical register `c`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit.push_qreg("q".into(), num_qubits);
        }
        if num_clbits > 0 {
            circuit.push_creg("c".into(), num_clbits);
        }
        circuit
    }

    /// Add a quantum register with `size` qubits.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        if self.qregs.iter().any(|r| r.name == name) || self.cregs.iter().any(|r| r.name == name)
        {
            return Err(IrError::DuplicateRegister(name));
        }
        Ok(self.push_qreg(name, size))
    }

    /// Add a classical register with `size` bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        if self.qregs.iter().any(|r| r.name == name) || self.cregs.iter().any(|r| r.name == name)
        {
            return Err(IrError::DuplicateRegister(name));
        }
        Ok(self.push_creg(name, size))
    }

    fn push_qreg(&mut self, name: String, size: u32) -> Vec<QubitId> {
        let mut ids = Vec::with_capacity(size as usize);
        for index in 0..size {
            let id = QubitId(self.qubits.len() as u32);
            self.qubits.push(Qubit::new(id, &name, index));
            ids.push(id);
        }
        self.qregs.push(Register {
            name,
            bits: ids.clone(),
        });
        ids
    }

    fn push_creg(&mut self, name: String, size: u32) -> Vec<ClbitId> {
        let mut ids = Vec::with_capacity(size as usize);
        for index in 0..size {
            let id = ClbitId(self.clbits.len() as u32);
            self.clbits.push(Clbit::new(id, &name, index));
            ids.push(id);
        }
        self.cregs.push(Register {
            name,
            bits: ids.clone(),
        });
        ids
    }

    /// Append an instruction after validating its operands.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        let context = Some(instruction.name().to_string());

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits();
            let got = instruction.qubits.len() as u32;
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected,
                    got,
                });
            }
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if qubit.0 as usize >= self.qubits.len() {
                return Err(IrError::QubitNotFound {
                    qubit,
                    instruction: context,
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    instruction: context,
                });
            }
        }

        for &clbit in &instruction.clbits {
            if clbit.0 as usize >= self.clbits.len() {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    instruction: context,
                });
            }
        }

        self.instructions.push(instruction);
        Ok(self)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Y, qubit))
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Z, qubit))
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::S, qubit))
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::T, qubit))
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::SX, qubit))
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Rx(theta), qubit))
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Ry(theta), qubit))
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Rz(theta), qubit))
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::CX, control, target))
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::CZ, control, target))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::Swap, q1, q2))
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.apply(Instruction::measure(qubit, clbit))
    }

    /// Measure a quantum register into a classical register, index by index.
    ///
    /// Only the overlapping prefix is measured when the sizes differ.
    pub fn measure_register(&mut self, qreg: &str, creg: &str) -> IrResult<&mut Self> {
        let qubits = self
            .qregs
            .iter()
            .find(|r| r.name == qreg)
            .map(|r| r.bits.clone())
            .unwrap_or_default();
        let clbits = self
            .cregs
            .iter()
            .find(|r| r.name == creg)
            .map(|r| r.bits.clone())
            .unwrap_or_default();
        let width = qubits.len().min(clbits.len());
        if width == 0 {
            return Ok(self);
        }
        self.apply(Instruction::measure_many(
            qubits.into_iter().take(width),
            clbits.into_iter().take(width),
        )?)
    }

    /// Measure every qubit into the classical bit with the same index.
    ///
    /// Adds a classical register `meas` when the circuit has fewer
    /// classical bits than qubits.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.clbits.len() < self.qubits.len() {
            let missing = (self.qubits.len() - self.clbits.len()) as u32;
            self.push_creg("meas".into(), missing);
        }
        let qubits: Vec<_> = self.qubits.iter().map(|q| q.id).collect();
        let clbits: Vec<_> = self.clbits.iter().map(|c| c.id).take(qubits.len()).collect();
        if qubits.is_empty() {
            return Ok(self);
        }
        self.apply(Instruction::measure_many(qubits, clbits)?)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::reset(qubit))
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits: Vec<_> = self.qubits.iter().map(|q| q.id).collect();
        self.apply(Instruction::barrier(qubits))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the qubits in the circuit.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Get the classical bits in the circuit.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Get the quantum registers.
    pub fn qregs(&self) -> &[Register<QubitId>] {
        &self.qregs
    }

    /// Get the classical registers.
    pub fn cregs(&self) -> &[Register<ClbitId>] {
        &self.cregs
    }

    /// Get the instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Count instructions by name.
    pub fn count_ops(&self) -> FxHashMap<String, usize> {
        let mut counts = FxHashMap::default();
        for inst in &self.instructions {
            *counts.entry(inst.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Get the circuit depth.
    ///
    /// Each instruction occupies one layer on every qubit and classical bit
    /// it touches; the depth is the deepest wire.
    pub fn depth(&self) -> usize {
        let mut qubit_front = vec![0usize; self.qubits.len()];
        let mut clbit_front = vec![0usize; self.clbits.len()];
        let mut depth = 0;

        for inst in &self.instructions {
            let start = inst
                .qubits
                .iter()
                .map(|q| qubit_front[q.0 as usize])
                .chain(inst.clbits.iter().map(|c| clbit_front[c.0 as usize]))
                .max()
                .unwrap_or(0);
            let layer = start + 1;
            for q in &inst.qubits {
                qubit_front[q.0 as usize] = layer;
            }
            for c in &inst.clbits {
                clbit_front[c.0 as usize] = layer;
            }
            depth = depth.max(layer);
        }

        depth
    }

    /// Render an ASCII drawing of the circuit.
    pub fn draw(&self) -> String {
        crate::draw::draw(self)
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))?
            .cx(QubitId(0), QubitId(1))?
            .measure(QubitId(0), ClbitId(0))?
            .measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        circuit.measure_register("q", "c")?;
        Ok(circuit)
    }
}
