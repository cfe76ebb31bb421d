//! QASM3 emitter.

use qseed_ir::{Circuit, Instruction, InstructionKind};

use crate::error::{EmitError, EmitResult};

/// Options controlling the emitted header.
#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    /// Emit `include "stdgates.inc";` after the version line.
    pub include_stdgates: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            include_stdgates: true,
        }
    }
}

/// Emit a circuit as QASM3 source code with default options.
pub fn emit(circuit: &Circuit) -> EmitResult<String> {
    emit_with(circuit, EmitOptions::default())
}

/// Emit a circuit as QASM3 source code.
pub fn emit_with(circuit: &Circuit, options: EmitOptions) -> EmitResult<String> {
    let mut emitter = Emitter {
        circuit,
        output: String::new(),
    };
    emitter.emit_circuit(options)?;
    Ok(emitter.output)
}

struct Emitter<'a> {
    circuit: &'a Circuit,
    output: String,
}

impl Emitter<'_> {
    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_circuit(&mut self, options: EmitOptions) -> EmitResult<()> {
        self.writeln("OPENQASM 3.0;");
        if options.include_stdgates {
            self.writeln("include \"stdgates.inc\";");
        }
        self.writeln("");

        for qreg in self.circuit.qregs() {
            check_identifier(&qreg.name)?;
            let line = format!("qubit[{}] {};", qreg.len(), qreg.name);
            self.writeln(&line);
        }
        for creg in self.circuit.cregs() {
            check_identifier(&creg.name)?;
            let line = format!("bit[{}] {};", creg.len(), creg.name);
            self.writeln(&line);
        }
        if self.circuit.num_qubits() > 0 || self.circuit.num_clbits() > 0 {
            self.writeln("");
        }

        for instruction in self.circuit.instructions() {
            self.emit_instruction(instruction);
        }
        Ok(())
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let operands = self.qubit_list(instruction);
                let line = match gate.kind.angle() {
                    Some(theta) => format!("{}({}) {operands};", gate.name(), format_angle(theta)),
                    None => format!("{} {operands};", gate.name()),
                };
                self.writeln(&line);
            }
            InstructionKind::Measure => {
                for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    let qubit = &self.circuit.qubits()[q.0 as usize];
                    let clbit = &self.circuit.clbits()[c.0 as usize];
                    let line = format!("{clbit} = measure {qubit};");
                    self.writeln(&line);
                }
            }
            InstructionKind::Reset => {
                let operands = self.qubit_list(instruction);
                self.writeln(&format!("reset {operands};"));
            }
            InstructionKind::Barrier => {
                let operands = self.qubit_list(instruction);
                if operands.is_empty() {
                    self.writeln("barrier;");
                } else {
                    self.writeln(&format!("barrier {operands};"));
                }
            }
        }
    }

    fn qubit_list(&self, instruction: &Instruction) -> String {
        instruction
            .qubits
            .iter()
            .map(|q| self.circuit.qubits()[q.0 as usize].to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn check_identifier(name: &str) -> EmitResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EmitError::InvalidIdentifier(name.to_string()))
    }
}

/// Shortest round-trip decimal form of an angle.
fn format_angle(theta: f64) -> String {
    format!("{theta:?}")
}
