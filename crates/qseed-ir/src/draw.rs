//! ASCII circuit drawing.
//!
//! Renders one row per qubit followed by one row per classical register.
//! Instructions are packed into columns the same way [`Circuit::depth`]
//! layers them, except that a multi-qubit gate also reserves every row it
//! crosses so the connector stays visible.
//!
//! ```text
//! q[0]: --[H]---*-------[M]--
//!               |        |
//! q[1]: --[H]--(+)--*---[M]--
//!                   |    |
//! q[2]: --[H]------(+)--[M]--
//!  c: 3/====================
//! ```

use crate::circuit::Circuit;
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};

/// One rendered column: a cell per qubit row, `None` meaning an idle wire.
struct Column {
    cells: Vec<Option<String>>,
    /// Rows that carry a vertical connector below them.
    links: Vec<bool>,
}

impl Column {
    fn new(rows: usize) -> Self {
        Self {
            cells: vec![None; rows],
            links: vec![false; rows],
        }
    }

    fn width(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(|c| c.chars().count())
            .max()
            .unwrap_or(1)
    }
}

/// Render `circuit` as ASCII art.
pub fn draw(circuit: &Circuit) -> String {
    let rows = circuit.num_qubits();
    if rows == 0 {
        return String::new();
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut front = vec![0usize; rows];

    for inst in circuit.instructions() {
        if inst.qubits.is_empty() {
            continue;
        }
        let lo = inst.qubits.iter().map(|q| q.0 as usize).min().unwrap_or(0);
        let hi = inst.qubits.iter().map(|q| q.0 as usize).max().unwrap_or(0);
        let spans = !inst.is_measure() && !inst.is_barrier() && hi > lo;

        let slot = if inst.is_measure() || inst.is_barrier() {
            inst.qubits.iter().map(|q| front[q.0 as usize]).max().unwrap_or(0)
        } else {
            front[lo..=hi].iter().copied().max().unwrap_or(0)
        };
        while columns.len() <= slot {
            columns.push(Column::new(rows));
        }

        let column = &mut columns[slot];
        for (k, q) in inst.qubits.iter().enumerate() {
            column.cells[q.0 as usize] = Some(cell_for(inst, k));
        }
        if spans {
            for row in lo..hi {
                column.links[row] = true;
                if column.cells[row].is_none() {
                    column.cells[row] = Some("|".into());
                }
            }
            for slot_front in &mut front[lo..=hi] {
                *slot_front = slot + 1;
            }
        } else {
            for q in &inst.qubits {
                front[q.0 as usize] = slot + 1;
            }
        }
    }

    let labels: Vec<String> = circuit.qubits().iter().map(ToString::to_string).collect();
    let label_width = labels.iter().map(String::len).max().unwrap_or(0);

    let mut out = String::new();
    for (row, label) in labels.iter().enumerate() {
        out.push_str(&format!("{label:>label_width$}: --"));
        for column in &columns {
            let width = column.width();
            let text = column.cells[row].as_deref().unwrap_or("-");
            let pad = width - text.chars().count();
            let left = pad / 2;
            out.push_str(&"-".repeat(left));
            out.push_str(text);
            out.push_str(&"-".repeat(pad - left));
            out.push_str("--");
        }
        out.push('\n');

        if row + 1 < rows && columns.iter().any(|c| c.links[row]) {
            out.push_str(&" ".repeat(label_width + 4));
            for column in &columns {
                let width = column.width();
                if column.links[row] {
                    let left = width / 2;
                    out.push_str(&" ".repeat(left));
                    out.push('|');
                    out.push_str(&" ".repeat(width - left - 1));
                } else {
                    out.push_str(&" ".repeat(width));
                }
                out.push_str("  ");
            }
            out.truncate(out.trim_end_matches(' ').len());
            out.push('\n');
        }
    }

    let line_len = out
        .lines()
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);
    for creg in circuit.cregs() {
        let prefix = format!("{}: {}/", creg.name, creg.len());
        let prefix = format!("{prefix:>width$}", width = label_width + 3);
        let fill = line_len.saturating_sub(prefix.chars().count()).max(2);
        out.push_str(&prefix);
        out.push_str(&"=".repeat(fill));
        out.push('\n');
    }

    out
}

fn cell_for(inst: &Instruction, operand: usize) -> String {
    match &inst.kind {
        InstructionKind::Gate(gate) => match &gate.kind {
            StandardGate::CX => {
                if operand == 0 {
                    "*".into()
                } else {
                    "(+)".into()
                }
            }
            StandardGate::CZ => "*".into(),
            StandardGate::Swap => "x".into(),
            other => match other.angle() {
                Some(theta) => format!("[{}({theta:.2})]", capitalize(other.name())),
                None => format!("[{}]", other.name().to_uppercase()),
            },
        },
        InstructionKind::Measure => match inst.clbits.get(operand) {
            Some(c) => format!("[M:{}]", c.0),
            None => "[M]".into(),
        },
        InstructionKind::Reset => "|0>".into(),
        InstructionKind::Barrier => "#".into(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
