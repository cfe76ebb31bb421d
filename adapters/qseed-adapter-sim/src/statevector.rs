//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use qseed_ir::StandardGate;

/// A statevector over `num_qubits` qubits.
///
/// Basis index bit `k` holds qubit `k`.
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Apply a standard gate to `qubits`.
    pub fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match *gate {
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_phase(qubits[0], PI),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::SX => self.apply_sx(qubits[0]),
            StandardGate::Rx(theta) => self.apply_rx(qubits[0], theta),
            StandardGate::Ry(theta) => self.apply_ry(qubits[0], theta),
            StandardGate::Rz(theta) => self.apply_rz(qubits[0], theta),
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_cz(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
        }
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply the 2x2 matrix `[[m00, m01], [m10, m11]]` to `qubit`.
    fn apply_matrix(&mut self, qubit: usize, m: [Complex64; 4]) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0] * a + m[1] * b;
                self.amplitudes[j] = m[2] * a + m[3] * b;
            }
        }
    }

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let zero = Complex64::new(0.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        self.apply_matrix(qubit, [zero, -i, i, zero]);
    }

    fn apply_h(&mut self, qubit: usize) {
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        self.apply_matrix(qubit, [h, h, h, -h]);
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = Complex64::new(0.0, -(theta / 2.0).sin());
        self.apply_matrix(qubit, [c, s, s, c]);
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = Complex64::new((theta / 2.0).sin(), 0.0);
        self.apply_matrix(qubit, [c, -s, s, c]);
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp *= if i & mask == 0 { phase_0 } else { phase_1 };
        }
    }

    fn apply_sx(&mut self, qubit: usize) {
        let p = Complex64::new(0.5, 0.5);
        let m = Complex64::new(0.5, -0.5);
        self.apply_matrix(qubit, [p, m, m, p]);
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let mask = (1 << control) | (1 << target);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask == mask {
                *amp = -*amp;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Probability that `qubit` reads 1.
    fn prob_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure `qubit`, collapsing the state. Returns the observed bit.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p1 = self.prob_one(qubit);
        let r: f64 = rng.r#gen();
        let outcome = r < p1;

        let mask = 1 << qubit;
        let norm = if outcome { p1 } else { 1.0 - p1 }.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if ((i & mask) != 0) == outcome {
                if norm > 0.0 {
                    *amp /= norm;
                }
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        outcome
    }

    /// Reset `qubit` to |0⟩ by measuring and flipping on 1.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) {
            self.apply_x(qubit);
        }
    }

    /// Sample a full basis state without collapsing.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r: f64 = rng.r#gen();

        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }

        // Rounding can leave the cumulative sum a hair under 1.
        self.amplitudes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert_eq!(sv.num_qubits(), 2);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        for amp in &sv.amplitudes[1..] {
            assert!(approx_eq(*amp, Complex64::new(0.0, 0.0)));
        }
    }

    #[test]
    fn test_hadamard() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::H, &[0]);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::H, &[0]);
        sv.apply_gate(&StandardGate::CX, &[0, 1]);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_sx_squared_is_x() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::SX, &[0]);
        sv.apply_gate(&StandardGate::SX, &[0]);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_rx_pi_flips() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::Rx(PI), &[0]);
        assert!((sv.prob_one(0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_swap_moves_excitation() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::X, &[0]);
        sv.apply_gate(&StandardGate::Swap, &[0, 1]);
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_measure_collapses_partner() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut sv = Statevector::new(2);
            sv.apply_gate(&StandardGate::H, &[0]);
            sv.apply_gate(&StandardGate::CX, &[0, 1]);
            let first = sv.measure(0, &mut rng);
            let second = sv.measure(1, &mut rng);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::H, &[0]);
        sv.reset(0, &mut rng);
        assert!(sv.prob_one(0) < 1e-10);
    }

    #[test]
    fn test_sample_deterministic() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::X, &[0]);

        for _ in 0..100 {
            assert_eq!(sv.sample(&mut rng), 1);
        }
    }
}
