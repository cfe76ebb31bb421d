//! Simulator backend implementation.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

use qseed_hal::{
    Backend, BackendAvailability, Capabilities, Counts,
    ExecutionResult, HalError, HalResult, Job, JobId, JobStatus, ValidationResult,
};
use qseed_ir::{Circuit, InstructionKind};

use crate::statevector::Statevector;

/// Default qubit limit (2^20 amplitudes, 16 MiB).
pub const DEFAULT_MAX_QUBITS: u32 = 20;

struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

/// Local statevector simulator.
///
/// Jobs run to completion inside `submit()`, so `status()` reports
/// `Completed` immediately afterwards.
pub struct SimulatorBackend {
    capabilities: Capabilities,
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
    rng: Mutex<StdRng>,
}

impl SimulatorBackend {
    /// Create a simulator with default settings and an OS-seeded RNG.
    pub fn new() -> Self {
        Self::build(DEFAULT_MAX_QUBITS, StdRng::from_entropy())
    }

    /// Create a simulator with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self::build(max_qubits, StdRng::from_entropy())
    }

    /// Use a fixed RNG seed so repeated runs sample identically.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    fn build(max_qubits: u32, rng: StdRng) -> Self {
        Self {
            capabilities: Capabilities::simulator(max_qubits),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            rng: Mutex::new(rng),
        }
    }

    fn max_qubits(&self) -> u32 {
        self.capabilities.num_qubits
    }

    /// Run `shots` repetitions of `circuit`.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    fn run_simulation(&self, circuit: &Circuit, shots: u32) -> ExecutionResult {
        let start = Instant::now();
        let plan = MeasurementPlan::new(circuit);
        debug!(
            qubits = circuit.num_qubits(),
            shots,
            terminal = plan.terminal,
            "starting simulation"
        );

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut counts = Counts::new();

        if plan.terminal {
            // Measurements only at the end: evolve once and sample the final state.
            let mut sv = Statevector::new(circuit.num_qubits());
            for inst in circuit.instructions() {
                if let InstructionKind::Gate(gate) = &inst.kind {
                    sv.apply_gate(&gate.kind, &qubit_indices(&inst.qubits));
                }
            }
            for _ in 0..shots {
                let outcome = sv.sample(&mut *rng);
                let mut bits = vec![false; plan.width];
                for &(q, c) in &plan.pairs {
                    bits[c] = (outcome >> q) & 1 == 1;
                }
                counts.insert(to_bitstring(&bits), 1);
            }
        } else {
            for _ in 0..shots {
                let mut sv = Statevector::new(circuit.num_qubits());
                let mut bits = vec![false; plan.width];
                for inst in circuit.instructions() {
                    let qubits = qubit_indices(&inst.qubits);
                    match &inst.kind {
                        InstructionKind::Gate(gate) => sv.apply_gate(&gate.kind, &qubits),
                        InstructionKind::Reset => sv.reset(qubits[0], &mut *rng),
                        InstructionKind::Measure => {
                            for (q, c) in qubits.iter().zip(&inst.clbits) {
                                bits[c.0 as usize] = sv.measure(*q, &mut *rng);
                            }
                        }
                        InstructionKind::Barrier => {}
                    }
                }
                counts.insert(to_bitstring(&bits), 1);
            }
        }

        let elapsed = start.elapsed();
        debug!(?elapsed, distinct = counts.len(), "simulation completed");

        ExecutionResult::new(counts, shots).with_execution_time(elapsed.as_millis() as u64)
    }

    fn with_jobs<T>(&self, f: impl FnOnce(&mut FxHashMap<String, SimJob>) -> T) -> T {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut jobs)
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// How measured qubits map onto the result bitstring.
struct MeasurementPlan {
    /// `(qubit, clbit)` pairs in program order.
    pairs: Vec<(usize, usize)>,
    /// Bitstring width.
    width: usize,
    /// Every measurement comes after the last gate or reset on its qubit.
    terminal: bool,
}

impl MeasurementPlan {
    fn new(circuit: &Circuit) -> Self {
        let mut pairs = Vec::new();
        let mut measured = vec![false; circuit.num_qubits()];
        let mut terminal = true;

        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Measure => {
                    for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                        measured[q.0 as usize] = true;
                        pairs.push((q.0 as usize, c.0 as usize));
                    }
                }
                InstructionKind::Reset => terminal = false,
                InstructionKind::Gate(_) => {
                    if inst.qubits.iter().any(|q| measured[q.0 as usize]) {
                        terminal = false;
                    }
                }
                InstructionKind::Barrier => {}
            }
        }

        if pairs.is_empty() {
            // Unmeasured circuits report every qubit.
            let n = circuit.num_qubits();
            return Self {
                pairs: (0..n).map(|q| (q, q)).collect(),
                width: n,
                terminal,
            };
        }

        Self {
            pairs,
            width: circuit.num_clbits(),
            terminal,
        }
    }
}

fn qubit_indices(qubits: &[qseed_ir::QubitId]) -> Vec<usize> {
    qubits.iter().map(|q| q.0 as usize).collect()
}

/// Render classical bits with bit 0 rightmost.
fn to_bitstring(bits: &[bool]) -> String {
    bits.iter()
        .rev()
        .map(|&b| if b { '1' } else { '0' })
        .collect()
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let mut reasons = Vec::new();
        if circuit.num_qubits() > self.max_qubits() as usize {
            reasons.push(format!(
                "circuit has {} qubits but simulator supports {}",
                circuit.num_qubits(),
                self.max_qubits()
            ));
        }
        for inst in circuit.instructions() {
            if let Some(gate) = inst.as_gate() {
                if !self.capabilities.gate_set.contains(gate.name()) {
                    reasons.push(format!("unsupported gate '{}'", gate.name()));
                }
            }
        }

        if reasons.is_empty() {
            Ok(ValidationResult::Valid)
        } else {
            Ok(ValidationResult::Invalid { reasons })
        }
    }

    #[instrument(skip(self, circuit))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        if circuit.num_qubits() > self.max_qubits() as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                circuit.num_qubits(),
                self.max_qubits()
            )));
        }
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} (allowed 1..={})",
                self.capabilities.max_shots
            )));
        }

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let job = Job::new(job_id.clone(), shots).with_backend(self.name());
        self.with_jobs(|jobs| {
            jobs.insert(job_id.0.clone(), SimJob { job, result: None });
        });
        debug!("Submitted job: {}", job_id);

        let result = self.run_simulation(circuit, shots);

        self.with_jobs(|jobs| {
            if let Some(sim_job) = jobs.get_mut(&job_id.0) {
                sim_job.result = Some(result);
                sim_job.job.transition(JobStatus::Completed);
            }
        });

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        self.with_jobs(|jobs| {
            jobs.get(&job_id.0)
                .map(|j| j.job.status.clone())
                .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
        })
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        self.with_jobs(|jobs| {
            let sim_job = jobs
                .get(&job_id.0)
                .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
            match (&sim_job.job.status, &sim_job.result) {
                (JobStatus::Cancelled, _) => Err(HalError::JobCancelled),
                (_, Some(result)) => Ok(result.clone()),
                (_, None) => Err(HalError::JobNotFound(job_id.0.clone())),
            }
        })
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.with_jobs(|jobs| match jobs.get_mut(&job_id.0) {
            Some(sim_job) => {
                sim_job.job.transition(JobStatus::Cancelled);
                Ok(())
            }
            None => Err(HalError::JobNotFound(job_id.0.clone())),
        })
    }
}
