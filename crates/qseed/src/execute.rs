//! Running the seed circuit and summarizing its counts.

use serde::Serialize;
use tracing::{debug, info, warn};

use qseed_hal::{Backend, Counts, ExecutionResult};
use qseed_ir::Circuit;

use crate::config::{SeedConfig, WaitSettings};
use crate::error::{SeedError, SeedResult};
use crate::select::{FallbackReason, SelectedBackend};

/// Outcome of one execution.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    /// Name of the backend that produced `counts`.
    pub backend: String,
    pub counts: Counts,
    /// Highest-count bitstring.
    pub most_probable: String,
    /// Percentage of shots that measured `most_probable`.
    pub probability: f64,
    /// Position in the backend queue at submission, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(skip)]
    pub result: ExecutionResult,
}

/// Submit `circuit`, wait for it, and summarize the histogram.
///
/// The queue is re-read from the backend just before submission;
/// `queue_depth` is the last known value, used when that read fails.
pub async fn execute_circuit(
    backend: &dyn Backend,
    circuit: &Circuit,
    shots: u32,
    queue_depth: Option<u32>,
    wait: &WaitSettings,
) -> SeedResult<Execution> {
    let pending = match backend.availability().await {
        Ok(availability) => availability.queue_depth.or(queue_depth),
        Err(e) => {
            debug!("could not refresh queue of {}: {e}", backend.name());
            queue_depth
        }
    };
    let queue_position = pending.map(|p| p.saturating_add(1));
    match queue_position {
        Some(position) => info!("queue position on {}: {position}", backend.name()),
        None => info!("queue position on {}: unknown", backend.name()),
    }

    let job_id = backend.submit(circuit, shots).await?;
    info!(job = %job_id, shots, "submitted to {}", backend.name());

    let result = backend
        .wait_with(&job_id, wait.poll_interval(), wait.timeout())
        .await?;

    let (most_probable, count) = result
        .counts
        .most_frequent()
        .map(|(bits, count)| (bits.to_string(), count))
        .ok_or(SeedError::EmptyCounts)?;
    let probability = percentage(count, shots);
    info!("most probable outcome {most_probable} ({probability:.2}%)");

    Ok(Execution {
        backend: backend.name().to_string(),
        counts: result.counts.clone(),
        most_probable,
        probability,
        queue_position,
        result,
    })
}

fn percentage(count: u64, shots: u32) -> f64 {
    if shots == 0 {
        return 0.0;
    }
    100.0 * count as f64 / f64::from(shots)
}

/// Run on `selected`; if a remote device fails, run once more on the
/// local simulator.
///
/// Returns the execution together with the backend that actually ran it.
pub async fn execute_with_fallback(
    selected: SelectedBackend,
    circuit: &Circuit,
    config: &SeedConfig,
) -> SeedResult<(Execution, SelectedBackend)> {
    let attempt = execute_circuit(
        selected.backend.as_ref(),
        circuit,
        config.shots,
        selected.queue_depth(),
        &config.wait,
    )
    .await;

    match attempt {
        Ok(execution) => Ok((execution, selected)),
        Err(e) if !selected.is_simulated() => {
            warn!("{} failed, falling back to simulator: {e}", selected.name());
            let fallback =
                SelectedBackend::simulator(config, FallbackReason::DeviceFailed(e.to_string()));
            let execution = execute_circuit(
                fallback.backend.as_ref(),
                circuit,
                config.shots,
                fallback.queue_depth(),
                &config.wait,
            )
            .await?;
            Ok((execution, fallback))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qseed_adapter_sim::SimulatorBackend;
    use qseed_hal::{
        BackendAvailability, Capabilities, HalError, HalResult, JobId, JobStatus, ValidationResult,
    };

    use crate::entangle::seed_circuit;
    use crate::select::{BackendChoice, DeviceStatus};

    /// A device that accepts jobs and then reports them failed.
    struct BrokenDevice {
        caps: Capabilities,
    }

    impl BrokenDevice {
        fn new() -> Self {
            Self {
                caps: Capabilities::ibm("ibm_broken", 127),
            }
        }
    }

    #[async_trait]
    impl Backend for BrokenDevice {
        fn name(&self) -> &str {
            "ibm_broken"
        }

        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }

        async fn availability(&self) -> HalResult<BackendAvailability> {
            Ok(BackendAvailability::queued(4))
        }

        async fn validate(&self, _circuit: &Circuit) -> HalResult<ValidationResult> {
            Ok(ValidationResult::Valid)
        }

        async fn submit(&self, _circuit: &Circuit, _shots: u32) -> HalResult<JobId> {
            Ok(JobId::new("doomed"))
        }

        async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
            Ok(JobStatus::Failed("calibration in progress".into()))
        }

        async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
            Err(HalError::JobNotFound(job_id.to_string()))
        }

        async fn cancel(&self, _job_id: &JobId) -> HalResult<()> {
            Ok(())
        }
    }

    /// The simulator behind a queue that is longer than selection saw.
    struct BusyDevice {
        inner: SimulatorBackend,
        availability: Option<u32>,
    }

    #[async_trait]
    impl Backend for BusyDevice {
        fn name(&self) -> &str {
            "ibm_busy"
        }

        fn capabilities(&self) -> &Capabilities {
            self.inner.capabilities()
        }

        async fn availability(&self) -> HalResult<BackendAvailability> {
            match self.availability {
                Some(pending) => Ok(BackendAvailability::queued(pending)),
                None => Err(HalError::BackendUnavailable("status endpoint down".into())),
            }
        }

        async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
            self.inner.validate(circuit).await
        }

        async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
            self.inner.submit(circuit, shots).await
        }

        async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
            self.inner.status(job_id).await
        }

        async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
            self.inner.result(job_id).await
        }

        async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
            self.inner.cancel(job_id).await
        }
    }

    fn quick_config() -> SeedConfig {
        let mut config = SeedConfig::default();
        config.qubits = 3;
        config.shots = 200;
        config.simulator.seed = Some(7);
        config.wait.poll_interval_ms = 1;
        config
    }

    #[tokio::test]
    async fn test_execute_on_simulator() {
        let backend = SimulatorBackend::new().with_seed(11);
        let circuit = seed_circuit(3, 3).unwrap().circuit;
        let execution = execute_circuit(&backend, &circuit, 300, Some(0), &WaitSettings::default())
            .await
            .unwrap();

        assert_eq!(execution.backend, "simulator");
        assert_eq!(execution.counts.total_shots(), 300);
        assert!(execution.counts.iter().all(|(bits, _)| bits.len() == 3));

        let top = execution.counts.get(&execution.most_probable).unwrap();
        assert!(execution.counts.iter().all(|(_, c)| c <= top));
        let expected = 100.0 * top as f64 / 300.0;
        assert!((execution.probability - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_queue_position_is_read_at_submission() {
        let circuit = seed_circuit(2, 2).unwrap().circuit;
        let wait = WaitSettings::default();

        let busy = BusyDevice {
            inner: SimulatorBackend::new().with_seed(1),
            availability: Some(40),
        };
        let execution = execute_circuit(&busy, &circuit, 16, Some(3), &wait)
            .await
            .unwrap();
        assert_eq!(execution.queue_position, Some(41));

        let unreachable = BusyDevice {
            inner: SimulatorBackend::new().with_seed(1),
            availability: None,
        };
        let execution = execute_circuit(&unreachable, &circuit, 16, Some(3), &wait)
            .await
            .unwrap();
        assert_eq!(execution.queue_position, Some(4));
    }

    #[tokio::test]
    async fn test_execute_surfaces_job_failure() {
        let circuit = seed_circuit(2, 2).unwrap().circuit;
        let err = execute_circuit(
            &BrokenDevice::new(),
            &circuit,
            10,
            Some(4),
            &WaitSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SeedError::Backend(HalError::JobFailed(_))));
    }

    #[tokio::test]
    async fn test_device_failure_falls_back_once() {
        let config = quick_config();
        let circuit = seed_circuit(3, 3).unwrap().circuit;
        let selected = SelectedBackend {
            backend: Box::new(BrokenDevice::new()),
            choice: BackendChoice::Device(DeviceStatus {
                name: "ibm_broken".into(),
                num_qubits: 127,
                pending_jobs: Some(4),
                operational: true,
                simulator: false,
            }),
        };

        let (execution, ran_on) = execute_with_fallback(selected, &circuit, &config)
            .await
            .unwrap();
        assert_eq!(execution.backend, "simulator");
        assert!(ran_on.is_simulated());
        assert!(matches!(
            ran_on.fallback(),
            Some(FallbackReason::DeviceFailed(msg)) if msg.contains("calibration")
        ));
    }

    #[tokio::test]
    async fn test_simulator_failure_is_not_retried() {
        let mut config = quick_config();
        config.qubits = 25;
        let circuit = seed_circuit(25, 25).unwrap().circuit;
        let selected = SelectedBackend::simulator(&config, FallbackReason::NoToken);

        let err = execute_with_fallback(selected, &circuit, &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SeedError::Backend(HalError::CircuitTooLarge(_))
        ));
    }

    #[test]
    fn test_percentage() {
        assert!((percentage(128, 512) - 25.0).abs() < 1e-12);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
