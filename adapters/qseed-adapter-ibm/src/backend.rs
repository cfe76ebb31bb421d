//! IBM Quantum backend implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use async_trait::async_trait;
use qseed_hal::{
    Backend, BackendAvailability, Capabilities, Counts,
    ExecutionResult, HalError, HalResult, JobId, JobStatus, ValidationResult,
};
use qseed_ir::Circuit;
use qseed_qasm3::emit;

use crate::api::{BackendInfo, IbmClient, JobResultResponse};
use crate::error::{IbmError, IbmResult};

/// How long cached backend info stays fresh.
const BACKEND_INFO_TTL: Duration = Duration::from_secs(60);

/// Classical registers of a submitted circuit as `(name, size)`, in
/// declaration order.
type RegisterLayout = Vec<(String, usize)>;

/// A single IBM Quantum device.
pub struct IbmBackend {
    client: Arc<IbmClient>,
    target: String,
    capabilities: Capabilities,
    backend_info: RwLock<Option<(BackendInfo, Instant)>>,
    /// Register layouts of submitted jobs, for decoding results.
    layouts: RwLock<HashMap<String, RegisterLayout>>,
}

impl IbmBackend {
    /// Wrap an already fetched device description.
    pub fn new(client: Arc<IbmClient>, info: BackendInfo) -> Self {
        let capabilities = capabilities_for(&info);
        Self {
            client,
            target: info.name.clone(),
            capabilities,
            backend_info: RwLock::new(Some((info, Instant::now()))),
            layouts: RwLock::new(HashMap::new()),
        }
    }

    /// Look up `target` and wrap it.
    pub async fn connect(client: Arc<IbmClient>, target: &str) -> IbmResult<Self> {
        let info = client.get_backend(target).await?;
        Ok(Self::new(client, info))
    }

    /// Get the target device name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Backend information, refreshed when older than the cache TTL.
    async fn get_backend_info(&self) -> IbmResult<BackendInfo> {
        {
            let cached = self.backend_info.read().await;
            if let Some((ref info, fetched_at)) = *cached {
                if fetched_at.elapsed() < BACKEND_INFO_TTL {
                    return Ok(info.clone());
                }
            }
        }

        let info = self.client.get_backend(&self.target).await?;
        *self.backend_info.write().await = Some((info.clone(), Instant::now()));
        Ok(info)
    }

    fn circuit_to_qasm(circuit: &Circuit) -> IbmResult<String> {
        emit(circuit).map_err(|e| IbmError::CircuitError(e.to_string()))
    }
}

fn capabilities_for(info: &BackendInfo) -> Capabilities {
    let mut caps = Capabilities::ibm(&info.name, info.num_qubits as u32).with_simulator(info.simulator);
    if let Some(max_shots) = info.max_shots {
        caps = caps.with_max_shots(max_shots);
    }
    caps
}

fn register_layout(circuit: &Circuit) -> RegisterLayout {
    circuit
        .cregs()
        .iter()
        .map(|r| (r.name.clone(), r.len()))
        .collect()
}

/// Convert Sampler results to counts.
///
/// Bitstrings put classical bit 0 rightmost. With a known register layout,
/// V2 samples from several registers are joined per shot, last register
/// leftmost.
fn results_to_counts(results: &JobResultResponse, layout: Option<&RegisterLayout>) -> Counts {
    let mut counts = Counts::new();
    let Some(result) = results.results.first() else {
        return counts;
    };
    let total_width: usize = layout.map_or(0, |l| l.iter().map(|(_, n)| n).sum());

    if let Some(data) = &result.data {
        let complete = layout.filter(|l| l.iter().all(|(name, _)| data.contains_key(name)));
        if let Some(layout) = complete {
            let shots = layout
                .iter()
                .map(|(name, _)| data[name].samples.len())
                .min()
                .unwrap_or(0);
            for shot in 0..shots {
                let bitstring: String = layout
                    .iter()
                    .rev()
                    .map(|(name, size)| hex_to_binary(&data[name].samples[shot], *size))
                    .collect();
                counts.insert(bitstring, 1);
            }
        } else {
            for register_data in data.values() {
                let width = infer_bit_width(&register_data.samples);
                for sample in &register_data.samples {
                    counts.insert(hex_to_binary(sample, width), 1);
                }
            }
        }
        return counts;
    }

    // V1 pre-aggregated counts are exact; quasi-distributions are scaled.
    if let Some(raw_counts) = &result.counts {
        for (bitstring, &count) in raw_counts {
            counts.insert(hex_to_binary(bitstring, total_width), count);
        }
    } else if let Some(dist) = result.quasi_dists.as_ref().and_then(|d| d.first()) {
        let shots = result
            .metadata
            .as_ref()
            .and_then(|m| m.get("shots"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1024) as f64;
        for (bitstring, &prob) in dist {
            let count = (prob * shots).max(0.0).round() as u64;
            if count > 0 {
                counts.insert(hex_to_binary(bitstring, total_width), count);
            }
        }
    }

    counts
}

/// Bit width needed for the largest hex sample (at least 1).
fn infer_bit_width(samples: &[String]) -> usize {
    let max_val = samples
        .iter()
        .filter_map(|s| u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok())
        .max()
        .unwrap_or(0);

    if max_val == 0 {
        1
    } else {
        64 - max_val.leading_zeros() as usize
    }
}

/// Convert a hex string to binary padded to `width` bits.
///
/// A `width` of 0 pads to four bits per hex digit. Strings without a `0x`
/// prefix that are not valid hex pass through unchanged.
fn hex_to_binary(hex: &str, width: usize) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    match u64::from_str_radix(digits, 16) {
        Ok(value) => {
            let width = if width > 0 { width } else { digits.len() * 4 };
            format!("{value:0>width$b}")
        }
        Err(_) => hex.to_string(),
    }
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.get_backend_info().await {
            Ok(info) if info.status.operational => Ok(BackendAvailability {
                is_available: true,
                queue_depth: info.status.pending_jobs,
                estimated_wait: None,
                status_message: info.status.status_msg,
            }),
            Ok(info) => Ok(BackendAvailability::unavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            )),
            Err(e) => {
                tracing::warn!("IBM backend availability check failed: {e}");
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let caps = self.capabilities();
        let mut reasons = Vec::new();

        if circuit.num_qubits() > caps.num_qubits as usize {
            reasons.push(format!(
                "Circuit requires {} qubits but backend only has {}",
                circuit.num_qubits(),
                caps.num_qubits
            ));
        }

        for inst in circuit.instructions() {
            if let Some(gate) = inst.as_gate() {
                if !caps.gate_set.contains(gate.name()) {
                    reasons.push(format!("Unsupported gate: {}", gate.name()));
                    break;
                }
            }
        }

        if reasons.is_empty() {
            Ok(ValidationResult::Valid)
        } else {
            Ok(ValidationResult::Invalid { reasons })
        }
    }

    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        let info = self.get_backend_info().await?;

        if circuit.num_qubits() > info.num_qubits {
            return Err(IbmError::TooManyQubits {
                required: circuit.num_qubits(),
                available: info.num_qubits,
            }
            .into());
        }
        if !info.status.operational {
            return Err(HalError::BackendUnavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "Backend offline".to_string()),
            ));
        }
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} (allowed 1..={})",
                self.capabilities.max_shots
            )));
        }

        let qasm = Self::circuit_to_qasm(circuit)?;
        let response = self
            .client
            .submit_sampler_job(&self.target, vec![qasm], shots)
            .await
            .map_err(|e| HalError::SubmissionFailed(e.to_string()))?;

        tracing::info!(job = %response.id, backend = %self.target, "submitted IBM job");
        self.layouts
            .write()
            .await
            .insert(response.id.clone(), register_layout(circuit));

        Ok(JobId(response.id))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let status = self.client.get_job_status(&job_id.0).await?;

        let job_status = match status.status.to_uppercase().as_str() {
            "QUEUED" => JobStatus::Queued,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" | "ERROR" => JobStatus::Failed(
                status
                    .error_message()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            "CANCELLED" => JobStatus::Cancelled,
            // VALIDATING, RUNNING and anything new
            _ => JobStatus::Running,
        };

        Ok(job_status)
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let status = self.client.get_job_status(&job_id.0).await?;

        if !status.is_completed() {
            if status.is_failed() {
                return Err(HalError::JobFailed(
                    status
                        .error_message()
                        .unwrap_or_else(|| "Job failed".to_string()),
                ));
            }
            if status.is_cancelled() {
                return Err(HalError::JobCancelled);
            }
            return Err(HalError::Backend(format!(
                "Job {} not yet completed",
                job_id.0
            )));
        }

        let results = self.client.get_job_results(&job_id.0).await?;
        let layout = self.layouts.read().await.get(&job_id.0).cloned();

        let counts = results_to_counts(&results, layout.as_ref());
        let total_shots = u32::try_from(counts.total_shots()).unwrap_or(u32::MAX);

        Ok(ExecutionResult::new(counts, total_shots)
            .with_metadata("backend", serde_json::json!(self.target)))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(&job_id.0).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BackendStatus, ClassicalRegisterData, SamplerResult};

    fn v2_results(data: &[(&str, &[&str])]) -> JobResultResponse {
        let data = data
            .iter()
            .map(|(name, samples)| {
                (
                    name.to_string(),
                    ClassicalRegisterData {
                        samples: samples.iter().map(|s| s.to_string()).collect(),
                    },
                )
            })
            .collect();
        JobResultResponse {
            id: None,
            results: vec![SamplerResult {
                data: Some(data),
                quasi_dists: None,
                counts: None,
                metadata: None,
            }],
        }
    }

    fn device(name: &str, qubits: usize) -> BackendInfo {
        BackendInfo {
            name: name.into(),
            num_qubits: qubits,
            status: BackendStatus {
                operational: true,
                status_msg: None,
                pending_jobs: Some(4),
            },
            processor_type: None,
            basis_gates: vec![],
            simulator: false,
            max_shots: Some(8192),
        }
    }

    #[test]
    fn test_hex_to_binary() {
        assert_eq!(hex_to_binary("0x0", 0), "0000");
        assert_eq!(hex_to_binary("0x3", 0), "0011");
        assert_eq!(hex_to_binary("0xff", 0), "11111111");
        assert_eq!(hex_to_binary("0x1", 5), "00001");
        assert_eq!(hex_to_binary("0x3", 8), "00000011");
    }

    #[test]
    fn test_infer_bit_width() {
        assert_eq!(infer_bit_width(&["0x0".into(), "0x3".into()]), 2);
        assert_eq!(infer_bit_width(&["0x7".into()]), 3);
        assert_eq!(infer_bit_width(&["0x0".into(), "0x0".into()]), 1);
    }

    #[test]
    fn test_v2_samples_with_layout_keep_width() {
        let results = v2_results(&[("c", &["0x0", "0x1", "0x0", "0x5"])]);
        let layout = vec![("c".to_string(), 4)];

        let counts = results_to_counts(&results, Some(&layout));
        assert_eq!(counts.get("0000"), Some(2));
        assert_eq!(counts.get("0001"), Some(1));
        assert_eq!(counts.get("0101"), Some(1));
    }

    #[test]
    fn test_v2_samples_join_registers() {
        let results = v2_results(&[("a", &["0x1", "0x0"]), ("b", &["0x2", "0x2"])]);
        let layout = vec![("a".to_string(), 1), ("b".to_string(), 2)];

        let counts = results_to_counts(&results, Some(&layout));
        assert_eq!(counts.get("101"), Some(1));
        assert_eq!(counts.get("100"), Some(1));
    }

    #[test]
    fn test_v2_samples_without_layout_infer_width() {
        let results = v2_results(&[("c", &["0x0", "0x3", "0x0"])]);
        let counts = results_to_counts(&results, None);
        assert_eq!(counts.get("00"), Some(2));
        assert_eq!(counts.get("11"), Some(1));
    }

    #[test]
    fn test_v1_counts_and_quasi_dists() {
        let results = JobResultResponse {
            id: Some("test".into()),
            results: vec![SamplerResult {
                data: None,
                quasi_dists: None,
                counts: Some([("0x0".to_string(), 500), ("0x3".to_string(), 500)].into()),
                metadata: None,
            }],
        };
        let layout = vec![("c".to_string(), 2)];
        let counts = results_to_counts(&results, Some(&layout));
        assert_eq!(counts.get("00"), Some(500));
        assert_eq!(counts.get("11"), Some(500));

        let results = JobResultResponse {
            id: None,
            results: vec![SamplerResult {
                data: None,
                quasi_dists: Some(vec![[("0x1".to_string(), 0.25), ("0x2".to_string(), 0.75)].into()]),
                counts: None,
                metadata: Some(serde_json::json!({"shots": 100})),
            }],
        };
        let counts = results_to_counts(&results, Some(&layout));
        assert_eq!(counts.get("01"), Some(25));
        assert_eq!(counts.get("10"), Some(75));
    }

    #[test]
    fn test_empty_results() {
        let results = JobResultResponse {
            id: None,
            results: vec![],
        };
        assert!(results_to_counts(&results, None).is_empty());
    }

    #[test]
    fn test_v2_results_deserialization() {
        let json = r#"{
            "results": [{
                "data": {"c": {"samples": ["0x0", "0x3", "0x0", "0x3"]}},
                "metadata": {"version": 2, "execution": {"execution_spans": []}}
            }]
        }"#;
        let response: JobResultResponse = serde_json::from_str(json).unwrap();
        let counts = results_to_counts(&response, Some(&vec![("c".to_string(), 2)]));
        assert_eq!(counts.total_shots(), 4);
        assert_eq!(counts.get("11"), Some(2));
    }

    #[test]
    fn test_backend_from_info() {
        let client = Arc::new(IbmClient::new("https://example.com", "token").unwrap());
        let backend = IbmBackend::new(client, device("ibm_kyiv", 127));
        assert_eq!(backend.name(), "ibm_kyiv");
        assert_eq!(backend.capabilities().num_qubits, 127);
        assert_eq!(backend.capabilities().max_shots, 8192);
        assert!(!backend.capabilities().is_simulator);
    }

    #[tokio::test]
    async fn test_availability_reports_queue_depth() {
        let client = Arc::new(IbmClient::new("https://example.com", "token").unwrap());
        let backend = IbmBackend::new(client, device("ibm_kyiv", 127));
        let avail = backend.availability().await.unwrap();
        assert!(avail.is_available);
        assert_eq!(avail.queue_depth, Some(4));
    }

    #[tokio::test]
    async fn test_validate_rejects_oversized_circuit() {
        let client = Arc::new(IbmClient::new("https://example.com", "token").unwrap());
        let backend = IbmBackend::new(client, device("tiny", 2));
        let circuit = Circuit::ghz(3).unwrap();
        assert!(!backend.validate(&circuit).await.unwrap().is_valid());
        assert!(backend.validate(&Circuit::bell().unwrap()).await.unwrap().is_valid());
    }
}
