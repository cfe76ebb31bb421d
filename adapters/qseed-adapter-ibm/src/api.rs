//! IBM Quantum Platform REST client.
//!
//! Covers what seeding needs: authentication (legacy bearer token or IAM
//! API-key exchange), listing devices with their queue lengths, submitting a
//! Sampler job, polling it, fetching results and cancelling.
//!
//! Both the IBM Cloud API (`quantum.cloud.ibm.com/api`) and the legacy
//! endpoint (`api.quantum-computing.ibm.com`) are supported.

use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// Legacy IBM Quantum API endpoint.
pub const LEGACY_ENDPOINT: &str = "https://api.quantum-computing.ibm.com";

const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const IBM_API_VERSION: &str = "2026-02-01";

/// Cloudflare in front of the API rejects the default reqwest agent.
const USER_AGENT: &str = concat!("qseed/", env!("CARGO_PKG_VERSION"));

/// How to authenticate against IBM Quantum.
#[derive(Clone)]
pub enum IbmCredentials {
    /// Legacy bearer token, sent as-is.
    Token {
        token: String,
        /// Endpoint override; [`LEGACY_ENDPOINT`] when `None`.
        endpoint: Option<String>,
        /// Hub/group/project for job submission.
        instance: Option<String>,
    },
    /// IBM Cloud API key, exchanged for an IAM bearer token.
    ApiKey { api_key: String, service_crn: String },
}

impl fmt::Debug for IbmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token {
                endpoint, instance, ..
            } => f
                .debug_struct("Token")
                .field("token", &"[REDACTED]")
                .field("endpoint", endpoint)
                .field("instance", instance)
                .finish(),
            Self::ApiKey { service_crn, .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &"[REDACTED]")
                .field("service_crn", service_crn)
                .finish(),
        }
    }
}

/// IBM Quantum API client.
pub struct IbmClient {
    client: Client,
    endpoint: String,
    /// Hub/group/project, legacy mode only.
    instance: Option<String>,
    cloud_api: bool,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("instance", &self.instance)
            .field("cloud_api", &self.cloud_api)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
}

fn json_headers(token: &str) -> IbmResult<header::HeaderMap> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| IbmError::InvalidToken)?,
    );
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    Ok(headers)
}

fn build_client(headers: header::HeaderMap) -> IbmResult<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Turn a non-success response into an [`IbmError::ApiError`].
async fn api_error(response: Response, context: &str) -> IbmError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    let (code, message) = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(err) if !err.message.is_empty() => (err.code, err.message),
        _ => (None, body),
    };
    IbmError::ApiError {
        code,
        message: format!("{context} ({status}): {message}"),
    }
}

impl IbmClient {
    /// Create a client in legacy direct-token mode.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> IbmResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(IbmError::MissingToken);
        }
        let client = build_client(json_headers(&token)?)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            instance: None,
            cloud_api: false,
        })
    }

    /// Create a client for the IBM Cloud API.
    ///
    /// Exchanges the API key for an IAM bearer token and attaches the
    /// `Service-CRN` header every Cloud API request needs.
    pub async fn connect(api_key: &str, service_crn: &str) -> IbmResult<Self> {
        let iam_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let iam_response = iam_client
            .post(IAM_TOKEN_URL)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!(
                "grant_type=urn:ibm:params:oauth:grant-type:apikey&apikey={api_key}"
            ))
            .send()
            .await
            .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

        if !iam_response.status().is_success() {
            let status = iam_response.status();
            let body = iam_response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(IbmError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let iam_token: IamTokenResponse = iam_response.json().await.map_err(|e| {
            IbmError::IamTokenExchange(format!("failed to parse IAM response: {e}"))
        })?;

        let mut headers = json_headers(&iam_token.access_token)?;
        headers.insert(
            header::HeaderName::from_static("service-crn"),
            header::HeaderValue::from_str(service_crn)
                .map_err(|_| IbmError::InvalidParameter("invalid Service-CRN value".into()))?,
        );
        headers.insert(
            header::HeaderName::from_static("ibm-api-version"),
            header::HeaderValue::from_static(IBM_API_VERSION),
        );

        Ok(Self {
            client: build_client(headers)?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            instance: None,
            cloud_api: true,
        })
    }

    /// Create a client from either credential kind.
    pub async fn authenticate(credentials: &IbmCredentials) -> IbmResult<Self> {
        match credentials {
            IbmCredentials::Token {
                token,
                endpoint,
                instance,
            } => {
                let endpoint = endpoint.as_deref().unwrap_or(LEGACY_ENDPOINT);
                let mut client = Self::new(endpoint, token.as_str())?;
                if let Some(instance) = instance {
                    client = client.with_instance(instance.as_str());
                }
                Ok(client)
            }
            IbmCredentials::ApiKey {
                api_key,
                service_crn,
            } => {
                tracing::info!("connecting to IBM Cloud API (IAM key exchange)");
                Self::connect(api_key, service_crn).await
            }
        }
    }

    /// Set the instance (hub/group/project) for job submission (legacy mode).
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Whether this client uses the Cloud API.
    pub fn is_cloud_api(&self) -> bool {
        self.cloud_api
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// List backends, skipping any whose details cannot be fetched.
    pub async fn list_backends(&self) -> IbmResult<Vec<BackendInfo>> {
        let mut backends = Vec::new();
        for (name, info) in self.probe_backends().await? {
            match info {
                Ok(info) => backends.push(info),
                Err(e) => tracing::warn!("skipping backend {name}: {e}"),
            }
        }
        Ok(backends)
    }

    /// List backends, keeping per-device lookup failures.
    ///
    /// The outer error means the listing itself failed. On the Cloud API each
    /// device's configuration and status are fetched separately, so a single
    /// device can fail while the rest succeed.
    pub async fn probe_backends(&self) -> IbmResult<Vec<(String, IbmResult<BackendInfo>)>> {
        let url = format!("{}/v1/backends", self.endpoint);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "list backends failed").await);
        }

        if self.cloud_api {
            let devices: DevicesResponse = response.json().await?;
            let mut probes = Vec::with_capacity(devices.devices.len());
            for device in devices.devices {
                let info = self.get_backend_cloud(&device.name).await;
                probes.push((device.name, info));
            }
            Ok(probes)
        } else {
            let backends: LegacyBackendsResponse = response.json().await?;
            Ok(backends
                .backends
                .into_iter()
                .map(|b| (b.name.clone(), Ok(b)))
                .collect())
        }
    }

    /// Get details for a specific backend.
    pub async fn get_backend(&self, name: &str) -> IbmResult<BackendInfo> {
        if self.cloud_api {
            self.get_backend_cloud(name).await
        } else {
            self.get_backend_legacy(name).await
        }
    }

    /// Merge `/configuration` and `/status` into one [`BackendInfo`].
    async fn get_backend_cloud(&self, name: &str) -> IbmResult<BackendInfo> {
        let config_url = format!("{}/v1/backends/{}/configuration", self.endpoint, name);
        let config_response = self.client.get(&config_url).send().await?;

        if !config_response.status().is_success() {
            if config_response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(IbmError::BackendUnavailable(name.to_string()));
            }
            return Err(api_error(
                config_response,
                &format!("backend configuration failed for {name}"),
            )
            .await);
        }
        let config: BackendConfigResponse = config_response.json().await?;

        let status_url = format!("{}/v1/backends/{}/status", self.endpoint, name);
        let status_response = self.client.get(&status_url).send().await?;
        if !status_response.status().is_success() {
            return Err(api_error(status_response, &format!("backend status failed for {name}")).await);
        }
        let s: BackendStatusResponse = status_response.json().await?;

        Ok(BackendInfo {
            name: config.backend_name,
            num_qubits: config.n_qubits,
            status: BackendStatus {
                operational: s.state,
                status_msg: Some(s.status).filter(|m| !m.is_empty()),
                pending_jobs: Some(u32::try_from(s.length_queue).unwrap_or(u32::MAX)),
            },
            processor_type: config.processor_type,
            basis_gates: config.basis_gates,
            simulator: config.simulator.unwrap_or(false),
            max_shots: config.max_shots,
        })
    }

    async fn get_backend_legacy(&self, name: &str) -> IbmResult<BackendInfo> {
        let url = format!("{}/v1/backends/{}", self.endpoint, name);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(IbmError::BackendUnavailable(name.to_string()));
            }
            return Err(api_error(response, &format!("backend lookup failed for {name}")).await);
        }

        response.json().await.map_err(IbmError::from)
    }

    /// Submit OpenQASM 3 circuits to the Sampler primitive.
    ///
    /// Uses the V2 PUB format on the Cloud API and the V1 format on legacy.
    pub async fn submit_sampler_job(
        &self,
        backend: &str,
        circuits: Vec<String>,
        shots: u32,
    ) -> IbmResult<SubmitResponse> {
        let url = format!("{}/v1/jobs", self.endpoint);
        let body = self.sampler_request(backend, circuits, shots);

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "job submission failed").await);
        }

        response.json().await.map_err(IbmError::from)
    }

    fn sampler_request(&self, backend: &str, circuits: Vec<String>, shots: u32) -> serde_json::Value {
        if self.cloud_api {
            // Each PUB is (circuit, parameter values, shots).
            let pubs: Vec<serde_json::Value> = circuits
                .into_iter()
                .map(|c| serde_json::json!([c, {}, shots]))
                .collect();
            serde_json::json!({
                "program_id": "sampler",
                "backend": backend,
                "params": {
                    "version": 2,
                    "pubs": pubs,
                    "options": { "optimization_level": 1 }
                }
            })
        } else {
            let mut request = serde_json::json!({
                "program_id": "sampler",
                "backend": backend,
                "params": {
                    "circuits": circuits,
                    "shots": shots,
                    "skip_transpilation": false
                }
            });
            if let Some(hub) = &self.instance {
                request["hub"] = serde_json::json!(hub);
            }
            request
        }
    }

    /// Get job status.
    pub async fn get_job_status(&self, job_id: &str) -> IbmResult<JobStatusResponse> {
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(IbmError::JobNotFound(job_id.to_string()));
            }
            return Err(api_error(response, "job status failed").await);
        }

        response.json().await.map_err(IbmError::from)
    }

    /// Get job results.
    pub async fn get_job_results(&self, job_id: &str) -> IbmResult<JobResultResponse> {
        let url = format!("{}/v1/jobs/{}/results", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(IbmError::JobNotFound(job_id.to_string()));
            }
            return Err(api_error(response, "job results failed").await);
        }

        response.json().await.map_err(IbmError::from)
    }

    /// Cancel a job.
    pub async fn cancel_job(&self, job_id: &str) -> IbmResult<()> {
        let url = format!("{}/v1/jobs/{}/cancel", self.endpoint, job_id);
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response, "job cancel failed").await);
        }
        Ok(())
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

/// Cloud API device list (`{"devices": [...]}`).
#[derive(Debug, Deserialize)]
struct DevicesResponse {
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
}

/// Legacy backend list (`{"backends": [...]}`).
#[derive(Debug, Deserialize)]
struct LegacyBackendsResponse {
    backends: Vec<BackendInfo>,
}

/// Cloud API `/backends/{name}/configuration`.
#[derive(Debug, Deserialize)]
struct BackendConfigResponse {
    backend_name: String,
    n_qubits: usize,
    #[serde(default)]
    basis_gates: Vec<String>,
    #[serde(default)]
    processor_type: Option<ProcessorType>,
    #[serde(default)]
    simulator: Option<bool>,
    #[serde(default)]
    max_shots: Option<u32>,
}

/// Cloud API `/backends/{name}/status`.
#[derive(Debug, Deserialize)]
struct BackendStatusResponse {
    state: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    length_queue: u64,
}

/// Backend information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend name.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Backend status.
    pub status: BackendStatus,
    /// Processor type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<ProcessorType>,
    /// Basis gates.
    #[serde(default)]
    pub basis_gates: Vec<String>,
    /// Whether this is a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Maximum number of shots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shots: Option<u32>,
}

/// Backend status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Whether the backend is operational.
    pub operational: bool,
    /// Status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_msg: Option<String>,
    /// Number of pending jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_jobs: Option<u32>,
}

/// Processor type information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorType {
    /// Family (e.g., "Eagle", "Heron").
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// Job status response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub id: String,
    /// Top-level status; mixed case on the Cloud API.
    pub status: String,
    /// Error information if failed (legacy API).
    #[serde(default)]
    pub error: Option<JobError>,
    /// State object with reason (Cloud API).
    #[serde(default)]
    pub state: Option<JobState>,
}

/// Job error information (legacy API).
#[derive(Debug, Clone, Deserialize)]
pub struct JobError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// Job state with reason (Cloud API).
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl JobStatusResponse {
    fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.normalized_status().as_str(),
            "COMPLETED" | "FAILED" | "CANCELLED" | "ERROR"
        )
    }

    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.normalized_status().as_str(), "FAILED" | "ERROR")
    }

    pub fn is_cancelled(&self) -> bool {
        self.normalized_status() == "CANCELLED"
    }

    /// Failure reason, preferring the Cloud API `state.reason`.
    pub fn error_message(&self) -> Option<String> {
        self.state
            .as_ref()
            .and_then(|s| s.reason.clone())
            .or_else(|| self.error.as_ref().map(|e| e.message.clone()))
    }
}

/// Job result response.
#[derive(Debug, Deserialize)]
pub struct JobResultResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub results: Vec<SamplerResult>,
}

/// Sampler result for one circuit.
#[derive(Debug, Deserialize)]
pub struct SamplerResult {
    /// V2: classical register name to per-shot hex samples.
    #[serde(default)]
    pub data: Option<HashMap<String, ClassicalRegisterData>>,
    /// V1: quasi-probability distribution (bitstring -> probability).
    #[serde(default)]
    pub quasi_dists: Option<Vec<HashMap<String, f64>>>,
    /// V1: measurement counts (bitstring -> count).
    #[serde(default)]
    pub counts: Option<HashMap<String, u64>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Classical register data from V2 Sampler results.
#[derive(Debug, Deserialize)]
pub struct ClassicalRegisterData {
    /// One hex string per shot (e.g. `["0x0", "0x2", ...]`).
    pub samples: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: &str, error: Option<&str>, reason: Option<&str>) -> JobStatusResponse {
        JobStatusResponse {
            id: "test".to_string(),
            status: status.to_string(),
            error: error.map(|m| JobError {
                code: None,
                message: m.to_string(),
            }),
            state: reason.map(|r| JobState {
                status: status.to_string(),
                reason: Some(r.to_string()),
            }),
        }
    }

    #[test]
    fn test_job_status_terminal() {
        let done = status("COMPLETED", None, None);
        assert!(done.is_terminal());
        assert!(done.is_completed());
        assert!(!done.is_failed());

        let failed = status("FAILED", Some("Test error"), None);
        assert!(failed.is_terminal());
        assert!(failed.is_failed());
        assert_eq!(failed.error_message().as_deref(), Some("Test error"));

        assert!(!status("QUEUED", None, None).is_terminal());
    }

    #[test]
    fn test_job_status_cloud_api_mixed_case() {
        let failed = status("Failed", Some("legacy"), Some("circuit too deep"));
        assert!(failed.is_failed());
        assert_eq!(failed.error_message().as_deref(), Some("circuit too deep"));
        assert!(status("Cancelled", None, None).is_cancelled());
    }

    #[test]
    fn test_devices_response_deserialization() {
        let json = r#"{"devices": [
            {"name": "ibm_fez", "status": {"name": "online"}},
            {"name": "ibm_torino", "status": {"name": "online"}}
        ]}"#;
        let resp: DevicesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.devices.len(), 2);
        assert_eq!(resp.devices[1].name, "ibm_torino");
    }

    #[test]
    fn test_backend_config_and_status_deserialization() {
        let json = r#"{
            "backend_name": "ibm_torino",
            "n_qubits": 133,
            "basis_gates": ["cz", "id", "rz", "sx", "x"],
            "coupling_map": [[0, 1], [1, 0]],
            "simulator": false
        }"#;
        let config: BackendConfigResponse = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend_name, "ibm_torino");
        assert_eq!(config.n_qubits, 133);
        assert_eq!(config.simulator, Some(false));

        let json = r#"{"state": true, "status": "active", "message": "", "length_queue": 12}"#;
        let status: BackendStatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.state);
        assert_eq!(status.length_queue, 12);
    }

    #[test]
    fn test_legacy_backends_deserialization() {
        let json = r#"{"backends": [
            {"name": "ibmq_lima", "num_qubits": 5,
             "status": {"operational": true, "pending_jobs": 3}},
            {"name": "ibmq_qasm_simulator", "num_qubits": 32, "simulator": true,
             "status": {"operational": true}}
        ]}"#;
        let resp: LegacyBackendsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.backends[0].status.pending_jobs, Some(3));
        assert!(!resp.backends[0].simulator);
        assert!(resp.backends[1].simulator);
        assert_eq!(resp.backends[1].status.pending_jobs, None);
    }

    #[test]
    fn test_sampler_request_shapes() {
        let legacy = IbmClient::new(LEGACY_ENDPOINT, "token")
            .unwrap()
            .with_instance("ibm-q/open/main");
        let body = legacy.sampler_request("ibmq_lima", vec!["OPENQASM 3.0;".into()], 512);
        assert_eq!(body["params"]["shots"], 512);
        assert_eq!(body["hub"], "ibm-q/open/main");

        let plain = IbmClient::new(LEGACY_ENDPOINT, "token").unwrap();
        let body = plain.sampler_request("ibmq_lima", vec![], 1);
        assert!(body.get("hub").is_none());
    }

    #[test]
    fn test_legacy_client_is_not_cloud() {
        let client = IbmClient::new("https://example.com", "test-token").unwrap();
        assert!(!client.is_cloud_api());
        assert_eq!(client.endpoint(), "https://example.com");
        assert!(!format!("{client:?}").contains("test-token"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            IbmClient::new(LEGACY_ENDPOINT, "  "),
            Err(IbmError::MissingToken)
        ));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = IbmCredentials::ApiKey {
            api_key: "very-secret".into(),
            service_crn: "crn:v1:x".into(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("crn:v1:x"));
    }
}
