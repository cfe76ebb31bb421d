//! Backend selection.
//!
//! With IBM credentials, the real device with the shortest queue that has
//! enough qubits is picked. Every other outcome (no credentials, oversized
//! request, unreachable directory, no eligible device) falls back to the
//! local simulator and records why.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use qseed_adapter_ibm::{BackendInfo, IbmBackend, IbmClient};
use qseed_adapter_sim::SimulatorBackend;
use qseed_hal::Backend;

use crate::config::SeedConfig;
use crate::error::SeedResult;

/// Snapshot of one remote device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub num_qubits: u32,
    /// Jobs waiting ahead of a new submission, if reported.
    pub pending_jobs: Option<u32>,
    pub operational: bool,
    pub simulator: bool,
}

impl DeviceStatus {
    /// Queue length used for ranking; unknown queues rank last.
    pub fn queue_len(&self) -> u32 {
        self.pending_jobs.unwrap_or(u32::MAX)
    }

    /// Simulators are recognised by flag or by name.
    pub fn is_simulator(&self) -> bool {
        self.simulator || self.name.contains("simulator")
    }

    /// Whether this device can take a `qubits`-wide seed circuit.
    pub fn eligible_for(&self, qubits: u32) -> bool {
        !self.is_simulator() && self.operational && self.num_qubits >= qubits
    }
}

impl From<&BackendInfo> for DeviceStatus {
    fn from(info: &BackendInfo) -> Self {
        Self {
            name: info.name.clone(),
            num_qubits: u32::try_from(info.num_qubits).unwrap_or(u32::MAX),
            pending_jobs: info.status.pending_jobs,
            operational: info.status.operational,
            simulator: info.simulator,
        }
    }
}

/// Result of probing one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceProbe {
    Status(DeviceStatus),
    /// The device is listed but its details could not be fetched.
    Unreachable { name: String, reason: String },
}

impl DeviceProbe {
    pub fn name(&self) -> &str {
        match self {
            Self::Status(status) => &status.name,
            Self::Unreachable { name, .. } => name,
        }
    }
}

/// A source of remote device snapshots.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// List every device with its current status.
    ///
    /// An `Err` means the listing itself failed; per-device failures are
    /// reported as [`DeviceProbe::Unreachable`].
    async fn list_devices(&self) -> SeedResult<Vec<DeviceProbe>>;
}

#[async_trait]
impl DeviceDirectory for IbmClient {
    async fn list_devices(&self) -> SeedResult<Vec<DeviceProbe>> {
        let probes = self.probe_backends().await?;
        Ok(probes
            .into_iter()
            .map(|(name, info)| match info {
                Ok(info) => DeviceProbe::Status(DeviceStatus::from(&info)),
                Err(e) => DeviceProbe::Unreachable {
                    name,
                    reason: e.to_string(),
                },
            })
            .collect())
    }
}

/// Why the simulator was used instead of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No IBM credentials configured.
    NoToken,
    /// Simulation was explicitly requested.
    Requested,
    /// More qubits than the configured ceiling.
    TooManyQubits { requested: u32, max: u32 },
    /// No operational device has enough qubits.
    NoEligibleDevice,
    /// Authentication or device listing failed.
    DirectoryUnavailable(String),
    /// The chosen device could not run the job.
    DeviceFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => write!(f, "no IBM Quantum credentials configured"),
            Self::Requested => write!(f, "simulation requested"),
            Self::TooManyQubits { requested, max } => {
                write!(f, "{requested} qubits requested, limit is {max}")
            }
            Self::NoEligibleDevice => write!(f, "no operational device has enough qubits"),
            Self::DirectoryUnavailable(reason) => write!(f, "IBM Quantum unavailable: {reason}"),
            Self::DeviceFailed(reason) => write!(f, "device execution failed: {reason}"),
        }
    }
}

/// Where the seed circuit will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendChoice {
    Device(DeviceStatus),
    Simulator(FallbackReason),
}

/// Pick the eligible device with the strictly lowest queue.
///
/// Simulators, non-operational devices and devices with fewer than `qubits`
/// qubits are skipped. On equal queues the first device listed wins.
pub fn pick_lowest_queue(devices: &[DeviceProbe], qubits: u32) -> Option<DeviceStatus> {
    let mut best: Option<&DeviceStatus> = None;

    for probe in devices {
        let status = match probe {
            DeviceProbe::Status(status) => status,
            DeviceProbe::Unreachable { name, reason } => {
                info!("{name} is not operational: {reason}");
                continue;
            }
        };
        if status.is_simulator() {
            continue;
        }
        if !status.operational {
            info!("{} is not operational", status.name);
            continue;
        }
        if status.num_qubits < qubits {
            debug!(
                "{} has {} qubits, {} needed",
                status.name, status.num_qubits, qubits
            );
            continue;
        }

        debug!(
            "{}: {} qubits, queue {}",
            status.name,
            status.num_qubits,
            status
                .pending_jobs
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );
        if best.is_none_or(|b| status.queue_len() < b.queue_len()) {
            best = Some(status);
        }
    }

    best.cloned()
}

/// Reasons to use the simulator that need no network access.
fn precheck(config: &SeedConfig) -> Option<FallbackReason> {
    if !config.has_credentials() {
        return Some(FallbackReason::NoToken);
    }
    if config.qubits > config.max_qubits() {
        return Some(FallbackReason::TooManyQubits {
            requested: config.qubits,
            max: config.max_qubits(),
        });
    }
    if config.simulate {
        return Some(FallbackReason::Requested);
    }
    None
}

/// Decide where to run, consulting `directory` only when needed.
pub async fn choose_backend(config: &SeedConfig, directory: &dyn DeviceDirectory) -> BackendChoice {
    if let Some(reason) = precheck(config) {
        return BackendChoice::Simulator(reason);
    }

    let devices = match directory.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("device listing failed: {e}");
            return BackendChoice::Simulator(FallbackReason::DirectoryUnavailable(e.to_string()));
        }
    };

    match pick_lowest_queue(&devices, config.qubits) {
        Some(device) => {
            info!(
                "selected {} ({} qubits, queue {})",
                device.name,
                device.num_qubits,
                device.queue_len()
            );
            BackendChoice::Device(device)
        }
        None => BackendChoice::Simulator(FallbackReason::NoEligibleDevice),
    }
}

/// A materialized backend plus the decision that produced it.
pub struct SelectedBackend {
    pub backend: Box<dyn Backend>,
    pub choice: BackendChoice,
}

impl SelectedBackend {
    /// Wrap the local simulator.
    pub fn simulator(config: &SeedConfig, reason: FallbackReason) -> Self {
        info!("using local simulator: {reason}");
        Self {
            backend: Box::new(simulator_backend(config)),
            choice: BackendChoice::Simulator(reason),
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.choice, BackendChoice::Simulator(_))
    }

    pub fn fallback(&self) -> Option<&FallbackReason> {
        match &self.choice {
            BackendChoice::Simulator(reason) => Some(reason),
            BackendChoice::Device(_) => None,
        }
    }

    /// Jobs ahead of ours on the chosen device.
    pub fn queue_depth(&self) -> Option<u32> {
        match &self.choice {
            BackendChoice::Device(device) => device.pending_jobs,
            BackendChoice::Simulator(_) => Some(0),
        }
    }
}

impl fmt::Debug for SelectedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedBackend")
            .field("backend", &self.backend.name())
            .field("choice", &self.choice)
            .finish()
    }
}

/// Build the local simulator for `config`.
pub fn simulator_backend(config: &SeedConfig) -> SimulatorBackend {
    let backend = SimulatorBackend::new();
    match config.simulator.seed {
        Some(seed) => backend.with_seed(seed),
        None => backend,
    }
}

/// Select and materialize a backend against live IBM Quantum.
///
/// Never fails: every problem becomes a simulator fallback.
pub async fn acquire_backend(config: &SeedConfig) -> SelectedBackend {
    if let Some(reason) = precheck(config) {
        return SelectedBackend::simulator(config, reason);
    }
    let Some(credentials) = config.credentials() else {
        return SelectedBackend::simulator(config, FallbackReason::NoToken);
    };

    let client = match IbmClient::authenticate(&credentials).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("IBM Quantum authentication failed: {e}");
            return SelectedBackend::simulator(
                config,
                FallbackReason::DirectoryUnavailable(e.to_string()),
            );
        }
    };

    let device = match choose_backend(config, client.as_ref()).await {
        BackendChoice::Device(device) => device,
        BackendChoice::Simulator(reason) => return SelectedBackend::simulator(config, reason),
    };

    match IbmBackend::connect(client, &device.name).await {
        Ok(backend) => SelectedBackend {
            backend: Box::new(backend),
            choice: BackendChoice::Device(device),
        },
        Err(e) => {
            warn!("could not open {}: {e}", device.name);
            SelectedBackend::simulator(config, FallbackReason::DeviceFailed(e.to_string()))
        }
    }
}
