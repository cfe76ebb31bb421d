//! Backend trait and configuration.
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |
//! | `validate()` | async | yes | `HalResult<ValidationResult>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<ExecutionResult>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `wait()` / `wait_with()` | async | provided | `HalResult<ExecutionResult>` |

use std::time::Duration;

use async_trait::async_trait;
use qseed_ir::Circuit;
use tracing::debug;

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default limit on how long `wait()` polls before giving up.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// A place circuits can run.
///
/// - `capabilities()` is synchronous and infallible; implementations cache
///   it at construction time.
/// - `submit()` returns a job that starts in `Queued`.
/// - `result()` is only valid once `status()` reports `Completed`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check availability, including the current queue depth when known.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a circuit against qubit count and gate set.
    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult>;

    /// Submit a circuit for execution.
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the result of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Cancel a running job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Wait for a job using the default poll interval and timeout.
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        self.wait_with(job_id, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT)
            .await
    }

    /// Poll `status()` every `poll_interval` until the job is terminal or
    /// `timeout` elapses.
    async fn wait_with(
        &self,
        job_id: &JobId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> HalResult<ExecutionResult> {
        // A timeout too large to represent means no deadline.
        let deadline = tokio::time::Instant::now().checked_add(timeout);

        loop {
            let status = self.status(job_id).await?;
            debug!(job = %job_id, %status, "polled job status");

            match status {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {}
            }

            if let Some(deadline) = deadline {
                let next_poll = tokio::time::Instant::now().checked_add(poll_interval);
                if next_poll.is_none_or(|next| next > deadline) {
                    return Err(HalError::Timeout(job_id.to_string()));
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Estimated wait time for a new job (if known).
    pub estimated_wait: Option<Duration>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Availability of a local backend: zero queue, zero wait.
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            estimated_wait: Some(Duration::ZERO),
            status_message: None,
        }
    }

    /// Availability of an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            estimated_wait: None,
            status_message: Some(reason.into()),
        }
    }

    /// Availability of a remote backend with `pending` queued jobs.
    pub fn queued(pending: u32) -> Self {
        Self {
            is_available: true,
            queue_depth: Some(pending),
            estimated_wait: None,
            status_message: None,
        }
    }
}

/// Result of circuit validation against backend constraints.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Circuit can be submitted as-is.
    Valid,
    /// Circuit cannot run on this backend.
    Invalid {
        /// Reasons the circuit is invalid.
        reasons: Vec<String>,
    },
    /// Circuit could run after transpilation.
    RequiresTranspilation {
        /// What transpilation is needed.
        details: String,
    },
}

impl ValidationResult {
    /// Check if the circuit is valid (can be submitted as-is).
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
