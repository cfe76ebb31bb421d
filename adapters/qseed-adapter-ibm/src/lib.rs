//! IBM Quantum adapter for qseed.
//!
//! Two credential modes:
//!
//! - `IBM_API_KEY` + `IBM_SERVICE_CRN`: IBM Cloud API (IAM token exchange)
//! - `IBM_QUANTUM_TOKEN`: legacy bearer token against
//!   `api.quantum-computing.ibm.com`
//!
//! [`IbmClient`] lists devices with their queue lengths; [`IbmBackend`]
//! implements [`qseed_hal::Backend`] for one device.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qseed_adapter_ibm::{IbmBackend, IbmClient, IbmCredentials};
//! use qseed_hal::Backend;
//!
//! let creds = IbmCredentials::Token {
//!     token: std::env::var("IBM_QUANTUM_TOKEN")?,
//!     endpoint: None,
//!     instance: None,
//! };
//! let client = Arc::new(IbmClient::authenticate(&creds).await?);
//! for device in client.list_backends().await? {
//!     println!("{} {:?}", device.name, device.status.pending_jobs);
//! }
//! let backend = IbmBackend::connect(client, "ibm_kyiv").await?;
//! ```

mod api;
mod backend;
mod error;

pub use api::{
    BackendInfo, BackendStatus, DEFAULT_ENDPOINT, IbmClient, IbmCredentials, LEGACY_ENDPOINT,
    ProcessorType,
};
pub use backend::IbmBackend;
pub use error::{IbmError, IbmResult};
