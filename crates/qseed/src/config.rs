//! Seeder configuration.
//!
//! Precedence, lowest to highest:
//! 1. Default values
//! 2. YAML file (`~/.qseed/config.yaml` unless a path is given)
//! 3. Environment variables
//! 4. Explicit overrides applied by the caller (CLI flags)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qseed_adapter_ibm::IbmCredentials;

/// Qubit register size used when nothing else is configured.
pub const DEFAULT_QUBITS: u32 = 7;

/// Shots used when nothing else is configured.
pub const DEFAULT_SHOTS: u32 = 512;

/// Registers wider than this produce bitstrings that no longer fit the
/// 64-bit sample words IBM returns.
pub const MAX_SUPPORTED_QUBITS: u32 = 63;

/// Longest accepted pause between job status polls (one hour).
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Longest accepted job wait (one week).
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 3_600;

/// Seeder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Size of the quantum register.
    pub qubits: u32,
    /// Size of the classical register; same as `qubits` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classical_bits: Option<u32>,
    /// Requests above this size go straight to the simulator; same as
    /// `qubits` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_qubits: Option<u32>,
    /// Number of circuit repetitions.
    pub shots: u32,
    /// Skip device selection and use the local simulator.
    pub simulate: bool,
    /// IBM Quantum access.
    pub ibm: IbmSettings,
    /// Local simulator settings.
    pub simulator: SimulatorSettings,
    /// Job polling.
    pub wait: WaitSettings,
}

/// IBM Quantum credentials and endpoint.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IbmSettings {
    /// Legacy bearer token (`IBM_QUANTUM_TOKEN`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Cloud API key (`IBM_API_KEY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Cloud service instance CRN (`IBM_SERVICE_CRN`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_crn: Option<String>,
    /// Endpoint override for token mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Hub/group/project for token mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl fmt::Debug for IbmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("IbmSettings")
            .field("token", &redacted(&self.token))
            .field("api_key", &redacted(&self.api_key))
            .field("service_crn", &self.service_crn)
            .field("endpoint", &self.endpoint)
            .field("instance", &self.instance)
            .finish()
    }
}

/// Local simulator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Fixed RNG seed, for reproducible runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// How long to poll a submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Milliseconds between status polls.
    pub poll_interval_ms: u64,
    /// Give up after this many seconds.
    pub timeout_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 3_600,
        }
    }
}

impl WaitSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            qubits: DEFAULT_QUBITS,
            classical_bits: None,
            max_qubits: None,
            shots: DEFAULT_SHOTS,
            simulate: false,
            ibm: IbmSettings::default(),
            simulator: SimulatorSettings::default(),
            wait: WaitSettings::default(),
        }
    }
}

impl SeedConfig {
    /// Default configuration file location (`~/.qseed/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".qseed").join("config.yaml"))
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load with file and environment layers, then validate.
    ///
    /// With `config_file` unset the default path is used when it exists.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::layered(config_file)?;
        config.validate()?;
        Ok(config)
    }

    /// File and environment layers without validation, for callers that
    /// apply further overrides before calling [`SeedConfig::validate`].
    pub fn layered(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading configuration file");
                    Self::from_file(path)?
                }
                None => Self::default(),
            },
        };
        Ok(config.merge_env())
    }

    /// Apply overrides from the process environment.
    pub fn merge_env(self) -> Self {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Only variables that are set override.
    pub fn merge_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("ignoring {key}={raw}: not a number");
                    None
                }
            }
        };
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = number("QSEED_QUBITS") {
            self.qubits = clamp_u32(v);
        }
        if let Some(v) = number("QSEED_SHOTS") {
            self.shots = clamp_u32(v);
        }
        if let Some(v) = number("QSEED_MAX_QUBITS") {
            self.max_qubits = Some(clamp_u32(v));
        }
        if let Some(v) = number("QSEED_TIMEOUT_SECS") {
            self.wait.timeout_secs = v;
        }
        if let Some(v) = lookup("QSEED_SIMULATE") {
            self.simulate = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(v) = text("QSEED_ENDPOINT") {
            self.ibm.endpoint = Some(v);
        }
        if let Some(v) = text("QSEED_INSTANCE") {
            self.ibm.instance = Some(v);
        }
        if let Some(v) = text("IBM_QUANTUM_TOKEN") {
            self.ibm.token = Some(v);
        }
        if let Some(v) = text("IBM_API_KEY") {
            self.ibm.api_key = Some(v);
        }
        if let Some(v) = text("IBM_SERVICE_CRN") {
            self.ibm.service_crn = Some(v);
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qubits == 0 {
            return Err(ConfigError::ValidationError(
                "qubits must be greater than 0".to_string(),
            ));
        }
        if self.qubits > MAX_SUPPORTED_QUBITS {
            return Err(ConfigError::ValidationError(format!(
                "qubits must be at most {MAX_SUPPORTED_QUBITS}, got {}",
                self.qubits
            )));
        }
        if self.shots == 0 {
            return Err(ConfigError::ValidationError(
                "shots must be greater than 0".to_string(),
            ));
        }
        if self.classical_bits == Some(0) {
            return Err(ConfigError::ValidationError(
                "classical_bits must be greater than 0".to_string(),
            ));
        }
        if self.wait.poll_interval_ms == 0 || self.wait.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::ValidationError(format!(
                "wait.poll_interval_ms must be between 1 and {MAX_POLL_INTERVAL_MS}, got {}",
                self.wait.poll_interval_ms
            )));
        }
        if self.wait.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "wait.timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {}",
                self.wait.timeout_secs
            )));
        }
        if self.ibm.api_key.is_some() && self.ibm.service_crn.is_none() {
            return Err(ConfigError::ValidationError(
                "ibm.service_crn (IBM_SERVICE_CRN) is required with an API key".to_string(),
            ));
        }
        Ok(())
    }

    /// Classical register size.
    pub fn classical_bits(&self) -> u32 {
        self.classical_bits.unwrap_or(self.qubits)
    }

    /// Qubit ceiling for device selection.
    pub fn max_qubits(&self) -> u32 {
        self.max_qubits.unwrap_or(self.qubits)
    }

    /// IBM credentials, preferring the Cloud API key over a legacy token.
    pub fn credentials(&self) -> Option<IbmCredentials> {
        if let (Some(api_key), Some(service_crn)) = (&self.ibm.api_key, &self.ibm.service_crn) {
            return Some(IbmCredentials::ApiKey {
                api_key: api_key.clone(),
                service_crn: service_crn.clone(),
            });
        }
        self.ibm.token.as_ref().map(|token| IbmCredentials::Token {
            token: token.clone(),
            endpoint: self.ibm.endpoint.clone(),
            instance: self.ibm.instance.clone(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SeedConfig::default();
        assert_eq!(config.qubits, 7);
        assert_eq!(config.shots, 512);
        assert_eq!(config.classical_bits(), 7);
        assert_eq!(config.max_qubits(), 7);
        assert!(!config.simulate);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = SeedConfig::from_yaml(
            "qubits: 5\nmax_qubits: 10\nibm:\n  token: abc\nsimulator:\n  seed: 42\n",
        )
        .unwrap();
        assert_eq!(config.qubits, 5);
        assert_eq!(config.shots, 512);
        assert_eq!(config.max_qubits(), 10);
        assert_eq!(config.simulator.seed, Some(42));
        assert!(matches!(
            config.credentials(),
            Some(IbmCredentials::Token { token, .. }) if token == "abc"
        ));
    }

    #[test]
    fn test_yaml_parse_error() {
        let err = SeedConfig::from_yaml("qubits: [not a number]").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "shots: 2048\nsimulate: true").unwrap();

        let config = SeedConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shots, 2048);
        assert!(config.simulate);

        let missing = SeedConfig::from_file("/nonexistent/qseed.yaml").unwrap_err();
        assert!(matches!(missing, ConfigError::IoError(_)));
    }

    #[test]
    fn test_load_applies_file_then_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "qubits: 0").unwrap();
        assert!(matches!(
            SeedConfig::load(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_layered_defers_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "qubits: 0\nshots: 32").unwrap();

        let mut config = SeedConfig::layered(Some(file.path())).unwrap();
        assert_eq!(config.qubits, 0);
        config.qubits = 5;
        assert!(config.validate().is_ok());
        assert_eq!(config.shots, 32);
    }

    #[test]
    fn test_validate_bounds_wait_settings() {
        let config = SeedConfig::default()
            .merge_env_with(env(&[("QSEED_TIMEOUT_SECS", "18446744073709551615")]));
        assert_eq!(config.wait.timeout_secs, u64::MAX);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("timeout_secs")
        ));

        let mut config = SeedConfig::default();
        config.wait.poll_interval_ms = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = SeedConfig::default();
        config.wait.timeout_secs = MAX_TIMEOUT_SECS;
        config.wait.poll_interval_ms = MAX_POLL_INTERVAL_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = SeedConfig::from_yaml("qubits: 3\nshots: 100\n")
            .unwrap()
            .merge_env_with(env(&[
                ("QSEED_QUBITS", "9"),
                ("QSEED_SIMULATE", "yes"),
                ("IBM_QUANTUM_TOKEN", "tok"),
                ("QSEED_INSTANCE", "ibm-q/open/main"),
            ]));
        assert_eq!(config.qubits, 9);
        assert_eq!(config.shots, 100);
        assert!(config.simulate);
        assert_eq!(config.ibm.token.as_deref(), Some("tok"));
        assert_eq!(config.ibm.instance.as_deref(), Some("ibm-q/open/main"));
    }

    #[test]
    fn test_env_ignores_bad_numbers_and_blank_values() {
        let config = SeedConfig::default().merge_env_with(env(&[
            ("QSEED_SHOTS", "many"),
            ("IBM_QUANTUM_TOKEN", "  "),
        ]));
        assert_eq!(config.shots, 512);
        assert!(config.ibm.token.is_none());
    }

    #[test]
    fn test_api_key_preferred_over_token() {
        let config = SeedConfig::default().merge_env_with(env(&[
            ("IBM_QUANTUM_TOKEN", "tok"),
            ("IBM_API_KEY", "key"),
            ("IBM_SERVICE_CRN", "crn:v1"),
        ]));
        assert!(matches!(
            config.credentials(),
            Some(IbmCredentials::ApiKey { service_crn, .. }) if service_crn == "crn:v1"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SeedConfig::default();
        config.qubits = 0;
        assert!(config.validate().is_err());

        let mut config = SeedConfig::default();
        config.qubits = 64;
        assert!(config.validate().is_err());

        let mut config = SeedConfig::default();
        config.shots = 0;
        assert!(config.validate().is_err());

        let mut config = SeedConfig::default();
        config.ibm.api_key = Some("key".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = SeedConfig::default();
        config.ibm.token = Some("super-secret".into());
        config.ibm.api_key = Some("also-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
