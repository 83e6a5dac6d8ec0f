//! Network configuration seed and harness settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// How agents in a test network reach each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// In-process only; nothing leaves the harness.
    #[default]
    Memory,
    /// QUIC with an optional bootstrap service.
    Quic,
}

/// Topology handed to the network when players are spawned.
///
/// Suite code treats this as opaque: build it with [`NetworkConfig::gen`]
/// and pass it along unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub transport: Transport,
    pub bootstrap_url: Option<String>,
    /// Seed for agent identities. A fresh UUID is drawn per network when unset.
    pub network_seed: Option<String>,
    pub agents_per_conductor: usize,
    pub max_agents: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Memory,
            bootstrap_url: None,
            network_seed: None,
            agents_per_conductor: 1,
            max_agents: 16,
        }
    }
}

impl NetworkConfig {
    /// Default configuration seed.
    pub fn gen() -> Self {
        Self::default()
    }

    /// Pin the identity seed so agent keys are reproducible.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.network_seed = Some(seed.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents_per_conductor == 0 {
            return Err(HarnessError::Config(
                "agents_per_conductor must be at least 1".to_string(),
            ));
        }
        if self.max_agents == 0 {
            return Err(HarnessError::Config(
                "max_agents must be at least 1".to_string(),
            ));
        }
        if self.transport == Transport::Memory && self.bootstrap_url.is_some() {
            return Err(HarnessError::Config(
                "bootstrap_url requires the quic transport".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scenario scheduling within one orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl std::str::FromStr for ExecutionMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(HarnessError::Config(format!(
                "unknown execution mode: {other}"
            ))),
        }
    }
}

/// Environment keys that override [`HarnessConfig`].
pub const ENV_MODE: &str = "TAPESTRY_MODE";
pub const ENV_TIMEOUT_SECS: &str = "TAPESTRY_TIMEOUT_SECS";

/// Orchestrator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub mode: ExecutionMode,
    /// Per-scenario wait for the completion signal. `0` waits forever.
    pub timeout_secs: u64,
}

impl HarnessConfig {
    pub fn parallel(mut self) -> Self {
        self.mode = ExecutionMode::Parallel;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Load from a TOML file, then apply process environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)?.apply_env()
    }

    /// Apply `TAPESTRY_MODE` / `TAPESTRY_TIMEOUT_SECS` from the process env.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE).filter(|v| !v.trim().is_empty()) {
            self.mode = mode.parse()?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{ENV_TIMEOUT_SECS} must be an integer, got {raw}"))
            })?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_gen_is_default() {
        let config = NetworkConfig::gen();
        assert_eq!(config, NetworkConfig::default());
        assert_eq!(config.transport, Transport::Memory);
        assert!(config.network_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_transport_rejects_bootstrap() {
        let config = NetworkConfig {
            bootstrap_url: Some("https://bootstrap.example".to_string()),
            ..NetworkConfig::gen()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_harness_config_from_toml() {
        let config = HarnessConfig::from_toml_str("mode = \"parallel\"\ntimeout_secs = 30\n").unwrap();
        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_harness_config_empty_toml_is_default() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [(ENV_MODE, "Parallel"), (ENV_TIMEOUT_SECS, " 5 ")].into_iter().collect();
        let config = HarnessConfig::default()
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_env_rejects_bad_timeout() {
        let result = HarnessConfig::default().apply_env_with(|k| {
            (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
