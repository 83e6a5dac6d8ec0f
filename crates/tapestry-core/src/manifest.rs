//! Declarative suite manifests (TOML).
//!
//! ```toml
//! name = "tragedy_commons"
//! # agents -> app groups -> bundle paths, relative to this file
//! agents = [
//!     [["workdir/tragedy-commons.happ"]],
//!     [["workdir/tragedy-commons.happ"]],
//! ]
//!
//! [harness]
//! mode = "sequential"
//! timeout_secs = 30
//!
//! [network]
//! transport = "memory"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactLocator, ArtifactPath};
use crate::config::{HarnessConfig, NetworkConfig};
use crate::error::{HarnessError, Result};
use crate::install::{AgentSlot, AppGroup, InstallDescriptor};
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteManifest {
    pub name: String,
    #[serde(default)]
    pub agents: Vec<Vec<Vec<PathBuf>>>,
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One artifact of a resolved plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedArtifact {
    pub path: ArtifactPath,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAgent {
    pub index: usize,
    pub groups: Vec<Vec<PlannedArtifact>>,
}

/// What a manifest would install, with per-path existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlan {
    pub suite: String,
    pub agents: Vec<PlannedAgent>,
    pub missing: usize,
}

impl SuiteManifest {
    /// Parse a manifest whose relative paths are anchored at `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: Self =
            toml::from_str(content).map_err(|e| HarnessError::Manifest(e.to_string()))?;
        if manifest.name.trim().is_empty() {
            return Err(HarnessError::Manifest("name must not be empty".to_string()));
        }
        manifest.network.validate()?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// Load a manifest file and apply harness overrides from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut manifest = Self::from_toml_str(&content, base_dir)?;
        manifest.harness = manifest.harness.apply_env()?;
        Ok(manifest)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve every path against the manifest directory.
    pub fn descriptor(&self) -> Result<InstallDescriptor> {
        let locator = ArtifactLocator::new(&self.base_dir);
        let agents = self
            .agents
            .iter()
            .map(|groups| {
                groups
                    .iter()
                    .map(|paths| {
                        paths
                            .iter()
                            .map(|p| locator.resolve(p))
                            .collect::<Result<Vec<_>>>()
                            .map(AppGroup)
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(AgentSlot)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(InstallDescriptor(agents))
    }

    pub fn plan(&self) -> Result<InstallPlan> {
        let descriptor = self.descriptor()?;
        let mut missing = 0;
        let agents = descriptor
            .agents()
            .iter()
            .enumerate()
            .map(|(index, slot)| PlannedAgent {
                index,
                groups: slot
                    .groups()
                    .iter()
                    .map(|group| {
                        group
                            .paths()
                            .iter()
                            .map(|path| {
                                let exists = path.exists();
                                if !exists {
                                    missing += 1;
                                }
                                PlannedArtifact {
                                    path: path.clone(),
                                    exists,
                                }
                            })
                            .collect()
                    })
                    .collect(),
            })
            .collect();
        Ok(InstallPlan {
            suite: self.name.clone(),
            agents,
            missing,
        })
    }

    /// Orchestrator with a single scenario that installs the descriptor and
    /// checks each agent ended up with one app per declared group.
    pub fn smoke_orchestrator(&self) -> Result<Orchestrator> {
        let descriptor = self.descriptor()?;
        let network_config = self.network.clone();
        let mut orchestrator = Orchestrator::named(self.name.clone(), self.harness.clone());

        orchestrator.register_scenario(format!("install {}", self.name), move |network, t, done| {
            let descriptor = descriptor.clone();
            let config = network_config.clone();
            async move {
                let players = match network.players(config, &descriptor).await {
                    Ok(players) => players,
                    Err(e) => return done.fail(e.to_string()),
                };
                t.equal(players.len(), descriptor.agent_count(), "every agent slot spawned");
                for (player, slot) in players.iter().zip(descriptor.agents()) {
                    t.equal(
                        player.apps().len(),
                        slot.groups().len(),
                        format!("agent {} installed {} app(s)", player.index(), slot.groups().len()),
                    );
                }
                done.done();
            }
        });
        Ok(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
name = "demo"
agents = [
    [["workdir/a.happ", "workdir/b.happ"]],
    [["../shared/a.happ"]],
]

[harness]
mode = "parallel"
"#;

    #[test]
    fn test_parse_and_resolve() {
        let manifest = SuiteManifest::from_toml_str(MANIFEST, "/suite").unwrap();
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.harness.mode, crate::config::ExecutionMode::Parallel);

        let descriptor = manifest.descriptor().unwrap();
        let paths: Vec<String> = descriptor.all_paths().map(|p| p.to_string()).collect();
        assert_eq!(
            paths,
            vec!["/suite/workdir/a.happ", "/suite/workdir/b.happ", "/shared/a.happ"]
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = SuiteManifest::from_toml_str("name = \"  \"\n", "/").unwrap_err();
        assert!(matches!(err, HarnessError::Manifest(_)));
    }

    #[test]
    fn test_plan_counts_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("workdir")).unwrap();
        std::fs::write(dir.path().join("workdir/a.happ"), r#"{"name":"a"}"#).unwrap();

        let manifest = SuiteManifest::from_toml_str(MANIFEST, dir.path()).unwrap();
        let plan = manifest.plan().unwrap();
        assert_eq!(plan.agents.len(), 2);
        assert!(plan.agents[0].groups[0][0].exists);
        assert!(!plan.agents[0].groups[0][1].exists);
        assert_eq!(plan.missing, 2);
    }
}
