//! Bundle locations and player spawning shared by the suites.

use tapestry_core::{
    module_dir, AgentSlot, AppGroup, ArtifactLocator, ArtifactPath, InstallDescriptor, Network,
    NetworkConfig, Player, Result,
};

/// Bundle offsets, relative to this source file.
pub const SESSION3_HAPP: &str = "../workdir/session3.happ";
pub const TRAGEDY_COMMONS_HAPP: &str = "../workdir/tragedy-commons.happ";

pub fn locator() -> ArtifactLocator {
    ArtifactLocator::new(module_dir!())
}

pub fn artifact(offset: &str) -> Result<ArtifactPath> {
    locator().resolve(offset)
}

/// `agents` players that each install the bundle at `offset` as one app.
pub fn uniform(offset: &str, agents: usize) -> Result<InstallDescriptor> {
    Ok(InstallDescriptor::uniform(
        agents,
        vec![AppGroup(vec![artifact(offset)?])],
    ))
}

/// One player per offset, each installing that bundle as a single app.
pub fn per_agent(offsets: &[&str]) -> Result<InstallDescriptor> {
    offsets
        .iter()
        .try_fold(InstallDescriptor::default(), |descriptor, offset| {
            Ok(descriptor.with_agent(AgentSlot(vec![AppGroup(vec![artifact(offset)?])])))
        })
}

pub async fn spawn(network: &Network, descriptor: InstallDescriptor) -> Result<Vec<Player>> {
    network.players(NetworkConfig::gen(), &descriptor).await
}
