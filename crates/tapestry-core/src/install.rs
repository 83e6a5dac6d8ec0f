//! Installation descriptors: which agents install which bundles.
//!
//! A descriptor is a literal nested sequence, agents -> app groups ->
//! artifact paths. Order is significant: the `i`-th slot becomes player `i`
//! in the network and its groups are installed in declaration order.
//! Nothing is validated here; bad paths fail at installation.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactPath;

/// Bundles installed together as one app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppGroup(pub Vec<ArtifactPath>);

/// Everything one agent installs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentSlot(pub Vec<AppGroup>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallDescriptor(pub Vec<AgentSlot>);

impl AppGroup {
    pub fn paths(&self) -> &[ArtifactPath] {
        &self.0
    }
}

impl AgentSlot {
    pub fn groups(&self) -> &[AppGroup] {
        &self.0
    }
}

impl InstallDescriptor {
    /// `agents` slots that all install the same groups.
    pub fn uniform(agents: usize, groups: Vec<AppGroup>) -> Self {
        Self(vec![AgentSlot(groups); agents])
    }

    /// Append one agent slot.
    pub fn with_agent(mut self, slot: AgentSlot) -> Self {
        self.0.push(slot);
        self
    }

    pub fn agents(&self) -> &[AgentSlot] {
        &self.0
    }

    pub fn agent_count(&self) -> usize {
        self.0.len()
    }

    /// Every path in declaration order, duplicates included.
    pub fn all_paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.0
            .iter()
            .flat_map(|slot| slot.0.iter())
            .flat_map(|group| group.0.iter())
    }
}

impl From<Vec<ArtifactPath>> for AppGroup {
    fn from(paths: Vec<ArtifactPath>) -> Self {
        Self(paths)
    }
}

impl From<Vec<Vec<ArtifactPath>>> for AgentSlot {
    fn from(groups: Vec<Vec<ArtifactPath>>) -> Self {
        Self(groups.into_iter().map(AppGroup::from).collect())
    }
}

impl From<Vec<Vec<Vec<ArtifactPath>>>> for InstallDescriptor {
    fn from(agents: Vec<Vec<Vec<ArtifactPath>>>) -> Self {
        Self(agents.into_iter().map(AgentSlot::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ArtifactPath {
        ArtifactPath::new(s)
    }

    #[test]
    fn test_nested_literal_preserves_order() {
        let descriptor = InstallDescriptor::from(vec![
            vec![vec![p("/a.happ"), p("/b.happ")]],
            vec![vec![p("/c.happ")], vec![p("/a.happ")]],
        ]);
        assert_eq!(descriptor.agent_count(), 2);
        let paths: Vec<String> = descriptor.all_paths().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["/a.happ", "/b.happ", "/c.happ", "/a.happ"]);
        assert_eq!(descriptor.agents()[1].groups()[1].paths()[0], p("/a.happ"));
    }

    #[test]
    fn test_uniform_allows_shared_paths() {
        let descriptor = InstallDescriptor::uniform(3, vec![AppGroup(vec![p("/x.happ")])]);
        assert_eq!(descriptor.agent_count(), 3);
        assert!(descriptor.all_paths().all(|path| *path == p("/x.happ")));
    }

    #[test]
    fn test_with_agent_appends() {
        let descriptor = InstallDescriptor::default()
            .with_agent(AgentSlot::from(vec![vec![p("/1.happ")]]))
            .with_agent(AgentSlot::from(vec![vec![p("/2.happ")]]));
        let paths: Vec<String> = descriptor.all_paths().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["/1.happ", "/2.happ"]);
    }

    #[test]
    fn test_serde_is_plain_nested_arrays() {
        let descriptor = InstallDescriptor::from(vec![vec![vec![p("/a.happ")]]]);
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"[[["/a.happ"]]]"#);
    }
}
