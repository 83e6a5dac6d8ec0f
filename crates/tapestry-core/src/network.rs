//! Live test network handed to each scenario.
//!
//! A [`Network`] is created fresh for every scenario. Calling
//! [`Network::players`] spins up agents from a configuration seed and an
//! installation descriptor; every call adds players to the same network, so
//! all of a scenario's agents share one ledger.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::bundle::Bundle;
use crate::config::NetworkConfig;
use crate::error::{HarnessError, Result};
use crate::install::InstallDescriptor;
use crate::ledger::{AgentKey, EntryHash, LedgerEntry, Link, SharedLedger};
use crate::metrics::METRICS;
use crate::obs;

/// One app group as installed for a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApp {
    pub app_id: String,
    pub bundles: Vec<Bundle>,
}

impl InstalledApp {
    pub fn has_zome(&self, zome: &str) -> bool {
        self.bundles.iter().any(|b| b.manifest.has_zome(zome))
    }

    pub fn declares_entry_type(&self, entry_type: &str) -> bool {
        self.bundles
            .iter()
            .any(|b| b.manifest.declares_entry_type(entry_type))
    }
}

/// An agent in the network together with its installed apps.
#[derive(Debug, Clone)]
pub struct Player {
    index: usize,
    conductor: usize,
    key: AgentKey,
    apps: Arc<Vec<InstalledApp>>,
    ledger: SharedLedger,
}

impl Player {
    /// Position in the network, in spawn order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Conductor hosting this agent.
    pub fn conductor(&self) -> usize {
        self.conductor
    }

    pub fn key(&self) -> &AgentKey {
        &self.key
    }

    pub fn apps(&self) -> &[InstalledApp] {
        &self.apps
    }

    pub fn app(&self, app_id: &str) -> Option<&InstalledApp> {
        self.apps.iter().find(|app| app.app_id == app_id)
    }

    pub fn has_zome(&self, zome: &str) -> bool {
        self.apps.iter().any(|app| app.has_zome(zome))
    }

    /// Publish an entry. The entry type must be declared by one of this
    /// player's installed DNAs.
    pub fn create_entry<T: Serialize>(&self, entry_type: &str, content: &T) -> Result<EntryHash> {
        if !self.apps.iter().any(|app| app.declares_entry_type(entry_type)) {
            return Err(HarnessError::UnknownEntryType {
                agent: self.key.to_string(),
                entry_type: entry_type.to_string(),
            });
        }
        let content = serde_json::to_value(content)?;
        let hash = self.ledger.put(&self.key, entry_type, content);
        tracing::debug!(agent = %self.key.short(), entry_type, hash = %hash.short(), "entry created");
        Ok(hash)
    }

    pub fn get(&self, hash: &EntryHash) -> Option<LedgerEntry> {
        self.ledger.get(hash)
    }

    /// Fetch an entry and decode its content.
    pub fn get_as<T: DeserializeOwned>(&self, hash: &EntryHash) -> Result<T> {
        let entry = self
            .ledger
            .get(hash)
            .ok_or_else(|| HarnessError::EntryNotFound(hash.to_string()))?;
        Ok(serde_json::from_value::<T>(entry.content)?)
    }

    /// Anchor `(kind, text)`; the same pair yields the same hash for every agent.
    pub fn anchor(&self, kind: &str, text: &str) -> EntryHash {
        self.ledger.anchor(&self.key, kind, text)
    }

    pub fn create_link(&self, base: &EntryHash, target: &EntryHash, tag: &str) -> Result<()> {
        for hash in [base, target] {
            if self.ledger.get(hash).is_none() {
                return Err(HarnessError::EntryNotFound(hash.to_string()));
            }
        }
        self.ledger
            .add_link(&self.key, base.clone(), target.clone(), tag);
        Ok(())
    }

    pub fn get_links(&self, base: &EntryHash, tag: Option<&str>) -> Vec<Link> {
        self.ledger.links(base, tag)
    }

    /// Decode every entry linked from `base` under `tag`.
    pub fn get_linked<T: DeserializeOwned>(&self, base: &EntryHash, tag: &str) -> Result<Vec<T>> {
        self.get_links(base, Some(tag))
            .iter()
            .map(|link| self.get_as::<T>(&link.target))
            .collect()
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    seed: Option<String>,
    reserved: usize,
    players: Vec<Player>,
}

#[derive(Debug)]
struct NetworkInner {
    scenario: String,
    ledger: SharedLedger,
    state: Mutex<NetworkState>,
}

/// Cloneable handle to one scenario's network.
#[derive(Debug, Clone)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

impl Network {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                scenario: scenario.into(),
                ledger: SharedLedger::new(),
                state: Mutex::new(NetworkState::default()),
            }),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.inner.scenario
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.inner.ledger
    }

    /// Identity seed, fixed by the first `players` call.
    pub fn seed(&self) -> Option<String> {
        self.lock().seed.clone()
    }

    /// Every player spawned so far, in spawn order.
    pub fn all_players(&self) -> Vec<Player> {
        self.lock().players.clone()
    }

    /// Spawn one player per agent slot and install its app groups in order.
    ///
    /// Bundles are read here, so a missing artifact surfaces as
    /// [`HarnessError::ArtifactMissing`] from this call. A failed call
    /// leaves the network as it was: no seed is fixed and no agent index or
    /// `max_agents` budget is consumed.
    pub async fn players(
        &self,
        config: NetworkConfig,
        descriptor: &InstallDescriptor,
    ) -> Result<Vec<Player>> {
        config.validate()?;
        {
            let state = self.lock();
            resolve_seed(&state, &config)?;
            check_budget(&state, &config, descriptor.agent_count())?;
        }

        let mut slots = Vec::with_capacity(descriptor.agent_count());
        for slot in descriptor.agents() {
            let mut apps: Vec<InstalledApp> = Vec::with_capacity(slot.groups().len());
            for (group_index, group) in slot.groups().iter().enumerate() {
                let mut bundles = Vec::with_capacity(group.paths().len());
                for path in group.paths() {
                    bundles.push(Bundle::load_async(path).await?);
                }
                let app_id = app_id_for(&apps, group_index, &bundles);
                apps.push(InstalledApp { app_id, bundles });
            }
            slots.push(apps);
        }

        // Another call may have spawned agents while bundles were loading.
        let (seed, spawned, total) = {
            let mut state = self.lock();
            let seed = resolve_seed(&state, &config)?;
            check_budget(&state, &config, slots.len())?;
            let start = state.reserved;
            state.seed = Some(seed.clone());
            state.reserved += slots.len();

            let spawned: Vec<Player> = slots
                .into_iter()
                .enumerate()
                .map(|(offset, apps)| {
                    let index = start + offset;
                    Player {
                        index,
                        conductor: index / config.agents_per_conductor,
                        key: AgentKey::derive(&seed, index),
                        apps: Arc::new(apps),
                        ledger: self.inner.ledger.clone(),
                    }
                })
                .collect();
            state.players.extend(spawned.iter().cloned());
            state.players.sort_by_key(|p| p.index);
            (seed, spawned, state.players.len())
        };

        for player in &spawned {
            for bundle in player.apps.iter().flat_map(|app| app.bundles.iter()) {
                METRICS.inc_bundles_installed();
                obs::emit_bundle_installed(player.key.short(), &bundle.manifest.name, &bundle.digest);
            }
        }
        obs::emit_network_spawned(&self.inner.scenario, &seed, spawned.len(), total);
        Ok(spawned)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Name an app after its first bundle, falling back to `app-{index}` and
/// disambiguating repeats within one agent.
fn resolve_seed(state: &NetworkState, config: &NetworkConfig) -> Result<String> {
    match (&state.seed, &config.network_seed) {
        (Some(current), Some(requested)) if current != requested => Err(HarnessError::Config(
            format!("network already seeded with {current}, cannot reseed with {requested}"),
        )),
        (Some(current), _) => Ok(current.clone()),
        (None, Some(requested)) => Ok(requested.clone()),
        (None, None) => Ok(Uuid::new_v4().to_string()),
    }
}

fn check_budget(state: &NetworkState, config: &NetworkConfig, requested: usize) -> Result<()> {
    let total = state.reserved + requested;
    if total > config.max_agents {
        return Err(HarnessError::Config(format!(
            "{total} agents requested, network allows {}",
            config.max_agents
        )));
    }
    Ok(())
}

fn app_id_for(existing: &[InstalledApp], group_index: usize, bundles: &[Bundle]) -> String {
    let base = bundles
        .first()
        .map(|b| b.manifest.name.clone())
        .unwrap_or_else(|| format!("app-{group_index}"));
    if existing.iter().any(|app| app.app_id == base) {
        format!("{base}-{group_index}")
    } else {
        base
    }
}
