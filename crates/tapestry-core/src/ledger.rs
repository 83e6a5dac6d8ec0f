//! Shared content ledger for one test network.
//!
//! Every player of a network publishes into the same ledger, so an entry
//! created by one agent is immediately visible to the others. Each network
//! owns its own ledger; scenarios never observe each other's data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Entry type used by [`SharedLedger::anchor`].
pub const ANCHOR_ENTRY_TYPE: &str = "anchor";

/// Content address of a ledger entry (hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryHash(String);

impl EntryHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex chars, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public identity of an agent in a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKey(String);

impl AgentKey {
    /// Derive the key of agent `index` from the network seed.
    pub fn derive(network_seed: &str, index: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(network_seed.as_bytes());
        hasher.update(b":");
        hasher.update(index.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of `{entry_type, content}` as canonical JSON.
///
/// Authorship is not part of the address: equal content from two agents
/// lands on the same hash.
pub fn hash_entry(entry_type: &str, content: &Value) -> EntryHash {
    // serde_json's default map is ordered, so this encoding is canonical.
    let canonical = json!({ "entry_type": entry_type, "content": content }).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    EntryHash(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub hash: EntryHash,
    /// First agent to publish this content.
    pub author: AgentKey,
    pub entry_type: String,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub base: EntryHash,
    pub target: EntryHash,
    pub tag: String,
    pub author: AgentKey,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<EntryHash, LedgerEntry>,
    links: Vec<Link>,
}

/// Cloneable handle to one network's ledger.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<LedgerState>>,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content and return its hash. Re-publishing existing content is
    /// a no-op that returns the same hash.
    pub fn put(&self, author: &AgentKey, entry_type: &str, content: Value) -> EntryHash {
        let hash = hash_entry(entry_type, &content);
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .entry(hash.clone())
            .or_insert_with(|| LedgerEntry {
                hash: hash.clone(),
                author: author.clone(),
                entry_type: entry_type.to_string(),
                content,
            });
        hash
    }

    pub fn get(&self, hash: &EntryHash) -> Option<LedgerEntry> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(hash).cloned()
    }

    /// Anchor entry for `(kind, text)`. Any agent computing the same anchor
    /// gets the same hash.
    pub fn anchor(&self, author: &AgentKey, kind: &str, text: &str) -> EntryHash {
        self.put(
            author,
            ANCHOR_ENTRY_TYPE,
            json!({ "kind": kind, "text": text }),
        )
    }

    pub fn add_link(&self, author: &AgentKey, base: EntryHash, target: EntryHash, tag: &str) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.links.push(Link {
            base,
            target,
            tag: tag.to_string(),
            author: author.clone(),
        });
    }

    /// Links from `base`, optionally filtered by tag, in creation order.
    pub fn links(&self, base: &EntryHash, tag: Option<&str>) -> Vec<Link> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state
            .links
            .iter()
            .filter(|link| &link.base == base)
            .filter(|link| tag.map_or(true, |t| link.tag == t))
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_keys_are_distinct_and_stable() {
        let a0 = AgentKey::derive("seed", 0);
        let a1 = AgentKey::derive("seed", 1);
        assert_ne!(a0, a1);
        assert_eq!(a0, AgentKey::derive("seed", 0));
        assert_ne!(a0, AgentKey::derive("other", 0));
        assert_eq!(a0.as_str().len(), 64);
    }

    #[test]
    fn test_put_is_content_addressed() {
        let ledger = SharedLedger::new();
        let alice = AgentKey::derive("s", 0);
        let bob = AgentKey::derive("s", 1);

        let h1 = ledger.put(&alice, "post", json!({"title": "t"}));
        let h2 = ledger.put(&bob, "post", json!({"title": "t"}));
        assert_eq!(h1, h2);
        assert_eq!(ledger.entry_count(), 1);
        assert_eq!(ledger.get(&h1).unwrap().author, alice);
    }

    #[test]
    fn test_entry_type_is_part_of_hash() {
        assert_ne!(
            hash_entry("post", &json!({"a": 1})),
            hash_entry("book", &json!({"a": 1}))
        );
    }

    #[test]
    fn test_anchor_shared_between_agents() {
        let ledger = SharedLedger::new();
        let a = ledger.anchor(&AgentKey::derive("s", 0), "GAME_CODES", "ABCDE");
        let b = ledger.anchor(&AgentKey::derive("s", 1), "GAME_CODES", "ABCDE");
        assert_eq!(a, b);
        assert_ne!(a, ledger.anchor(&AgentKey::derive("s", 0), "GAME_CODES", "ZZZZZ"));
    }

    #[test]
    fn test_links_filtered_by_tag_in_order() {
        let ledger = SharedLedger::new();
        let author = AgentKey::derive("s", 0);
        let base = ledger.anchor(&author, "k", "base");
        let t1 = ledger.put(&author, "x", json!(1));
        let t2 = ledger.put(&author, "x", json!(2));
        ledger.add_link(&author, base.clone(), t1.clone(), "PLAYER");
        ledger.add_link(&author, base.clone(), t2.clone(), "OTHER");
        ledger.add_link(&author, base.clone(), t2.clone(), "PLAYER");

        let players: Vec<EntryHash> = ledger
            .links(&base, Some("PLAYER"))
            .into_iter()
            .map(|l| l.target)
            .collect();
        assert_eq!(players, vec![t1, t2]);
        assert_eq!(ledger.links(&base, None).len(), 3);
    }
}
