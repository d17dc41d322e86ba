//! World and dimension metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::host::Host;

/// Raw per-world data reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorldData {
    pub name: String,
    pub dimension: String,
    pub chunk_count: u64,
    /// Entity type → live count.
    pub entity_counts: BTreeMap<String, u64>,
    pub game_rules: BTreeMap<String, String>,
}

impl WorldData {
    pub fn new(name: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: dimension.into(),
            ..Default::default()
        }
    }

    pub fn total_entities(&self) -> u64 {
        self.entity_counts.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorldInfoSnapshot {
    pub worlds: Vec<WorldData>,
    pub total_entities: u64,
    pub total_chunks: u64,
    /// Entity type → count across every world.
    pub entity_counts: BTreeMap<String, u64>,
}

impl WorldInfoSnapshot {
    pub fn from_worlds(worlds: Vec<WorldData>) -> Self {
        let mut entity_counts: BTreeMap<String, u64> = BTreeMap::new();
        for world in &worlds {
            for (kind, count) in &world.entity_counts {
                *entity_counts.entry(kind.clone()).or_default() += count;
            }
        }
        Self {
            total_entities: entity_counts.values().sum(),
            total_chunks: worlds.iter().map(|w| w.chunk_count).sum(),
            entity_counts,
            worlds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

pub trait WorldInfoProvider: Send + Sync {
    fn poll(&self) -> WorldInfoSnapshot;
}

/// Reads [`Host::worlds`]; a failed query reports no worlds.
pub struct HostWorlds {
    host: Arc<dyn Host>,
}

impl HostWorlds {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }
}

impl WorldInfoProvider for HostWorlds {
    fn poll(&self) -> WorldInfoSnapshot {
        match self.host.worlds() {
            Ok(worlds) => WorldInfoSnapshot::from_worlds(worlds),
            Err(e) => {
                warn!(error = %e, "World query failed, reporting no worlds");
                WorldInfoSnapshot::default()
            }
        }
    }
}
