//! Per-client latency.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::host::{Host, PingApi};

pub trait PlayerPingProvider: Send + Sync {
    /// Latency in milliseconds keyed by client name. Clients whose latency
    /// cannot be read are omitted.
    fn poll(&self) -> BTreeMap<String, u32>;
}

/// Queries the host's native latency API for every connected client.
pub struct NativePingProvider {
    host: Arc<dyn Host>,
    api: Arc<dyn PingApi>,
}

impl NativePingProvider {
    pub fn new(host: Arc<dyn Host>, api: Arc<dyn PingApi>) -> Self {
        Self { host, api }
    }
}

impl PlayerPingProvider for NativePingProvider {
    fn poll(&self) -> BTreeMap<String, u32> {
        let mut result = BTreeMap::new();
        for player in self.host.online_players() {
            let name = player.name();
            match self.api.latency_ms(&name) {
                Ok(Some(ms)) => {
                    result.insert(name, ms);
                }
                Ok(None) => {}
                Err(e) => debug!(player = %name, error = %e, "Latency query failed"),
            }
        }
        result
    }
}
