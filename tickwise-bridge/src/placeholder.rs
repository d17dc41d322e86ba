//! Text-substitution integrations.
//!
//! Third-party placeholder plugins are detected by name. For each one the host
//! reports as enabled, a resolver forwarding to the engine is registered.
//! These integrations are optional: a failed registration is logged and
//! skipped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::command::sender::{CommandSender, HostSender, NormalizedSender};
use crate::engine::ProfilingEngine;
use crate::host::Host;

pub trait PlaceholderResolver: Send + Sync {
    fn resolve(&self, key: &str, sender: Option<Arc<dyn HostSender>>) -> Option<String>;
}

/// Resolver that hands every lookup to the engine.
pub struct EnginePlaceholders {
    engine: Arc<dyn ProfilingEngine>,
}

impl EnginePlaceholders {
    pub fn new(engine: Arc<dyn ProfilingEngine>) -> Self {
        Self { engine }
    }
}

impl PlaceholderResolver for EnginePlaceholders {
    fn resolve(&self, key: &str, sender: Option<Arc<dyn HostSender>>) -> Option<String> {
        let sender = sender.map(NormalizedSender::new);
        self.engine
            .resolve_placeholder(key, sender.as_ref().map(|s| s as &dyn CommandSender))
    }
}

/// Integrations registered at enable, unregistered together at disable.
pub struct PlaceholderRegistrations {
    host: Arc<dyn Host>,
    registered: Mutex<Vec<String>>,
}

impl PlaceholderRegistrations {
    pub fn names(&self) -> Vec<String> {
        self.registered.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.lock().is_empty()
    }

    /// Idempotent.
    pub fn unregister_all(&self) {
        let names = std::mem::take(&mut *self.registered.lock());
        for name in names.into_iter().rev() {
            self.host.unregister_placeholders(&name);
            debug!(integration = %name, "Unregistered placeholder integration");
        }
    }
}

pub fn register_integrations(
    host: &Arc<dyn Host>,
    engine: &Arc<dyn ProfilingEngine>,
    names: &[String],
) -> PlaceholderRegistrations {
    let mut registered = Vec::new();

    for name in names {
        if !host.is_plugin_enabled(name) {
            debug!(integration = %name, "Placeholder integration not present");
            continue;
        }

        let resolver: Arc<dyn PlaceholderResolver> = Arc::new(EnginePlaceholders::new(engine.clone()));
        match catch_unwind(AssertUnwindSafe(|| host.register_placeholders(name, resolver))) {
            Ok(Ok(())) => {
                info!(integration = %name, "Registered placeholder integration");
                registered.push(name.clone());
            }
            Ok(Err(e)) => warn!(integration = %name, error = %e, "Placeholder integration failed to register"),
            Err(_) => warn!(integration = %name, "Placeholder integration panicked during registration"),
        }
    }

    PlaceholderRegistrations {
        host: host.clone(),
        registered: Mutex::new(registered),
    }
}
