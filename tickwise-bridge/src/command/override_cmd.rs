//! Interception of the host's built-in tick-rate command.
//!
//! [`CommandOverrideRegistration`] swaps our executor into the host command
//! table and remembers what it displaced, so that unregistering puts the table
//! back exactly as it was. [`TpsOverride`] is the executor that gets swapped in.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tickwise_core::config::{CommandsConfig, MessagesConfig};
use tracing::{debug, info, warn};

use super::sender::{ElevatedSender, HostSender};
use crate::engine::ProfilingEngine;
use crate::error::HostError;

/// A handler in the host command table.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, sender: Arc<dyn HostSender>, label: &str, args: &[String]) -> bool;
}

/// The host's label → executor table.
pub trait CommandMap: Send + Sync {
    fn get(&self, label: &str) -> Option<Arc<dyn CommandExecutor>>;

    /// Installs `executor` and returns whatever it displaced.
    fn insert(
        &self,
        label: &str,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Option<Arc<dyn CommandExecutor>>, HostError>;

    fn remove(&self, label: &str) -> Option<Arc<dyn CommandExecutor>>;
}

fn same_executor(a: &Arc<dyn CommandExecutor>, b: &Arc<dyn CommandExecutor>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Labels under which the override is installed: the bare label and its
/// namespaced alias.
pub fn override_labels(config: &CommandsConfig) -> Vec<String> {
    vec![
        config.override_label.clone(),
        format!("{}:{}", config.namespace, config.override_label),
    ]
}

/// Replacement for the host's tick-rate command.
///
/// Checks that the sender holds at least one of the configured permissions,
/// then forwards the fixed invocation `["tps"]` to the engine through an
/// [`ElevatedSender`]. Arguments typed by the user are ignored.
pub struct TpsOverride {
    engine: Arc<dyn ProfilingEngine>,
    permissions: Vec<String>,
    messages: MessagesConfig,
}

impl TpsOverride {
    pub fn new(engine: Arc<dyn ProfilingEngine>, permissions: Vec<String>, messages: MessagesConfig) -> Self {
        Self {
            engine,
            permissions,
            messages,
        }
    }

    fn is_permitted(&self, sender: &dyn HostSender) -> bool {
        self.permissions.iter().any(|p| sender.has_permission(p))
    }
}

impl CommandExecutor for TpsOverride {
    fn execute(&self, sender: Arc<dyn HostSender>, label: &str, _args: &[String]) -> bool {
        if !self.is_permitted(sender.as_ref()) {
            let locale = sender.locale();
            sender.send_message(self.messages.no_permission_for(locale.as_deref()));
            debug!(sender = %sender.name(), label, "Denied built-in command override");
            return true;
        }

        let elevated = ElevatedSender::new(sender);
        self.engine.execute_command(&elevated, &["tps".to_string()]);
        true
    }
}

/// Record of an installed command override.
///
/// Registration either installs every label or, on the first failure, rolls
/// back the ones already installed. [`unregister`](Self::unregister) is
/// idempotent and also runs on drop.
pub struct CommandOverrideRegistration {
    map: Arc<dyn CommandMap>,
    executor: Arc<dyn CommandExecutor>,
    // (label, displaced executor), in installation order
    entries: Mutex<Vec<(String, Option<Arc<dyn CommandExecutor>>)>>,
}

impl CommandOverrideRegistration {
    pub fn register(
        map: Arc<dyn CommandMap>,
        labels: &[String],
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, HostError> {
        let registration = Self {
            map,
            executor,
            entries: Mutex::new(Vec::with_capacity(labels.len())),
        };

        for label in labels {
            match registration.map.insert(label, registration.executor.clone()) {
                Ok(previous) => {
                    debug!(label = %label, displaced = previous.is_some(), "Installed command override");
                    registration.entries.lock().push((label.clone(), previous));
                }
                Err(e) => {
                    warn!(label = %label, error = %e, "Command override failed, rolling back");
                    registration.unregister();
                    return Err(e);
                }
            }
        }

        info!(labels = ?labels, "Overrode built-in command");
        Ok(registration)
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn is_registered(&self) -> bool {
        !self.entries.lock().is_empty()
    }

    /// Restores every displaced executor, touching only labels that still
    /// point at our executor.
    pub fn unregister(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for (label, previous) in entries.into_iter().rev() {
            let still_ours = self
                .map
                .get(&label)
                .map_or(false, |current| same_executor(&current, &self.executor));
            if !still_ours {
                debug!(label = %label, "Command override was replaced by someone else, leaving it");
                continue;
            }
            match previous {
                Some(previous) => {
                    if let Err(e) = self.map.insert(&label, previous) {
                        warn!(label = %label, error = %e, "Could not restore displaced command, removing override");
                        self.map.remove(&label);
                    }
                }
                None => {
                    self.map.remove(&label);
                }
            }
            debug!(label = %label, "Removed command override");
        }
    }
}

impl fmt::Debug for CommandOverrideRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOverrideRegistration")
            .field("labels", &self.labels())
            .finish()
    }
}

impl Drop for CommandOverrideRegistration {
    fn drop(&mut self) {
        self.unregister();
    }
}
