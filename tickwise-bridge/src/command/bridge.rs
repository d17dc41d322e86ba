//! Routing of host command events into the engine.

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::sender::{HostSender, NormalizedSender};
use crate::engine::ProfilingEngine;
use crate::host::Host;
use crate::in_flight::InFlight;

/// Enumerates every sender that can currently reach the engine.
#[derive(Clone)]
pub struct SenderDirectory {
    host: Arc<dyn Host>,
}

impl SenderDirectory {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Connected clients followed by the console.
    ///
    /// The host is not queried until the iterator is first advanced, and every
    /// call starts from a fresh query, so clients that joined or left since the
    /// last call are reflected.
    pub fn senders(&self) -> impl Iterator<Item = NormalizedSender> + Send + 'static {
        let players_host = self.host.clone();
        let console_host = self.host.clone();
        iter::once_with(move || players_host.online_players())
            .flatten()
            .chain(iter::once_with(move || console_host.console_sender()))
            .map(NormalizedSender::new)
    }
}

/// Forwards commands and completions to the engine once the bridge is enabled.
///
/// Deactivation waits for forwarded calls still running on other threads, so
/// the engine is never handed a command after its teardown has begun.
pub struct CommandBridge {
    engine: Arc<dyn ProfilingEngine>,
    active: AtomicBool,
    in_flight: InFlight,
}

impl CommandBridge {
    pub fn new(engine: Arc<dyn ProfilingEngine>) -> Self {
        Self {
            engine,
            active: AtomicBool::new(true),
            in_flight: InFlight::new(),
        }
    }

    /// Always reports the command as handled; subcommands are the engine's business.
    pub fn on_command(&self, sender: Arc<dyn HostSender>, label: &str, args: &[String]) -> bool {
        let _call = self.in_flight.enter();
        if !self.is_active() {
            debug!(label, "Dropping command received after deactivation");
            return true;
        }
        let sender = NormalizedSender::new(sender);
        self.engine.execute_command(&sender, args);
        true
    }

    /// Returns the engine's completions unmodified.
    pub fn on_tab_complete(&self, sender: Arc<dyn HostSender>, _label: &str, args: &[String]) -> Vec<String> {
        let _call = self.in_flight.enter();
        if !self.is_active() {
            return Vec::new();
        }
        let sender = NormalizedSender::new(sender);
        self.engine.tab_complete_command(&sender, args)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stops forwarding, then waits for forwarded calls on other threads to return.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.in_flight.wait_idle();
    }
}
