//! Startup and shutdown orchestration.
//!
//! [`LifecycleController`] is the one object a host binding talks to. Enabling
//! probes the host, resolves providers, builds and starts the engine, then
//! wires optional extras (the built-in command override and placeholder
//! integrations). Disabling unwinds whatever was actually wired, in reverse.
//!
//! ```text
//! Uninitialized -> Enabling -> Enabled -> Disabling -> Disabled
//! ```
//!
//! `Disabled` is terminal. Enable and disable are expected to be called from a
//! single thread; command routing may come from any thread.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tickwise_core::CoreConfig;
use tracing::{debug, error, info, warn};

use crate::capability::{CapabilityProber, CapabilitySet, HostProber};
use crate::command::bridge::{CommandBridge, SenderDirectory};
use crate::command::override_cmd::{override_labels, CommandOverrideRegistration, TpsOverride};
use crate::command::sender::{HostSender, NormalizedSender};
use crate::engine::{EngineContext, EngineFactory, ProfilingEngine};
use crate::error::BridgeError;
use crate::host::Host;
use crate::placeholder::{register_integrations, PlaceholderRegistrations};
use crate::providers::thread_dumper::ThreadDumper;
use crate::selector::{ProviderSet, StrategySelector};

/// Engine configuration key that decides whether the built-in command is overridden.
pub const OVERRIDE_TPS_KEY: &str = "overrideTpsCommand";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Enabling,
    Enabled,
    Disabling,
    Disabled,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Enabling => "enabling",
            LifecycleState::Enabled => "enabled",
            LifecycleState::Disabling => "disabling",
            LifecycleState::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// State resolved during enable, shared read-only with everything that needs it.
pub struct BridgeContext {
    pub capabilities: CapabilitySet,
    pub providers: Arc<ProviderSet>,
    pub engine: Arc<dyn ProfilingEngine>,
    pub commands: Arc<CommandBridge>,
    pub senders: SenderDirectory,
}

/// Everything enable has wired so far, torn down in reverse by disable.
#[derive(Default)]
struct Wiring {
    providers: Option<Arc<ProviderSet>>,
    engine: Option<Arc<dyn ProfilingEngine>>,
    commands: Option<Arc<CommandBridge>>,
    command_override: Option<CommandOverrideRegistration>,
    placeholders: Option<PlaceholderRegistrations>,
}

impl Wiring {
    fn teardown(&mut self) {
        if let Some(registration) = self.command_override.take() {
            registration.unregister();
        }
        if let Some(placeholders) = self.placeholders.take() {
            placeholders.unregister_all();
        }
        if let Some(commands) = self.commands.take() {
            commands.deactivate();
        }
        if let Some(engine) = self.engine.take() {
            engine.disable();
            debug!("Profiling engine disabled");
        }
        if let Some(providers) = self.providers.take() {
            providers.close();
        }
    }
}

pub struct LifecycleController {
    host: Arc<dyn Host>,
    config: CoreConfig,
    factory: Box<dyn EngineFactory>,
    prober: Option<Box<dyn CapabilityProber + Send + Sync>>,
    thread_dumper: Option<Arc<dyn ThreadDumper>>,
    state: RwLock<LifecycleState>,
    context: RwLock<Option<Arc<BridgeContext>>>,
    wiring: Mutex<Wiring>,
}

impl LifecycleController {
    pub fn new(host: Arc<dyn Host>, config: CoreConfig, factory: impl EngineFactory + 'static) -> Self {
        Self {
            host,
            config,
            factory: Box::new(factory),
            prober: None,
            thread_dumper: None,
            state: RwLock::new(LifecycleState::Uninitialized),
            context: RwLock::new(None),
            wiring: Mutex::new(Wiring::default()),
        }
    }

    /// Replaces live host probing, e.g. with a fixed [`CapabilitySet`].
    pub fn with_prober(mut self, prober: impl CapabilityProber + Send + Sync + 'static) -> Self {
        self.prober = Some(Box::new(prober));
        self
    }

    pub fn with_thread_dumper(mut self, dumper: Arc<dyn ThreadDumper>) -> Self {
        self.thread_dumper = Some(dumper);
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    pub fn context(&self) -> Option<Arc<BridgeContext>> {
        self.context.read().clone()
    }

    pub fn command_bridge(&self) -> Option<Arc<CommandBridge>> {
        self.context().map(|ctx| ctx.commands.clone())
    }

    fn set_state(&self, state: LifecycleState) {
        debug!(from = %self.state(), to = %state, "Lifecycle transition");
        *self.state.write() = state;
    }

    /// Brings the bridge up. Fails only if the engine cannot be built or
    /// started; in that case everything already wired is torn down and the
    /// bridge ends `Disabled`.
    pub fn enable(&self) -> Result<(), BridgeError> {
        let state = self.state();
        if state != LifecycleState::Uninitialized {
            return Err(BridgeError::InvalidState {
                operation: "enable",
                state,
            });
        }
        self.set_state(LifecycleState::Enabling);
        info!(host = self.host.name(), "Enabling tickwise bridge");

        match self.wire_up() {
            Ok(context) => {
                *self.context.write() = Some(context);
                self.set_state(LifecycleState::Enabled);
                info!("Tickwise bridge enabled");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Enable failed, tearing down partial startup");
                self.wiring.lock().teardown();
                self.set_state(LifecycleState::Disabled);
                Err(e)
            }
        }
    }

    fn wire_up(&self) -> Result<Arc<BridgeContext>, BridgeError> {
        let capabilities = match &self.prober {
            Some(prober) => CapabilitySet::probe_all(prober.as_ref()),
            None => CapabilitySet::probe_all(&HostProber::new(self.host.clone())),
        };
        for (feature, present) in capabilities.iter() {
            info!(%feature, present, "Probed host capability");
        }

        let mut selector = StrategySelector::new(self.host.clone(), &self.config);
        if let Some(dumper) = &self.thread_dumper {
            selector = selector.with_thread_dumper(dumper.clone());
        }
        let providers = Arc::new(selector.resolve(&capabilities));
        self.wiring.lock().providers = Some(providers.clone());

        let senders = SenderDirectory::new(self.host.clone());
        let engine = self
            .factory
            .create(EngineContext {
                host: self.host.clone(),
                capabilities: capabilities.clone(),
                providers: providers.clone(),
                senders: senders.clone(),
            })
            .map_err(|e| BridgeError::EngineConstruction(e.to_string()))?;
        engine
            .enable()
            .map_err(|e| BridgeError::EngineStartup(e.to_string()))?;
        self.wiring.lock().engine = Some(engine.clone());

        let commands = Arc::new(CommandBridge::new(engine.clone()));
        self.wiring.lock().commands = Some(commands.clone());

        self.register_command_override(&engine);

        let placeholders = register_integrations(&self.host, &engine, &self.config.integrations.placeholder_plugins);
        self.wiring.lock().placeholders = Some(placeholders);

        Ok(Arc::new(BridgeContext {
            capabilities,
            providers,
            engine,
            commands,
            senders,
        }))
    }

    fn register_command_override(&self, engine: &Arc<dyn ProfilingEngine>) {
        let commands = &self.config.commands;
        if !engine
            .configuration()
            .get_boolean(OVERRIDE_TPS_KEY, commands.override_tps_command)
        {
            debug!("Built-in command override disabled by configuration");
            return;
        }

        let executor = Arc::new(TpsOverride::new(
            engine.clone(),
            commands.tps_permissions.clone(),
            self.config.messages.clone(),
        ));
        match CommandOverrideRegistration::register(self.host.command_map(), &override_labels(commands), executor) {
            Ok(registration) => self.wiring.lock().command_override = Some(registration),
            Err(e) => warn!(error = %e, "Could not override built-in command, continuing without it"),
        }
    }

    /// Tears down whatever enable wired. Safe to call in any state; calls
    /// after the first are no-ops.
    pub fn disable(&self) {
        match self.state() {
            LifecycleState::Disabled => {
                debug!("Disable requested on an already disabled bridge");
                return;
            }
            LifecycleState::Disabling => return,
            _ => {}
        }
        self.set_state(LifecycleState::Disabling);
        info!("Disabling tickwise bridge");

        self.context.write().take();
        self.wiring.lock().teardown();

        self.set_state(LifecycleState::Disabled);
        info!("Tickwise bridge disabled");
    }

    /// Host entry point for commands. Always reports the command handled;
    /// before enable completes it is acknowledged but not forwarded.
    pub fn on_command(&self, sender: Arc<dyn HostSender>, label: &str, args: &[String]) -> bool {
        match self.command_bridge() {
            Some(bridge) => bridge.on_command(sender, label, args),
            None => {
                info!(label, state = %self.state(), "Command received while the bridge is not enabled");
                true
            }
        }
    }

    pub fn on_tab_complete(&self, sender: Arc<dyn HostSender>, label: &str, args: &[String]) -> Vec<String> {
        match self.command_bridge() {
            Some(bridge) => bridge.on_tab_complete(sender, label, args),
            None => Vec::new(),
        }
    }

    /// Every connected client plus the console, recomputed on each call.
    pub fn command_senders(&self) -> impl Iterator<Item = NormalizedSender> + Send + 'static {
        SenderDirectory::new(self.host.clone()).senders()
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if matches!(self.state(), LifecycleState::Enabled | LifecycleState::Enabling) {
            warn!("Lifecycle controller dropped while enabled, disabling");
            self.disable();
        }
    }
}
