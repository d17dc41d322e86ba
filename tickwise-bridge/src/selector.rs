//! Strategy selection.
//!
//! Given the capability flags probed at startup, [`StrategySelector`] picks the
//! richest available strategy for every provider contract and assembles the
//! [`ProviderSet`] the engine is built with. The same flags always produce the
//! same choices; contracts with no usable strategy resolve to
//! [`Resolved::Absent`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tickwise_core::CoreConfig;
use tracing::{error, info, warn};

use crate::capability::{CapabilitySet, HostFeature};
use crate::host::Host;
use crate::providers::class_source::{ClassSourceLookup, ModuleIndexLookup, NoopLookup};
use crate::providers::platform_info::PlatformInfo;
use crate::providers::player_ping::{NativePingProvider, PlayerPingProvider};
use crate::providers::server_config::{HostConfigFiles, ServerConfigProvider};
use crate::providers::thread_dumper::{SpecificThreads, ThreadDumper};
use crate::providers::tick_hook::{NativeEventTickHook, SchedulerTickHook, TickHook};
use crate::providers::tick_reporter::{NativeTickReporter, TickReporter};
use crate::providers::world_info::{HostWorlds, WorldInfoProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderContract {
    TickHook,
    TickReporter,
    ThreadDumper,
    ClassSourceLookup,
    ServerConfigProvider,
    WorldInfoProvider,
    PlayerPingProvider,
    PlatformInfo,
}

impl ProviderContract {
    pub const ALL: [ProviderContract; 8] = [
        ProviderContract::TickHook,
        ProviderContract::TickReporter,
        ProviderContract::ThreadDumper,
        ProviderContract::ClassSourceLookup,
        ProviderContract::ServerConfigProvider,
        ProviderContract::WorldInfoProvider,
        ProviderContract::PlayerPingProvider,
        ProviderContract::PlatformInfo,
    ];
}

impl fmt::Display for ProviderContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderContract::TickHook => "tick hook",
            ProviderContract::TickReporter => "tick reporter",
            ProviderContract::ThreadDumper => "thread dumper",
            ProviderContract::ClassSourceLookup => "class source lookup",
            ProviderContract::ServerConfigProvider => "server config provider",
            ProviderContract::WorldInfoProvider => "world info provider",
            ProviderContract::PlayerPingProvider => "player ping provider",
            ProviderContract::PlatformInfo => "platform info",
        };
        f.write_str(name)
    }
}

/// Concrete implementation chosen for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    NativeTickEvents,
    SchedulerPolling,
    NativePingApi,
    GameThread,
    ConfiguredThreads,
    ModuleIndex,
    Unattributed,
    HostConfigFiles,
    HostWorlds,
    HostPlatform,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::NativeTickEvents => "native tick events",
            Strategy::SchedulerPolling => "scheduler polling",
            Strategy::NativePingApi => "native ping API",
            Strategy::GameThread => "game thread",
            Strategy::ConfiguredThreads => "configured threads",
            Strategy::ModuleIndex => "loaded module index",
            Strategy::Unattributed => "unattributed lookup",
            Strategy::HostConfigFiles => "host config files",
            Strategy::HostWorlds => "host worlds",
            Strategy::HostPlatform => "host platform",
        };
        f.write_str(name)
    }
}

/// A provider that was either resolved to a strategy or is explicitly absent.
pub enum Resolved<T> {
    Present { strategy: Strategy, provider: T },
    Absent,
}

impl<T> Resolved<T> {
    pub fn present(strategy: Strategy, provider: T) -> Self {
        Resolved::Present { strategy, provider }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Resolved::Present { .. })
    }

    pub fn is_absent(&self) -> bool {
        !self.is_present()
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Resolved::Present { strategy, .. } => Some(*strategy),
            Resolved::Absent => None,
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Resolved::Present { provider, .. } => Some(provider),
            Resolved::Absent => None,
        }
    }
}

impl<T> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Present { strategy, .. } => write!(f, "Present({:?})", strategy),
            Resolved::Absent => f.write_str("Absent"),
        }
    }
}

/// Every provider the engine may use, resolved once at startup and
/// read-only afterwards.
pub struct ProviderSet {
    tick_hook: Resolved<Arc<dyn TickHook>>,
    tick_reporter: Resolved<Arc<dyn TickReporter>>,
    thread_dumper: Arc<dyn ThreadDumper>,
    class_source_lookup: Arc<dyn ClassSourceLookup>,
    server_config: Arc<dyn ServerConfigProvider>,
    world_info: Arc<dyn WorldInfoProvider>,
    player_ping: Resolved<Arc<dyn PlayerPingProvider>>,
    platform_info: PlatformInfo,
    strategies: BTreeMap<ProviderContract, Strategy>,
}

impl ProviderSet {
    pub fn tick_hook(&self) -> &Resolved<Arc<dyn TickHook>> {
        &self.tick_hook
    }

    pub fn tick_reporter(&self) -> &Resolved<Arc<dyn TickReporter>> {
        &self.tick_reporter
    }

    pub fn thread_dumper(&self) -> &Arc<dyn ThreadDumper> {
        &self.thread_dumper
    }

    pub fn class_source_lookup(&self) -> &Arc<dyn ClassSourceLookup> {
        &self.class_source_lookup
    }

    pub fn server_config(&self) -> &Arc<dyn ServerConfigProvider> {
        &self.server_config
    }

    pub fn world_info(&self) -> &Arc<dyn WorldInfoProvider> {
        &self.world_info
    }

    pub fn player_ping(&self) -> &Resolved<Arc<dyn PlayerPingProvider>> {
        &self.player_ping
    }

    pub fn platform_info(&self) -> &PlatformInfo {
        &self.platform_info
    }

    /// Strategy chosen for `contract`, `None` if it resolved to absent.
    pub fn strategy_of(&self, contract: ProviderContract) -> Option<Strategy> {
        self.strategies.get(&contract).copied()
    }

    /// Detaches the tick strategies from the host. Idempotent.
    pub fn close(&self) {
        if let Some(hook) = self.tick_hook.get() {
            hook.close();
        }
        if let Some(reporter) = self.tick_reporter.get() {
            reporter.close();
        }
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("strategies", &self.strategies)
            .field("platform_info", &self.platform_info)
            .finish()
    }
}

pub struct StrategySelector {
    host: Arc<dyn Host>,
    hidden_paths: Vec<String>,
    thread_dumper: Option<Arc<dyn ThreadDumper>>,
}

impl StrategySelector {
    pub fn new(host: Arc<dyn Host>, config: &CoreConfig) -> Self {
        Self {
            host,
            hidden_paths: config.server_config.hidden_paths.clone(),
            thread_dumper: None,
        }
    }

    /// Replaces the default game-thread dumper.
    pub fn with_thread_dumper(mut self, dumper: Arc<dyn ThreadDumper>) -> Self {
        self.thread_dumper = Some(dumper);
        self
    }

    /// Resolves every contract. Must run on the thread that drives ticks when
    /// the host cannot name that thread itself.
    pub fn resolve(&self, capabilities: &CapabilitySet) -> ProviderSet {
        let tick_hook = self.select_tick_hook(capabilities);
        let tick_reporter = self.select_tick_reporter(capabilities);
        let player_ping = self.select_player_ping(capabilities);
        let (class_source_lookup, class_source_strategy) = self.select_class_source();

        let (thread_dumper, dumper_strategy) = match &self.thread_dumper {
            Some(dumper) => (dumper.clone(), Strategy::ConfiguredThreads),
            None => {
                let id = self.host.tick_thread().unwrap_or_else(|| thread::current().id());
                let dumper: Arc<dyn ThreadDumper> = Arc::new(SpecificThreads::for_thread(id));
                (dumper, Strategy::GameThread)
            }
        };

        let mut strategies = BTreeMap::new();
        let optional = [
            (ProviderContract::TickHook, tick_hook.strategy()),
            (ProviderContract::TickReporter, tick_reporter.strategy()),
            (ProviderContract::PlayerPingProvider, player_ping.strategy()),
        ];
        let always = [
            (ProviderContract::ThreadDumper, dumper_strategy),
            (ProviderContract::ClassSourceLookup, class_source_strategy),
            (ProviderContract::ServerConfigProvider, Strategy::HostConfigFiles),
            (ProviderContract::WorldInfoProvider, Strategy::HostWorlds),
            (ProviderContract::PlatformInfo, Strategy::HostPlatform),
        ];
        for (contract, strategy) in optional
            .into_iter()
            .chain(always.into_iter().map(|(c, s)| (c, Some(s))))
        {
            match strategy {
                Some(strategy) => {
                    info!(%contract, %strategy, "Using {} for {}", strategy, contract);
                    strategies.insert(contract, strategy);
                }
                None => info!(%contract, "No {} available on this host", contract),
            }
        }

        ProviderSet {
            tick_hook,
            tick_reporter,
            thread_dumper,
            class_source_lookup,
            server_config: Arc::new(HostConfigFiles::new(self.host.clone(), &self.hidden_paths)),
            world_info: Arc::new(HostWorlds::new(self.host.clone())),
            player_ping,
            platform_info: self.host.platform(),
            strategies,
        }
    }

    fn select_class_source(&self) -> (Arc<dyn ClassSourceLookup>, Strategy) {
        match ModuleIndexLookup::from_host(&self.host) {
            Ok(index) => (Arc::new(index), Strategy::ModuleIndex),
            Err(e) => {
                warn!(error = %e, "Could not list loaded modules, class sources will be unattributed");
                (Arc::new(NoopLookup), Strategy::Unattributed)
            }
        }
    }

    fn select_tick_hook(&self, capabilities: &CapabilitySet) -> Resolved<Arc<dyn TickHook>> {
        if capabilities.has(HostFeature::TickEvents) {
            match self.host.tick_events() {
                Some(events) => match NativeEventTickHook::start(events) {
                    Ok(hook) => {
                        let hook: Arc<dyn TickHook> = Arc::new(hook);
                        return Resolved::present(Strategy::NativeTickEvents, hook);
                    }
                    Err(e) => warn!(error = %e, "Native tick hook failed to start, falling back to scheduler"),
                },
                None => warn!("Host advertised tick events but provides no event source"),
            }
        }

        match SchedulerTickHook::start(self.host.scheduler()) {
            Ok(hook) => {
                let hook: Arc<dyn TickHook> = Arc::new(hook);
                Resolved::present(Strategy::SchedulerPolling, hook)
            }
            Err(e) => {
                error!(error = %e, "Scheduler tick hook failed to start, tick monitoring is unavailable");
                Resolved::Absent
            }
        }
    }

    fn select_tick_reporter(&self, capabilities: &CapabilitySet) -> Resolved<Arc<dyn TickReporter>> {
        if !capabilities.has(HostFeature::TickEvents) {
            return Resolved::Absent;
        }
        let Some(events) = self.host.tick_events() else {
            return Resolved::Absent;
        };
        match NativeTickReporter::start(events) {
            Ok(reporter) => {
                let reporter: Arc<dyn TickReporter> = Arc::new(reporter);
                Resolved::present(Strategy::NativeTickEvents, reporter)
            }
            Err(e) => {
                warn!(error = %e, "Native tick reporter failed to start");
                Resolved::Absent
            }
        }
    }

    fn select_player_ping(&self, capabilities: &CapabilitySet) -> Resolved<Arc<dyn PlayerPingProvider>> {
        if !capabilities.has(HostFeature::PlayerPing) {
            return Resolved::Absent;
        }
        match self.host.ping_api() {
            Some(api) => {
                let provider: Arc<dyn PlayerPingProvider> = Arc::new(NativePingProvider::new(self.host.clone(), api));
                Resolved::present(Strategy::NativePingApi, provider)
            }
            None => {
                warn!("Host advertised a ping API but provides none");
                Resolved::Absent
            }
        }
    }
}
