//! The boundary between the bridge and the host runtime.
//!
//! A host binding implements [`Host`] once; everything the bridge needs
//! (scheduling, optional tick events, optional latency API, senders, the
//! command table, plugin presence, and metadata sources) is reached through it.
//! Optional features are returned as `Option` so that a binding which lacks
//! them never has to fake an implementation.

use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use crate::capability::HostFeature;
use crate::command::override_cmd::CommandMap;
use crate::command::sender::HostSender;
use crate::error::HostError;
use crate::placeholder::PlaceholderResolver;
use crate::providers::class_source::ModuleDescriptor;
use crate::providers::platform_info::PlatformInfo;
use crate::providers::server_config::ConfigFile;
use crate::providers::thread_dumper::ThreadSnapshot;
use crate::providers::world_info::WorldData;

/// Handle returned by [`TickEventSource`] subscriptions.
pub type ListenerId = u64;
/// Handle returned by [`Scheduler::run_repeating`].
pub type TaskId = u64;

/// Fired by the host at the beginning of every simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStartEvent {
    pub tick: u64,
}

/// Fired by the host once a simulation step has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEndEvent {
    pub tick: u64,
    /// Monotonic time the step took.
    pub duration: Duration,
}

pub type TickStartListener = Arc<dyn Fn(&TickStartEvent) + Send + Sync>;
pub type TickEndListener = Arc<dyn Fn(&TickEndEvent) + Send + Sync>;
pub type ScheduledTask = Arc<dyn Fn() + Send + Sync>;

/// Native step-boundary events. Only richer hosts expose this.
pub trait TickEventSource: Send + Sync {
    fn subscribe_start(&self, listener: TickStartListener) -> Result<ListenerId, HostError>;
    fn subscribe_end(&self, listener: TickEndListener) -> Result<ListenerId, HostError>;
    /// Removing an unknown id is a no-op.
    fn unsubscribe(&self, id: ListenerId);
}

/// The host's main-thread task scheduler.
pub trait Scheduler: Send + Sync {
    /// Runs `task` on the tick thread every `period_ticks` steps.
    fn run_repeating(&self, period_ticks: u32, task: ScheduledTask) -> Result<TaskId, HostError>;
    /// Cancelling an unknown id is a no-op.
    fn cancel(&self, id: TaskId);
}

/// Direct per-connection latency query.
pub trait PingApi: Send + Sync {
    /// Round-trip latency of a connected client in milliseconds, `None` if it is not connected.
    fn latency_ms(&self, player: &str) -> Result<Option<u32>, HostError>;
}

/// Everything the bridge consumes from a host runtime.
pub trait Host: Send + Sync {
    /// Human-readable name of the host binding, used in logs.
    fn name(&self) -> &str;

    /// Raw discovery of an optional feature. May fail; callers go through
    /// [`crate::capability::HostProber`], which never does.
    fn detect_feature(&self, feature: HostFeature) -> Result<bool, HostError>;

    fn scheduler(&self) -> Arc<dyn Scheduler>;

    /// Native tick events, if this host has them.
    fn tick_events(&self) -> Option<Arc<dyn TickEventSource>>;

    /// Latency API, if this host has it.
    fn ping_api(&self) -> Option<Arc<dyn PingApi>>;

    /// Currently connected clients. Recomputed on every call.
    fn online_players(&self) -> Vec<Arc<dyn HostSender>>;

    /// The operator/console identity.
    fn console_sender(&self) -> Arc<dyn HostSender>;

    fn command_map(&self) -> Arc<dyn CommandMap>;

    /// Whether another plugin/integration with this name is present and enabled.
    fn is_plugin_enabled(&self, name: &str) -> bool;

    fn register_placeholders(
        &self,
        integration: &str,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> Result<(), HostError>;

    fn unregister_placeholders(&self, integration: &str);

    /// Raw configuration files the host exposes for reporting.
    fn config_files(&self) -> Result<Vec<ConfigFile>, HostError>;

    fn worlds(&self) -> Result<Vec<WorldData>, HostError>;

    /// Loaded plugins/modules and the package prefixes they own.
    fn loaded_modules(&self) -> Result<Vec<ModuleDescriptor>, HostError>;

    /// Latest state of the threads the host knows about. Must not block on those threads.
    fn threads(&self) -> Vec<ThreadSnapshot>;

    fn platform(&self) -> PlatformInfo;

    /// The thread that drives simulation steps, when the host can tell.
    fn tick_thread(&self) -> Option<ThreadId> {
        None
    }
}
