//! An in-process host.
//!
//! [`LocalHost`] implements [`Host`] for a simulation loop written in Rust: the
//! embedding code calls [`LocalHost::run_tick`] once per step, and the host
//! fires tick events and runs scheduled tasks around it. Every optional feature
//! can be switched on or off through [`LocalHostBuilder`], and failures can be
//! injected, which is what the bridge's own tests rely on.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::capability::HostFeature;
use crate::command::override_cmd::{CommandExecutor, CommandMap};
use crate::command::sender::HostSender;
use crate::error::HostError;
use crate::host::{
    Host, ListenerId, PingApi, ScheduledTask, Scheduler, TaskId, TickEndEvent, TickEndListener, TickEventSource,
    TickStartEvent, TickStartListener,
};
use crate::placeholder::PlaceholderResolver;
use crate::providers::class_source::ModuleDescriptor;
use crate::providers::platform_info::{PlatformInfo, PlatformKind};
use crate::providers::server_config::ConfigFile;
use crate::providers::thread_dumper::ThreadSnapshot;
use crate::providers::world_info::WorldData;

/// A player or console attached to a [`LocalHost`].
pub struct LocalSender {
    name: String,
    unique_id: Option<Uuid>,
    operator: bool,
    permissions: RwLock<HashSet<String>>,
    locale: RwLock<Option<String>>,
    messages: Mutex<Vec<String>>,
}

impl LocalSender {
    pub fn player(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            unique_id: Some(Uuid::new_v4()),
            operator: false,
            permissions: RwLock::new(HashSet::new()),
            locale: RwLock::new(None),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// The console holds every permission.
    pub fn console() -> Arc<Self> {
        Arc::new(Self {
            name: "CONSOLE".to_string(),
            unique_id: None,
            operator: true,
            permissions: RwLock::new(HashSet::new()),
            locale: RwLock::new(None),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn grant(&self, permission: impl Into<String>) {
        self.permissions.write().insert(permission.into());
    }

    pub fn revoke(&self, permission: &str) {
        self.permissions.write().remove(permission);
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.write() = Some(locale.into());
    }

    /// Every message delivered so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl HostSender for LocalSender {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn unique_id(&self) -> Option<Uuid> {
        self.unique_id
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.operator || self.permissions.read().contains(permission)
    }

    fn send_message(&self, message: &str) {
        trace!(to = %self.name, text = message, "Delivering message");
        self.messages.lock().push(message.to_string());
    }

    fn locale(&self) -> Option<String> {
        self.locale.read().clone()
    }
}

impl fmt::Debug for LocalSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSender")
            .field("name", &self.name)
            .field("unique_id", &self.unique_id)
            .finish()
    }
}

/// Runs repeating tasks from [`LocalHost::run_tick`].
#[derive(Default)]
pub struct LocalScheduler {
    next_id: AtomicU64,
    tasks: RwLock<Vec<(TaskId, u32, ScheduledTask)>>,
}

impl LocalScheduler {
    fn run_due(&self, tick: u64) {
        // Snapshot so tasks may cancel themselves or others.
        let due: Vec<ScheduledTask> = self
            .tasks
            .read()
            .iter()
            .filter(|(_, period, _)| tick % u64::from(*period) == 0)
            .map(|(_, _, task)| task.clone())
            .collect();
        for task in due {
            task();
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }
}

impl Scheduler for LocalScheduler {
    fn run_repeating(&self, period_ticks: u32, task: ScheduledTask) -> Result<TaskId, HostError> {
        if period_ticks == 0 {
            return Err(HostError::registration("repeating task", "period must be at least one tick"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.write().push((id, period_ticks, task));
        Ok(id)
    }

    fn cancel(&self, id: TaskId) {
        self.tasks.write().retain(|(existing, _, _)| *existing != id);
    }
}

/// Native tick events, fired by [`LocalHost::run_tick`].
#[derive(Default)]
pub struct LocalTickEvents {
    next_id: AtomicU64,
    start: RwLock<Vec<(ListenerId, TickStartListener)>>,
    end: RwLock<Vec<(ListenerId, TickEndListener)>>,
}

impl LocalTickEvents {
    fn fire_start(&self, event: TickStartEvent) {
        let listeners: Vec<TickStartListener> = self.start.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&event);
        }
    }

    fn fire_end(&self, event: TickEndEvent) {
        let listeners: Vec<TickEndListener> = self.end.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.start.read().len() + self.end.read().len()
    }
}

impl TickEventSource for LocalTickEvents {
    fn subscribe_start(&self, listener: TickStartListener) -> Result<ListenerId, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.start.write().push((id, listener));
        Ok(id)
    }

    fn subscribe_end(&self, listener: TickEndListener) -> Result<ListenerId, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.end.write().push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.start.write().retain(|(existing, _)| *existing != id);
        self.end.write().retain(|(existing, _)| *existing != id);
    }
}

/// Latency table set by the embedding code.
#[derive(Default)]
pub struct LocalPingApi {
    latencies: RwLock<HashMap<String, u32>>,
}

impl PingApi for LocalPingApi {
    fn latency_ms(&self, player: &str) -> Result<Option<u32>, HostError> {
        Ok(self.latencies.read().get(player).copied())
    }
}

#[derive(Default)]
pub struct LocalCommandMap {
    commands: RwLock<HashMap<String, Arc<dyn CommandExecutor>>>,
    rejected: HashSet<String>,
}

impl CommandMap for LocalCommandMap {
    fn get(&self, label: &str) -> Option<Arc<dyn CommandExecutor>> {
        self.commands.read().get(label).cloned()
    }

    fn insert(
        &self,
        label: &str,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Option<Arc<dyn CommandExecutor>>, HostError> {
        if self.rejected.contains(label) {
            return Err(HostError::CommandMap {
                label: label.to_string(),
                reason: "label is reserved".to_string(),
            });
        }
        Ok(self.commands.write().insert(label.to_string(), executor))
    }

    fn remove(&self, label: &str) -> Option<Arc<dyn CommandExecutor>> {
        self.commands.write().remove(label)
    }
}

pub struct LocalHost {
    name: String,
    native_tick_events: bool,
    ping_enabled: bool,
    failing_probe: bool,
    panicking_probe: bool,
    failing_metadata: bool,
    scheduler: Arc<LocalScheduler>,
    tick_events: Arc<LocalTickEvents>,
    ping: Arc<LocalPingApi>,
    command_map: Arc<LocalCommandMap>,
    console: Arc<LocalSender>,
    players: RwLock<Vec<Arc<LocalSender>>>,
    plugins: BTreeSet<String>,
    failing_integrations: BTreeSet<String>,
    placeholders: RwLock<BTreeMap<String, Arc<dyn PlaceholderResolver>>>,
    config_files: Vec<ConfigFile>,
    worlds: RwLock<Vec<WorldData>>,
    modules: Vec<ModuleDescriptor>,
    threads: RwLock<Vec<ThreadSnapshot>>,
    platform: PlatformInfo,
    tick: AtomicU64,
    tick_thread: Mutex<Option<ThreadId>>,
}

impl LocalHost {
    pub fn builder() -> LocalHostBuilder {
        LocalHostBuilder::default()
    }

    /// Runs one empty simulation step.
    pub fn run_tick(&self) -> Duration {
        self.run_tick_with(|| {})
    }

    /// Runs one simulation step around `work`: tick-start event, scheduled
    /// tasks, `work`, tick-end event. Returns the measured step duration.
    pub fn run_tick_with(&self, work: impl FnOnce()) -> Duration {
        let tick = self.tick.fetch_add(1, Ordering::AcqRel);
        self.tick_thread.lock().get_or_insert_with(|| thread::current().id());

        let started = Instant::now();
        if self.native_tick_events {
            self.tick_events.fire_start(TickStartEvent { tick });
        }
        self.scheduler.run_due(tick);
        work();
        let duration = started.elapsed();
        if self.native_tick_events {
            self.tick_events.fire_end(TickEndEvent { tick, duration });
        }
        trace!(tick, ?duration, "Local tick complete");
        duration
    }

    pub fn ticks_run(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    pub fn add_player(&self, name: &str) -> Arc<LocalSender> {
        let player = LocalSender::player(name);
        self.players.write().push(player.clone());
        debug!(player = name, "Player joined local host");
        player
    }

    pub fn remove_player(&self, name: &str) -> bool {
        let mut players = self.players.write();
        let before = players.len();
        players.retain(|p| p.name != name);
        self.ping.latencies.write().remove(name);
        players.len() != before
    }

    pub fn player(&self, name: &str) -> Option<Arc<LocalSender>> {
        self.players.read().iter().find(|p| p.name == name).cloned()
    }

    pub fn console(&self) -> Arc<LocalSender> {
        self.console.clone()
    }

    pub fn set_latency(&self, player: &str, latency_ms: u32) {
        self.ping.latencies.write().insert(player.to_string(), latency_ms);
    }

    pub fn add_world(&self, world: WorldData) {
        self.worlds.write().push(world);
    }

    /// Records the latest state of a thread, replacing any earlier record for it.
    pub fn record_thread(&self, snapshot: ThreadSnapshot) {
        let mut threads = self.threads.write();
        match threads.iter_mut().find(|t| t.id == snapshot.id) {
            Some(existing) => *existing = snapshot,
            None => threads.push(snapshot),
        }
    }

    /// Parses a command line the way a host console would and runs it.
    /// Returns `None` if no command is registered under the label.
    pub fn dispatch_command(&self, sender: Arc<dyn HostSender>, command_line: &str) -> Option<bool> {
        let mut parts = command_line.trim_start_matches('/').split_whitespace();
        let label = parts.next()?.to_lowercase();
        let args: Vec<String> = parts.map(str::to_string).collect();
        let executor = self.command_map.get(&label)?;
        Some(executor.execute(sender, &label, &args))
    }

    /// Resolves a placeholder through whatever integration registered under `integration`.
    pub fn resolve_placeholder(
        &self,
        integration: &str,
        key: &str,
        sender: Option<Arc<dyn HostSender>>,
    ) -> Option<String> {
        let resolver = self.placeholders.read().get(integration).cloned()?;
        resolver.resolve(key, sender)
    }

    pub fn tick_listener_count(&self) -> usize {
        self.tick_events.listener_count()
    }

    pub fn scheduled_task_count(&self) -> usize {
        self.scheduler.task_count()
    }

    fn metadata<T>(&self, query: &str, value: impl FnOnce() -> T) -> Result<T, HostError> {
        if self.failing_metadata {
            return Err(HostError::query(query, "local host metadata is unavailable"));
        }
        Ok(value())
    }
}

impl Host for LocalHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect_feature(&self, feature: HostFeature) -> Result<bool, HostError> {
        if self.panicking_probe {
            panic!("local host probe for '{}' panicked", feature);
        }
        if self.failing_probe {
            return Err(HostError::FeatureUnavailable(feature.to_string()));
        }
        Ok(match feature {
            HostFeature::TickEvents => self.native_tick_events,
            HostFeature::PlayerPing => self.ping_enabled,
        })
    }

    fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    fn tick_events(&self) -> Option<Arc<dyn TickEventSource>> {
        if self.native_tick_events {
            Some(self.tick_events.clone())
        } else {
            None
        }
    }

    fn ping_api(&self) -> Option<Arc<dyn PingApi>> {
        if self.ping_enabled {
            Some(self.ping.clone())
        } else {
            None
        }
    }

    fn online_players(&self) -> Vec<Arc<dyn HostSender>> {
        self.players
            .read()
            .iter()
            .map(|p| p.clone() as Arc<dyn HostSender>)
            .collect()
    }

    fn console_sender(&self) -> Arc<dyn HostSender> {
        self.console.clone()
    }

    fn command_map(&self) -> Arc<dyn CommandMap> {
        self.command_map.clone()
    }

    fn is_plugin_enabled(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    fn register_placeholders(
        &self,
        integration: &str,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> Result<(), HostError> {
        if self.failing_integrations.contains(integration) {
            return Err(HostError::registration(integration, "integration rejected the expansion"));
        }
        self.placeholders.write().insert(integration.to_string(), resolver);
        Ok(())
    }

    fn unregister_placeholders(&self, integration: &str) {
        self.placeholders.write().remove(integration);
    }

    fn config_files(&self) -> Result<Vec<ConfigFile>, HostError> {
        self.metadata("config-files", || self.config_files.clone())
    }

    fn worlds(&self) -> Result<Vec<WorldData>, HostError> {
        self.metadata("worlds", || self.worlds.read().clone())
    }

    fn loaded_modules(&self) -> Result<Vec<ModuleDescriptor>, HostError> {
        self.metadata("loaded-modules", || self.modules.clone())
    }

    fn threads(&self) -> Vec<ThreadSnapshot> {
        self.threads.read().clone()
    }

    fn platform(&self) -> PlatformInfo {
        self.platform.clone()
    }

    fn tick_thread(&self) -> Option<ThreadId> {
        *self.tick_thread.lock()
    }
}

pub struct LocalHostBuilder {
    name: String,
    native_tick_events: bool,
    ping_api: bool,
    failing_probe: bool,
    panicking_probe: bool,
    failing_metadata: bool,
    plugins: BTreeSet<String>,
    failing_integrations: BTreeSet<String>,
    builtin_commands: Vec<(String, Arc<dyn CommandExecutor>)>,
    rejected_labels: HashSet<String>,
    config_files: Vec<ConfigFile>,
    worlds: Vec<WorldData>,
    modules: Vec<ModuleDescriptor>,
    platform: PlatformInfo,
}

impl Default for LocalHostBuilder {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            native_tick_events: false,
            ping_api: false,
            failing_probe: false,
            panicking_probe: false,
            failing_metadata: false,
            plugins: BTreeSet::new(),
            failing_integrations: BTreeSet::new(),
            builtin_commands: Vec::new(),
            rejected_labels: HashSet::new(),
            config_files: Vec::new(),
            worlds: Vec::new(),
            modules: Vec::new(),
            platform: PlatformInfo {
                kind: PlatformKind::Server,
                name: "local".to_string(),
                brand: "Tickwise LocalHost".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                runtime_version: "rust".to_string(),
            },
        }
    }
}

impl LocalHostBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Exposes native tick start/end events.
    pub fn native_tick_events(mut self, enabled: bool) -> Self {
        self.native_tick_events = enabled;
        self
    }

    /// Exposes the per-player latency API.
    pub fn ping_api(mut self, enabled: bool) -> Self {
        self.ping_api = enabled;
        self
    }

    /// Makes feature detection return an error.
    pub fn failing_probe(mut self, failing: bool) -> Self {
        self.failing_probe = failing;
        self
    }

    /// Makes feature detection panic.
    pub fn panicking_probe(mut self, panicking: bool) -> Self {
        self.panicking_probe = panicking;
        self
    }

    /// Makes config, world and module queries fail.
    pub fn failing_metadata(mut self, failing: bool) -> Self {
        self.failing_metadata = failing;
        self
    }

    pub fn plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.insert(name.into());
        self
    }

    /// Placeholder registration for this integration will fail.
    pub fn failing_integration(mut self, name: impl Into<String>) -> Self {
        self.failing_integrations.insert(name.into());
        self
    }

    /// Pre-registers a host command.
    pub fn builtin_command(mut self, label: impl Into<String>, executor: Arc<dyn CommandExecutor>) -> Self {
        self.builtin_commands.push((label.into(), executor));
        self
    }

    /// The command map refuses to install anything under this label.
    pub fn rejected_label(mut self, label: impl Into<String>) -> Self {
        self.rejected_labels.insert(label.into());
        self
    }

    pub fn config_file(mut self, file: ConfigFile) -> Self {
        self.config_files.push(file);
        self
    }

    pub fn world(mut self, world: WorldData) -> Self {
        self.worlds.push(world);
        self
    }

    pub fn module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    pub fn build(self) -> Arc<LocalHost> {
        let command_map = LocalCommandMap {
            commands: RwLock::new(self.builtin_commands.into_iter().collect()),
            rejected: self.rejected_labels,
        };
        Arc::new(LocalHost {
            name: self.name,
            native_tick_events: self.native_tick_events,
            ping_enabled: self.ping_api,
            failing_probe: self.failing_probe,
            panicking_probe: self.panicking_probe,
            failing_metadata: self.failing_metadata,
            scheduler: Arc::new(LocalScheduler::default()),
            tick_events: Arc::new(LocalTickEvents::default()),
            ping: Arc::new(LocalPingApi::default()),
            command_map: Arc::new(command_map),
            console: LocalSender::console(),
            players: RwLock::new(Vec::new()),
            plugins: self.plugins,
            failing_integrations: self.failing_integrations,
            placeholders: RwLock::new(BTreeMap::new()),
            config_files: self.config_files,
            worlds: RwLock::new(self.worlds),
            modules: self.modules,
            threads: RwLock::new(Vec::new()),
            platform: self.platform,
            tick: AtomicU64::new(0),
            tick_thread: Mutex::new(None),
        })
    }
}
