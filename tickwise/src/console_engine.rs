//! A small profiling engine that reports tick health as chat/console text.
//!
//! It consumes whatever the bridge resolved: tick durations when a reporter
//! is present, a bare step count otherwise, and the metadata providers for
//! `ping` and `healthreport`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use tickwise_bridge::engine::{EngineConfiguration, EngineContext, EngineResult, JsonConfiguration, ProfilingEngine};
use tickwise_bridge::providers::player_ping::PlayerPingProvider;
use tickwise_bridge::providers::server_config::ServerConfigProvider;
use tickwise_bridge::providers::tick_hook::TickHook;
use tickwise_bridge::providers::tick_reporter::{TickDuration, TickReporter};
use tickwise_bridge::providers::world_info::WorldInfoProvider;
use tickwise_bridge::providers::CallbackId;
use tickwise_bridge::CommandSender;

use crate::tick_stats::{TickStatistics, TickStatsCollector};

pub const SUBCOMMANDS: [&str; 4] = ["tps", "ping", "healthreport", "threads"];

/// Ten seconds of steps at the target rate.
const WINDOW_TICKS: usize = 200;

enum Registration {
    Hook(CallbackId),
    Reporter(CallbackId),
}

pub struct ConsoleEngine {
    context: EngineContext,
    config: JsonConfiguration,
    stats: Arc<Mutex<TickStatsCollector>>,
    ticks_seen: Arc<AtomicU64>,
    registrations: Mutex<Vec<Registration>>,
}

impl ConsoleEngine {
    pub fn new(context: EngineContext, config: JsonConfiguration) -> Self {
        Self {
            context,
            config,
            stats: Arc::new(Mutex::new(TickStatsCollector::new(WINDOW_TICKS))),
            ticks_seen: Arc::new(AtomicU64::new(0)),
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Factory handed to the lifecycle controller.
    pub fn factory(
        config: JsonConfiguration,
    ) -> impl Fn(EngineContext) -> EngineResult<Arc<dyn ProfilingEngine>> + Send + Sync {
        move |context| Ok(Arc::new(ConsoleEngine::new(context, config.clone())) as Arc<dyn ProfilingEngine>)
    }

    pub fn statistics(&self) -> Option<TickStatistics> {
        self.stats.lock().statistics()
    }

    pub fn ticks_seen(&self) -> u64 {
        self.ticks_seen.load(Ordering::Acquire)
    }

    fn tps_line(&self) -> String {
        match self.statistics() {
            Some(stats) => format!(
                "TPS: {:.1} | MSPT min/avg/p95/max: {:.2}/{:.2}/{:.2}/{:.2} ms over {} ticks",
                stats.estimated_tps(),
                stats.min_mspt,
                stats.avg_mspt,
                stats.p95_mspt,
                stats.max_mspt,
                stats.sample_count
            ),
            None if self.context.providers.tick_reporter().is_absent() => format!(
                "Tick durations are not reported by this host; {} ticks observed.",
                self.ticks_seen()
            ),
            None => "No tick durations have been reported yet.".to_string(),
        }
    }

    fn send_ping(&self, sender: &dyn CommandSender, player: Option<&str>) {
        let Some(provider) = self.context.providers.player_ping().get() else {
            sender.send_message("Player ping is not available on this host.");
            return;
        };
        let pings = provider.poll();
        match player {
            Some(name) => match pings.get(name) {
                Some(ms) => sender.send_message(&format!("{}: {} ms", name, ms)),
                None => sender.send_message(&format!("No ping data for '{}'.", name)),
            },
            None if pings.is_empty() => sender.send_message("No players online."),
            None => {
                let avg = pings.values().map(|ms| *ms as f64).sum::<f64>() / pings.len() as f64;
                sender.send_message(&format!("Average ping: {:.1} ms across {} players", avg, pings.len()));
                for (name, ms) in &pings {
                    sender.send_message(&format!("  {}: {} ms", name, ms));
                }
            }
        }
    }

    fn send_health_report(&self, sender: &dyn CommandSender) {
        let providers = &self.context.providers;
        sender.send_message(&format!("Platform: {}", providers.platform_info()));
        sender.send_message(&self.tps_line());

        let worlds = providers.world_info().poll();
        sender.send_message(&format!(
            "Worlds: {} | chunks: {} | entities: {}",
            worlds.worlds.len(),
            worlds.total_chunks,
            worlds.total_entities
        ));

        let config = providers.server_config().snapshot();
        sender.send_message(&format!("Server config files captured: {}", config.files.len()));
    }

    fn send_threads(&self, sender: &dyn CommandSender) {
        let threads = self
            .context
            .providers
            .thread_dumper()
            .dump_threads(self.context.host.as_ref());
        if threads.is_empty() {
            sender.send_message("No sampled threads are currently known to the host.");
            return;
        }
        for thread in threads {
            sender.send_message(&format!("{} [{:?}] {} frames", thread.name, thread.state, thread.frames.len()));
        }
    }
}

impl ProfilingEngine for ConsoleEngine {
    fn enable(&self) -> EngineResult<()> {
        let providers = &self.context.providers;
        let mut registrations = self.registrations.lock();

        if let Some(hook) = providers.tick_hook().get() {
            let ticks_seen = self.ticks_seen.clone();
            let id = hook.add_callback(Arc::new(move |_tick: u64| {
                ticks_seen.fetch_add(1, Ordering::AcqRel);
            }));
            registrations.push(Registration::Hook(id));
        }
        if let Some(reporter) = providers.tick_reporter().get() {
            let stats = self.stats.clone();
            let id = reporter.add_callback(Arc::new(move |d: &TickDuration| stats.lock().record(d.duration)));
            registrations.push(Registration::Reporter(id));
        }

        info!(
            tick_hook = ?providers.tick_hook(),
            tick_reporter = ?providers.tick_reporter(),
            player_ping = ?providers.player_ping(),
            "Console engine enabled"
        );
        Ok(())
    }

    fn disable(&self) {
        let providers = &self.context.providers;
        for registration in self.registrations.lock().drain(..) {
            match registration {
                Registration::Hook(id) => {
                    if let Some(hook) = providers.tick_hook().get() {
                        hook.remove_callback(id);
                    }
                }
                Registration::Reporter(id) => {
                    if let Some(reporter) = providers.tick_reporter().get() {
                        reporter.remove_callback(id);
                    }
                }
            }
        }
        info!(ticks_seen = self.ticks_seen(), "Console engine disabled");
    }

    fn execute_command(&self, sender: &dyn CommandSender, args: &[String]) {
        let Some(subcommand) = args.first().map(|s| s.to_lowercase()) else {
            sender.send_message(&format!("Usage: /tickwise <{}>", SUBCOMMANDS.join("|")));
            return;
        };
        if !sender.has_permission("spark") && !sender.has_permission(&format!("spark.{}", subcommand)) {
            sender.send_message("You do not have permission to use this command.");
            return;
        }
        debug!(sender = %sender.identity(), subcommand = %subcommand, "Executing command");

        match subcommand.as_str() {
            "tps" => sender.send_message(&self.tps_line()),
            "ping" => self.send_ping(sender, args.get(1).map(String::as_str)),
            "healthreport" => self.send_health_report(sender),
            "threads" => self.send_threads(sender),
            other => sender.send_message(&format!(
                "Unknown subcommand '{}'. Try one of: {}",
                other,
                SUBCOMMANDS.join(", ")
            )),
        }
    }

    fn tab_complete_command(&self, _sender: &dyn CommandSender, args: &[String]) -> Vec<String> {
        match args {
            [] => SUBCOMMANDS.iter().map(|s| s.to_string()).collect(),
            [prefix] => SUBCOMMANDS
                .iter()
                .filter(|s| s.starts_with(prefix.to_lowercase().as_str()))
                .map(|s| s.to_string())
                .collect(),
            [sub, prefix] if sub.eq_ignore_ascii_case("ping") => self
                .context
                .senders
                .senders()
                .map(|s| s.identity())
                .filter(|id| !id.is_console && id.name.starts_with(prefix.as_str()))
                .map(|id| id.name)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn configuration(&self) -> &dyn EngineConfiguration {
        &self.config
    }

    fn resolve_placeholder(&self, key: &str, _sender: Option<&dyn CommandSender>) -> Option<String> {
        match key {
            "tps" => self.statistics().map(|s| format!("{:.1}", s.estimated_tps())),
            "mspt" => self.statistics().map(|s| format!("{:.2}", s.avg_mspt)),
            "ticks" => Some(self.ticks_seen().to_string()),
            _ => None,
        }
    }
}
