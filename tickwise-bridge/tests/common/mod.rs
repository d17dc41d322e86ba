#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tickwise_bridge::engine::{EngineConfiguration, EngineContext, EngineResult, JsonConfiguration, ProfilingEngine};
use tickwise_bridge::providers::tick_reporter::TickDuration;
use tickwise_bridge::{CommandSender, SenderIdentity};

/// One call into the engine's command dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sender: SenderIdentity,
    pub args: Vec<String>,
    /// What `has_permission` answered for a node nobody holds.
    pub elevated: bool,
}

/// Engine double that records everything the bridge hands it.
pub struct RecordingEngine {
    pub context: EngineContext,
    pub config: JsonConfiguration,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub durations: Arc<Mutex<Vec<TickDuration>>>,
    pub ticks: Arc<Mutex<Vec<u64>>>,
    pub enabled: Mutex<bool>,
    pub disable_calls: Mutex<u32>,
    pub fail_enable: bool,
}

impl RecordingEngine {
    pub fn new(context: EngineContext, config: JsonConfiguration, fail_enable: bool) -> Self {
        Self {
            context,
            config,
            calls: Mutex::new(Vec::new()),
            durations: Arc::new(Mutex::new(Vec::new())),
            ticks: Arc::new(Mutex::new(Vec::new())),
            enabled: Mutex::new(false),
            disable_calls: Mutex::new(0),
            fail_enable,
        }
    }
}

impl ProfilingEngine for RecordingEngine {
    fn enable(&self) -> EngineResult<()> {
        if self.fail_enable {
            return Err("sampler could not attach".into());
        }
        let providers = &self.context.providers;
        if let Some(hook) = providers.tick_hook().get() {
            let ticks = self.ticks.clone();
            hook.add_callback(Arc::new(move |tick: u64| ticks.lock().push(tick)));
        }
        if let Some(reporter) = providers.tick_reporter().get() {
            let durations = self.durations.clone();
            reporter.add_callback(Arc::new(move |d: &TickDuration| durations.lock().push(*d)));
        }
        *self.enabled.lock() = true;
        Ok(())
    }

    fn disable(&self) {
        *self.enabled.lock() = false;
        *self.disable_calls.lock() += 1;
    }

    fn execute_command(&self, sender: &dyn CommandSender, args: &[String]) {
        self.calls.lock().push(RecordedCall {
            sender: sender.identity(),
            args: args.to_vec(),
            elevated: sender.has_permission("tickwise.test.nobody-has-this"),
        });
        sender.send_message(&format!("ran {}", args.join(" ")));
    }

    fn tab_complete_command(&self, _sender: &dyn CommandSender, args: &[String]) -> Vec<String> {
        let all = ["profiler", "ping", "tps", "healthreport", "tickmonitor"];
        let prefix = args.last().map(String::as_str).unwrap_or("");
        all.iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| c.to_string())
            .collect()
    }

    fn configuration(&self) -> &dyn EngineConfiguration {
        &self.config
    }

    fn resolve_placeholder(&self, key: &str, _sender: Option<&dyn CommandSender>) -> Option<String> {
        (key == "tps").then(|| "20.0".to_string())
    }
}

/// Factory that keeps a handle to the engine it built.
pub struct EngineSlot {
    pub engine: Mutex<Option<Arc<RecordingEngine>>>,
    pub config: JsonConfiguration,
    pub fail_enable: bool,
}

impl EngineSlot {
    pub fn new() -> Arc<Self> {
        Self::with(JsonConfiguration::default(), false)
    }

    pub fn with(config: JsonConfiguration, fail_enable: bool) -> Arc<Self> {
        Arc::new(Self {
            engine: Mutex::new(None),
            config,
            fail_enable,
        })
    }

    pub fn factory(self: &Arc<Self>) -> impl Fn(EngineContext) -> EngineResult<Arc<dyn ProfilingEngine>> + Send + Sync {
        let slot = self.clone();
        move |context| {
            let engine = Arc::new(RecordingEngine::new(context, slot.config.clone(), slot.fail_enable));
            *slot.engine.lock() = Some(engine.clone());
            Ok(engine as Arc<dyn ProfilingEngine>)
        }
    }

    pub fn engine(&self) -> Arc<RecordingEngine> {
        self.engine.lock().clone().expect("engine was not constructed")
    }
}

pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
