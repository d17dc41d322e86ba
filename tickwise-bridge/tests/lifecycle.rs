mod common;

use std::sync::Arc;

use common::{args, EngineSlot};
use serde_json::json;
use tickwise_bridge::command::{CommandExecutor, CommandMap};
use tickwise_bridge::engine::{EngineContext, EngineResult, JsonConfiguration, ProfilingEngine};
use tickwise_bridge::{
    BridgeError, CapabilitySet, Host, HostFeature, HostSender, LifecycleController, LifecycleState, LocalHost,
    ProviderContract, Strategy,
};
use tickwise_core::CoreConfig;

#[test]
fn test_every_capability_combination_reaches_enabled() {
    for caps in CapabilitySet::all_combinations() {
        let host = LocalHost::builder().native_tick_events(true).ping_api(true).build();
        let slot = EngineSlot::new();
        let controller =
            LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory()).with_prober(caps.clone());

        controller.enable().unwrap();
        assert_eq!(controller.state(), LifecycleState::Enabled, "{:?}", caps);

        let context = controller.context().unwrap();
        assert_eq!(context.capabilities, caps);
        let providers = &context.providers;
        for contract in ProviderContract::ALL {
            let resolved = providers.strategy_of(contract);
            match contract {
                ProviderContract::TickReporter => {
                    assert_eq!(resolved.is_some(), caps.has(HostFeature::TickEvents))
                }
                ProviderContract::PlayerPingProvider => {
                    assert_eq!(resolved.is_some(), caps.has(HostFeature::PlayerPing))
                }
                _ => assert!(resolved.is_some(), "{} unresolved for {:?}", contract, caps),
            }
        }

        controller.disable();
        assert_eq!(host.tick_listener_count(), 0);
        assert_eq!(host.scheduled_task_count(), 0);
    }
}

#[test]
fn test_native_events_are_preferred_when_available() {
    let host = LocalHost::builder().native_tick_events(true).build();
    let controller = LifecycleController::new(host, CoreConfig::default(), EngineSlot::new().factory());
    controller.enable().unwrap();

    let providers = controller.context().unwrap().providers.clone();
    assert_eq!(providers.tick_hook().strategy(), Some(Strategy::NativeTickEvents));
    assert_eq!(providers.tick_reporter().strategy(), Some(Strategy::NativeTickEvents));
}

#[test]
fn test_missing_events_fall_back_and_reporter_is_absent() {
    let host = LocalHost::builder().build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();
    assert_eq!(controller.state(), LifecycleState::Enabled);

    let providers = controller.context().unwrap().providers.clone();
    assert_eq!(providers.tick_hook().strategy(), Some(Strategy::SchedulerPolling));
    assert!(providers.tick_reporter().is_absent());
    assert!(providers.player_ping().is_absent());

    for _ in 0..4 {
        host.run_tick();
    }
    assert_eq!(*slot.engine().ticks.lock(), vec![0, 1, 2, 3]);
    assert!(slot.engine().durations.lock().is_empty());
}

#[test]
fn test_reporter_delivers_one_ordered_duration_per_step() {
    let host = LocalHost::builder().native_tick_events(true).build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();

    const STEPS: usize = 50;
    for i in 0..STEPS {
        host.run_tick_with(|| {
            if i % 10 == 0 {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        });
    }

    let engine = slot.engine();
    let durations = engine.durations.lock();
    assert_eq!(durations.len(), STEPS);
    for (expected, d) in durations.iter().enumerate() {
        assert_eq!(d.tick, expected as u64);
    }
    assert!(durations[0].duration >= std::time::Duration::from_millis(1));
    assert_eq!(engine.ticks.lock().len(), STEPS);
}

#[test]
fn test_disable_twice_is_a_noop() {
    let host = LocalHost::builder().native_tick_events(true).build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();

    controller.disable();
    controller.disable();
    assert_eq!(controller.state(), LifecycleState::Disabled);
    assert_eq!(*slot.engine().disable_calls.lock(), 1);
    assert!(!*slot.engine().enabled.lock());
    assert!(host.command_map().get("tps").is_none());
}

#[test]
fn test_engine_construction_failure_aborts_cleanly() {
    let host = LocalHost::builder().native_tick_events(true).build();
    let controller = LifecycleController::new(
        host.clone(),
        CoreConfig::default(),
        |_ctx: EngineContext| -> EngineResult<Arc<dyn ProfilingEngine>> { Err("no sampler for this platform".into()) },
    );

    let err = controller.enable().unwrap_err();
    assert!(matches!(err, BridgeError::EngineConstruction(ref msg) if msg.contains("no sampler")));
    assert_eq!(controller.state(), LifecycleState::Disabled);
    assert_eq!(host.tick_listener_count(), 0);
    assert_eq!(host.scheduled_task_count(), 0);
    assert!(host.command_map().get("tps").is_none());

    controller.disable();
    assert_eq!(controller.state(), LifecycleState::Disabled);
}

#[test]
fn test_engine_startup_failure_aborts_cleanly() {
    let host = LocalHost::builder().plugin("PlaceholderAPI").build();
    let slot = EngineSlot::with(JsonConfiguration::default(), true);
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());

    assert!(matches!(controller.enable(), Err(BridgeError::EngineStartup(_))));
    assert_eq!(host.scheduled_task_count(), 0);
    assert!(host.command_map().get("tps").is_none());
    assert!(host.resolve_placeholder("PlaceholderAPI", "tps", None).is_none());
    assert_eq!(*slot.engine().disable_calls.lock(), 0);
}

#[test]
fn test_optional_integration_failure_is_not_fatal() {
    let host = LocalHost::builder()
        .plugin("PlaceholderAPI")
        .plugin("MVdWPlaceholderAPI")
        .failing_integration("PlaceholderAPI")
        .build();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), EngineSlot::new().factory());

    controller.enable().unwrap();
    assert_eq!(controller.state(), LifecycleState::Enabled);
    assert!(host.resolve_placeholder("PlaceholderAPI", "tps", None).is_none());
    assert_eq!(
        host.resolve_placeholder("MVdWPlaceholderAPI", "tps", None).as_deref(),
        Some("20.0")
    );

    controller.disable();
    assert!(host.resolve_placeholder("MVdWPlaceholderAPI", "tps", None).is_none());
}

#[test]
fn test_override_failure_is_not_fatal() {
    let host = LocalHost::builder().rejected_label("tickwise:tps").build();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), EngineSlot::new().factory());

    controller.enable().unwrap();
    assert_eq!(controller.state(), LifecycleState::Enabled);
    // Rolled back: neither label carries the override.
    assert!(host.command_map().get("tps").is_none());
}

struct BuiltinTps;

impl CommandExecutor for BuiltinTps {
    fn execute(&self, sender: Arc<dyn HostSender>, _label: &str, _args: &[String]) -> bool {
        sender.send_message("TPS from last 1m, 5m, 15m: 20.0, 20.0, 20.0");
        true
    }
}

#[test]
fn test_command_table_is_restored_after_disable() {
    let builtin: Arc<dyn CommandExecutor> = Arc::new(BuiltinTps);
    let host = LocalHost::builder().builtin_command("tps", builtin.clone()).build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();

    let console = host.console();
    host.dispatch_command(console.clone(), "tps").unwrap();
    host.dispatch_command(console.clone(), "tickwise:tps").unwrap();
    assert_eq!(slot.engine().calls.lock().len(), 2);

    controller.disable();
    host.dispatch_command(console.clone(), "tps").unwrap();
    assert_eq!(slot.engine().calls.lock().len(), 2);
    assert_eq!(
        console.messages().last().map(String::as_str),
        Some("TPS from last 1m, 5m, 15m: 20.0, 20.0, 20.0")
    );
    assert!(host.dispatch_command(console, "tickwise:tps").is_none());
}

#[test]
fn test_engine_config_can_disable_override() {
    let builtin: Arc<dyn CommandExecutor> = Arc::new(BuiltinTps);
    let host = LocalHost::builder().builtin_command("tps", builtin).build();
    let slot = EngineSlot::with(JsonConfiguration::from_value(json!({ "overrideTpsCommand": false })), false);
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();

    let console = host.console();
    host.dispatch_command(console.clone(), "tps").unwrap();
    assert!(slot.engine().calls.lock().is_empty());
    assert!(host.dispatch_command(console, "tickwise:tps").is_none());
}

#[test]
fn test_core_config_default_applies_when_engine_is_silent() {
    let mut config = CoreConfig::default();
    config.commands.override_tps_command = false;
    let host = LocalHost::builder().build();
    let controller = LifecycleController::new(host.clone(), config, EngineSlot::new().factory());
    controller.enable().unwrap();
    assert!(host.command_map().get("tps").is_none());
}

#[test]
fn test_commands_before_enable_are_acknowledged_not_forwarded() {
    let host = LocalHost::builder().build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());

    assert!(controller.on_command(host.console_sender(), "spark", &args(&["tps"])));
    assert!(controller
        .on_tab_complete(host.console_sender(), "spark", &args(&["p"]))
        .is_empty());

    controller.enable().unwrap();
    assert!(slot.engine().calls.lock().is_empty());
}

#[test]
fn test_faulty_probe_reads_as_absent() {
    let host = LocalHost::builder()
        .native_tick_events(true)
        .ping_api(true)
        .panicking_probe(true)
        .build();
    let controller = LifecycleController::new(host, CoreConfig::default(), EngineSlot::new().factory());
    controller.enable().unwrap();

    let context = controller.context().unwrap();
    assert!(!context.capabilities.has(HostFeature::TickEvents));
    assert_eq!(
        context.providers.tick_hook().strategy(),
        Some(Strategy::SchedulerPolling)
    );
    assert!(context.providers.player_ping().is_absent());
}
