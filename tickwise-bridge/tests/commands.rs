mod common;

use std::collections::BTreeMap;

use common::{args, EngineSlot};
use tickwise_bridge::{CommandSender, Host, LifecycleController, LocalHost};
use tickwise_core::CoreConfig;

fn enabled(host: &std::sync::Arc<LocalHost>) -> (LifecycleController, std::sync::Arc<EngineSlot>) {
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), CoreConfig::default(), slot.factory());
    controller.enable().unwrap();
    (controller, slot)
}

#[test]
fn test_tps_override_denies_without_permission() {
    let host = LocalHost::builder().build();
    let (_controller, slot) = enabled(&host);
    let player = host.add_player("Grumm");

    assert_eq!(host.dispatch_command(player.clone(), "tps"), Some(true));
    assert_eq!(host.dispatch_command(player.clone(), "tickwise:tps"), Some(true));

    assert!(slot.engine().calls.lock().is_empty());
    let denial = CoreConfig::default().messages.no_permission_for(None).to_string();
    assert_eq!(player.messages(), vec![denial.clone(), denial]);
}

#[test]
fn test_tps_override_forwards_exactly_one_elevated_call() {
    for permission in ["spark", "spark.tps", "bukkit.command.tps"] {
        let host = LocalHost::builder().build();
        let (_controller, slot) = enabled(&host);
        let player = host.add_player("Notch");
        player.grant(permission);

        host.dispatch_command(player.clone(), "tps some extra words").unwrap();

        let calls = slot.engine().calls.lock().clone();
        assert_eq!(calls.len(), 1, "{}", permission);
        assert_eq!(calls[0].args, args(&["tps"]));
        assert!(calls[0].elevated);
        assert_eq!(calls[0].sender.name, "Notch");
        assert_eq!(player.messages(), vec!["ran tps".to_string()]);
    }
}

#[test]
fn test_denial_uses_sender_locale() {
    let mut config = CoreConfig::default();
    config.messages.no_permission = BTreeMap::from([
        ("en".to_string(), "You do not have permission to use this command.".to_string()),
        ("fr".to_string(), "Vous n'avez pas la permission.".to_string()),
    ]);
    let host = LocalHost::builder().build();
    let slot = EngineSlot::new();
    let controller = LifecycleController::new(host.clone(), config, slot.factory());
    controller.enable().unwrap();

    let player = host.add_player("Pierre");
    player.set_locale("fr_FR");
    host.dispatch_command(player.clone(), "tps").unwrap();
    assert_eq!(player.messages(), vec!["Vous n'avez pas la permission.".to_string()]);
}

#[test]
fn test_general_commands_are_not_elevated() {
    let host = LocalHost::builder().build();
    let (controller, slot) = enabled(&host);
    let player = host.add_player("Notch");

    assert!(controller.on_command(player.clone(), "spark", &args(&["profiler", "start"])));
    let calls = slot.engine().calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, args(&["profiler", "start"]));
    assert!(!calls[0].elevated);
}

#[test]
fn test_tab_complete_is_forwarded_unmodified() {
    let host = LocalHost::builder().build();
    let (controller, _slot) = enabled(&host);

    let completions = controller.on_tab_complete(host.console_sender(), "spark", &args(&["t"]));
    assert_eq!(completions, args(&["tps", "tickmonitor"]));
    let completions = controller.on_tab_complete(host.console_sender(), "spark", &args(&["p"]));
    assert_eq!(completions, args(&["profiler", "ping"]));
}

#[test]
fn test_sender_enumeration_tracks_connected_clients() {
    let host = LocalHost::builder().build();
    let (controller, slot) = enabled(&host);

    assert_eq!(controller.command_senders().count(), 1);

    for name in ["Notch", "jeb_", "Dinnerbone"] {
        host.add_player(name);
    }
    let senders: Vec<_> = controller.command_senders().collect();
    assert_eq!(senders.len(), 4);
    assert_eq!(senders.iter().filter(|s| s.identity().is_console).count(), 1);

    host.remove_player("jeb_");
    assert_eq!(controller.command_senders().count(), 3);

    // The engine's own directory sees the same live view.
    let engine = slot.engine();
    assert_eq!(engine.context.senders.senders().count(), 3);
}

#[test]
fn test_commands_after_disable_are_not_forwarded() {
    let host = LocalHost::builder().build();
    let (controller, slot) = enabled(&host);
    controller.disable();

    assert!(controller.on_command(host.console_sender(), "spark", &args(&["tps"])));
    assert!(controller
        .on_tab_complete(host.console_sender(), "spark", &args(&["p"]))
        .is_empty());
    assert!(slot.engine().calls.lock().is_empty());
}
