// tickwise standalone runner

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use tickwise_bridge::providers::class_source::ModuleDescriptor;
use tickwise_bridge::providers::server_config::{ConfigFile, ConfigFormat};
use tickwise_bridge::providers::world_info::WorldData;
use tickwise_bridge::{JsonConfiguration, LifecycleController, LocalHost};
use tickwise_core::{init_logging, init_minimal_logging, ConfigLoader};

mod console_engine;
mod tick_stats;

use console_engine::ConsoleEngine;

const DEFAULT_TICKS: u64 = 100;

fn demo_host() -> std::sync::Arc<LocalHost> {
    let mut overworld = WorldData::new("world", "overworld");
    overworld.chunk_count = 441;
    overworld.entity_counts.insert("minecraft:zombie".to_string(), 12);
    overworld.entity_counts.insert("minecraft:item".to_string(), 37);
    let mut nether = WorldData::new("world_nether", "the_nether");
    nether.chunk_count = 81;
    nether.entity_counts.insert("minecraft:piglin".to_string(), 9);

    LocalHost::builder()
        .name("tickwise-local")
        .native_tick_events(true)
        .ping_api(true)
        .plugin("PlaceholderAPI")
        .config_file(ConfigFile::new(
            "server.properties",
            ConfigFormat::Properties,
            "server-ip=127.0.0.1\nview-distance=10\nmax-players=20\nmotd=A tickwise server\n",
        ))
        .world(overworld)
        .world(nether)
        .module(ModuleDescriptor::new("tickwise", ["tickwise"]).with_version(env!("CARGO_PKG_VERSION")))
        .build()
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let data_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let ticks = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("Invalid tick count '{}'", raw))?,
        None => DEFAULT_TICKS,
    };

    let config = ConfigLoader::load(&data_dir)
        .with_context(|| format!("Failed to load configuration from {}", data_dir.display()))?;
    if let Err(e) = init_logging(&config.logging, false) {
        init_minimal_logging();
        warn!("Falling back to minimal logging: {}", e);
    }

    info!("Starting tickwise runner for {} ticks...", ticks);
    let host = demo_host();
    let engine_config = JsonConfiguration::from_value(json!({ "overrideTpsCommand": true }));
    let controller = LifecycleController::new(host.clone(), config, ConsoleEngine::factory(engine_config));
    controller.enable().context("Failed to enable the tickwise bridge")?;

    host.add_player("Notch");
    host.set_latency("Notch", 42);
    host.add_player("jeb_");
    host.set_latency("jeb_", 87);

    for tick in 0..ticks {
        // Every 25th step simulates a lag spike.
        let work = if tick % 25 == 24 {
            Duration::from_millis(60)
        } else {
            Duration::from_micros(500 + (tick % 7) * 250)
        };
        host.run_tick_with(|| std::thread::sleep(work));
    }
    info!("Ran {} ticks", host.ticks_run());

    let console = host.console();
    if host.dispatch_command(console.clone(), "tps").is_none() {
        warn!("The tps command is not registered on the host");
    }
    for subcommand in ["ping", "healthreport"] {
        controller.on_command(console.clone(), "tickwise", &[subcommand.to_string()]);
    }
    for line in console.messages() {
        info!("[console] {}", line);
    }
    if let Some(tps) = host.resolve_placeholder("PlaceholderAPI", "tps", None) {
        info!("Placeholder %tickwise_tps% resolves to {}", tps);
    }

    controller.disable();
    info!("tickwise runner finished in state {}", controller.state());
    Ok(())
}
