//! # tickwise bridge (`tickwise-bridge`)
//!
//! Connects a profiling engine to a host simulation loop whose capabilities
//! vary between deployments.
//!
//! ## Overview
//!
//! - **Capability probing** ([`capability`]): asks the host once, at startup,
//!   which optional features it has. Probing never fails.
//! - **Providers** ([`providers`]): the narrow contracts the engine depends on
//!   (tick hook, tick reporter, thread dumper, class source lookup, server
//!   config, world info, player ping, platform info) and their strategies.
//! - **Strategy selection** ([`selector`]): picks the richest strategy per
//!   contract, or an explicit [`selector::Resolved::Absent`].
//! - **Command routing** ([`command`]): forwards commands and tab completion to
//!   the engine and optionally replaces the host's built-in `tps` command.
//! - **Lifecycle** ([`lifecycle`]): ordered enable/disable with symmetric
//!   registration and idempotent teardown.
//!
//! A host binding implements [`host::Host`]; [`local::LocalHost`] is a complete
//! in-process binding for embedding.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickwise_bridge::{LifecycleController, LocalHost};
//!
//! let host = LocalHost::builder().native_tick_events(true).build();
//! let controller = LifecycleController::new(host.clone(), config, |ctx| build_engine(ctx));
//! controller.enable()?;
//! for _ in 0..20 {
//!     host.run_tick();
//! }
//! controller.disable();
//! ```

pub mod capability;
pub mod command;
pub mod engine;
pub mod error;
pub mod host;
mod in_flight;
pub mod lifecycle;
pub mod local;
pub mod placeholder;
pub mod providers;
pub mod selector;

pub use capability::{CapabilityProber, CapabilitySet, HostFeature, HostProber};
pub use command::{CommandBridge, CommandSender, HostSender, NormalizedSender, SenderIdentity};
pub use engine::{EngineConfiguration, EngineContext, EngineFactory, EngineResult, JsonConfiguration, ProfilingEngine};
pub use error::{BridgeError, HostError};
pub use host::Host;
pub use lifecycle::{BridgeContext, LifecycleController, LifecycleState};
pub use local::{LocalHost, LocalHostBuilder, LocalSender};
pub use selector::{ProviderContract, ProviderSet, Resolved, Strategy, StrategySelector};
